//! Shared HTTP plumbing for the backend clients.

use reqwest::{Response, Url};
use serde_json::Value;

use super::secret::mask_secrets;
use super::{Error, Result};
use crate::build_info;

/// Fields backends use for a human-readable error.
const ERROR_FIELDS: &[&str] = &["detail", "message", "error_description", "msg", "error"];

/// Build an HTTP client with our user agent.
pub fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(format!("helpdesk-cli/{}", build_info::version_string()))
        .build()?)
}

/// Parse a base URL from configuration.
pub fn base_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("invalid URL '{raw}': {e}")))
}

/// Append path segments to a base URL, percent-encoding each one.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Config(format!("URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pass a successful response through, turn anything else into [`Error::Api`].
pub async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let message = mask_secrets(&message).into_owned();

    tracing::debug!(status = status.as_u16(), message = %message, "request rejected");
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pull the error text out of a response body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ERROR_FIELDS
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    });

    Some(detail.unwrap_or_else(|| body.to_string()))
}

/// Unwrap a `{ "data": [...] }` envelope, accepting a bare value too.
#[must_use]
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_array) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
