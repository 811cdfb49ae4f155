//! Client for the AgentOS REST API.
//!
//! Covers agent runs (streamed and not), knowledge content and backend
//! sessions. Every call except the health check needs a bearer token; a
//! missing token fails before any request is sent.

mod types;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

pub use types::{BackendSession, KnowledgeContent, RunOutput, RunRequest};

use super::auth::{TokenProvider, require_token};
use super::stream::{EventStream, event_stream};
use super::{Error, Result, http};

/// Default AgentOS address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Opens streaming runs.
///
/// The session coordinator depends on this rather than on the HTTP client
/// so exchanges can be driven by any event source.
#[async_trait]
pub trait RunTransport: Send + Sync {
    /// Start a streamed run and return its events.
    async fn open_run(&self, request: &RunRequest) -> Result<EventStream>;
}

/// AgentOS API client.
#[derive(Clone)]
pub struct AgentOsClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for AgentOsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOsClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AgentOsClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            http: http::client()?,
            base_url: http::base_url(base_url)?,
            tokens,
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        http::endpoint(&self.base_url, segments)
    }

    async fn bearer(&self) -> Result<String> {
        require_token(self.tokens.as_ref()).await
    }

    /// Check the backend is up.
    pub async fn health(&self) -> Result<Value> {
        let response = self.http.get(self.url(&["health"])?).send().await?;
        let body = http::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    async fn post_run(&self, request: &RunRequest, stream: bool) -> Result<reqwest::Response> {
        let token = self.bearer().await?;
        let url = self.url(&["agents", &request.agent_id, "runs"])?;

        tracing::debug!(
            agent_id = %request.agent_id,
            session_id = request.session_id.as_deref().unwrap_or("-"),
            stream,
            "starting agent run"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .form(&request.form(stream))
            .send()
            .await?;

        http::check(response).await
    }

    /// Start a streamed run.
    pub async fn run_stream(&self, request: &RunRequest) -> Result<EventStream> {
        let response = self.post_run(request, true).await?;
        Ok(event_stream(response.bytes_stream()))
    }

    /// Run to completion and return the whole answer.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutput> {
        let response = self.post_run(request, false).await?;
        let value: Value = response.json().await?;
        Ok(RunOutput::from_value(&value))
    }

    /// List knowledge content.
    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeContent>> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(&["knowledge", "content"])?)
            .bearer_auth(token)
            .send()
            .await?;

        let value: Value = http::check(response).await?.json().await?;
        Ok(serde_json::from_value(http::unwrap_data(value))?)
    }

    /// Upload a document to the knowledge base.
    pub async fn upload_knowledge(&self, path: &Path) -> Result<Value> {
        let token = self.bearer().await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("not a file path: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        tracing::info!(file = %file_name, bytes = bytes.len(), "uploading knowledge content");

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response = self
            .http
            .post(self.url(&["knowledge", "content"])?)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        Ok(http::check(response).await?.json().await?)
    }

    /// Delete knowledge content by id.
    pub async fn delete_knowledge(&self, content_id: &str) -> Result<()> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.url(&["knowledge", "content", content_id])?)
            .bearer_auth(token)
            .send()
            .await?;

        http::check(response).await?;
        Ok(())
    }

    /// List backend sessions, optionally for one user.
    pub async fn list_sessions(&self, user_id: Option<&str>) -> Result<Vec<BackendSession>> {
        let token = self.bearer().await?;
        let mut request = self
            .http
            .get(self.url(&["v1", "sessions"])?)
            .bearer_auth(token);
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }

        let value: Value = http::check(request.send().await?).await?.json().await?;
        Ok(serde_json::from_value(http::unwrap_data(value))?)
    }

    /// Fetch one backend session with its runs.
    pub async fn get_session(&self, session_id: &str) -> Result<Value> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(&["v1", "sessions", session_id])?)
            .bearer_auth(token)
            .send()
            .await?;

        Ok(http::check(response).await?.json().await?)
    }

    /// Delete a backend session.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.url(&["v1", "sessions", session_id])?)
            .bearer_auth(token)
            .send()
            .await?;

        http::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RunTransport for AgentOsClient {
    async fn open_run(&self, request: &RunRequest) -> Result<EventStream> {
        self.run_stream(request).await
    }
}
