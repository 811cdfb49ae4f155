//! Bearer tokens for backend calls.
//!
//! Tokens come from Supabase password sign-in. A signed-in session is kept
//! in the system keychain and refreshed when it expires; `HELPDESK_TOKEN`
//! bypasses all of that with a fixed token.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Error, Result, http, keychain};

/// Seconds before expiry at which a session is treated as expired.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Source of the bearer token attached to backend calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when nobody is signed in.
    async fn token(&self) -> Result<Option<String>>;
}

/// Resolve a token or fail with [`Error::AuthRequired`].
pub async fn require_token(provider: &dyn TokenProvider) -> Result<String> {
    provider
        .token()
        .await?
        .filter(|t| !t.is_empty())
        .ok_or(Error::AuthRequired)
}

/// A fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never has a token.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A Supabase auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Whether the access token is expired (or about to be) at `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at - EXPIRY_LEEWAY_SECS <= now)
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(resp: TokenResponse) -> Self {
        let expires_at = resp.expires_at.or_else(|| {
            resp.expires_in
                .map(|secs| chrono::Utc::now().timestamp() + secs)
        });
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at,
            user: resp.user,
        }
    }
}

/// Client for the Supabase auth endpoints.
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    http: reqwest::Client,
    url: Url,
    anon_key: String,
}

impl SupabaseAuth {
    /// Create a client for a project.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the anon key is empty.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(Error::Config("Supabase anon key is empty".to_string()));
        }

        Ok(Self {
            http: http::client()?,
            url: http::base_url(url)?,
            anon_key,
        })
    }

    /// Project base URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Project anon key, sent as the `apikey` header.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Shared HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn token_url(&self, grant_type: &str) -> Result<Url> {
        let mut url = http::endpoint(&self.url, &["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http
            .post(self.token_url("password")?)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: AuthSession = http::check(response).await?.json::<TokenResponse>().await?.into();
        tracing::info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let response = self
            .http
            .post(self.token_url("refresh_token")?)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let session: AuthSession = http::check(response).await?.json::<TokenResponse>().await?.into();
        tracing::debug!(user_id = %session.user.id, "refreshed session");
        Ok(session)
    }

    /// Fetch the user an access token belongs to.
    pub async fn user(&self, access_token: &str) -> Result<AuthUser> {
        let response = self
            .http
            .get(http::endpoint(&self.url, &["auth", "v1", "user"])?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(http::check(response).await?.json().await?)
    }

    /// Revoke a session server-side.
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(http::endpoint(&self.url, &["auth", "v1", "logout"])?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        http::check(response).await?;
        Ok(())
    }
}

/// Token provider backed by the keychain-stored session.
#[derive(Debug, Clone, Default)]
pub struct KeychainSession {
    auth: Option<SupabaseAuth>,
}

impl KeychainSession {
    /// `auth` is used to refresh expired sessions; without it an expired
    /// session yields no token.
    #[must_use]
    pub const fn new(auth: Option<SupabaseAuth>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl TokenProvider for KeychainSession {
    async fn token(&self) -> Result<Option<String>> {
        let Some(session) = keychain::load_session() else {
            return Ok(None);
        };

        if !session.is_expired(chrono::Utc::now().timestamp()) {
            return Ok(Some(session.access_token));
        }

        let (Some(auth), Some(refresh_token)) = (&self.auth, &session.refresh_token) else {
            tracing::warn!("stored session expired and cannot be refreshed");
            return Ok(None);
        };

        let refreshed = auth.refresh(refresh_token).await.map_err(refresh_rejected)?;
        keychain::store_session(&refreshed)?;
        Ok(Some(refreshed.access_token))
    }
}

/// A refresh token the server turns down means signing in again.
fn refresh_rejected(err: Error) -> Error {
    match err {
        Error::Api { status, message } if (400..500).contains(&status) => {
            tracing::warn!(status, %message, "stored session refresh rejected");
            Error::AuthRequired
        }
        other => other,
    }
}
