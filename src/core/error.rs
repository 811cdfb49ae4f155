//! Error types for the core module.

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No bearer token is available for an authenticated call.
    #[error("authentication required: run `helpdesk auth login` or set HELPDESK_TOKEN")]
    AuthRequired,

    /// A second exchange was submitted while one is still streaming.
    #[error("an exchange is already in flight for this session")]
    ExchangeInFlight,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Caller supplied invalid input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Credential storage failed.
    #[error("keychain error: {0}")]
    Keychain(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
