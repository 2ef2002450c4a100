//! Authentication error types.

use portal_storage::StorageError;
use thiserror::Error;

/// User-facing message for a failed login.
pub const LOGIN_REJECTED_MESSAGE: &str = "Invalid username/email or password";

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login failed for any reason. Detail is logged, never surfaced.
    #[error("{}", LOGIN_REJECTED_MESSAGE)]
    LoginRejected,

    /// Invalid state transition in the session lifecycle
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Message safe to show on the login form, if this error is meant for the user.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AuthError::LoginRejected => Some(LOGIN_REJECTED_MESSAGE),
            _ => None,
        }
    }
}

impl From<portal_config_and_utils::CoreError> for AuthError {
    fn from(err: portal_config_and_utils::CoreError) -> Self {
        AuthError::Config(err.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

/// Why a persisted session could not be restored.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// Stored data exists but cannot back a session.
    #[error("Stored session is corrupt: {0}")]
    Corrupt(String),

    /// No backend could be read.
    #[error("Session storage unavailable: {0}")]
    Unavailable(#[source] StorageError),
}

/// Failure reported by a login collaborator.
#[derive(Error, Debug)]
pub enum LoginError {
    /// Server refused the credentials.
    #[error("Credentials rejected (status {0})")]
    InvalidCredentials(u16),

    /// Transport failure or unexpected status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded the configured timeout.
    #[error("Login request timed out")]
    Timeout,

    /// Response body could not be interpreted.
    #[error("Malformed login response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LoginError::Timeout
        } else {
            LoginError::Http(err.to_string())
        }
    }
}
