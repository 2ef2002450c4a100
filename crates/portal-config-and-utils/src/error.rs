//! Errors raised while loading portal configuration and resolving paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A config value the session layer cannot work with.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot resolve the portal directory: no home directory")]
    NoHomeDir,

    #[error("api_base_url is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
