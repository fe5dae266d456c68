//! Error types for ChatWire Egress

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provider returned {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Core(#[from] chatwire_core::Error),
}

pub type Result<T> = std::result::Result<T, EgressError>;
