//! TeloView error types

use thiserror::Error;

/// TeloView error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel connector error (authentication, network, bad channel reference)
    #[error("Connector error: {0}")]
    Connector(String),

    /// Lesson or message lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend failure while a download is in flight
    #[error("Stream error: {0}")]
    Stream(String),

    /// Course library error
    #[error("Library error: {0}")]
    Library(String),

    /// Server bootstrap error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error means the requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for TeloView operations
pub type Result<T> = std::result::Result<T, Error>;
