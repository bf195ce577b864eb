use thiserror::Error as ThisError;

/// Errors that can occur while configuring or driving a LogDNA sink
#[derive(ThisError, Debug)]
pub enum Error {
    /// A required field was missing or blank.
    #[error("Configuration error: `{0}` must not be empty")]
    MissingField(&'static str),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// The authorization header could not be built from the API key.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// HTTP transport failed (DNS, connect, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The client was used after `dispose`.
    #[error("HTTP client has been disposed")]
    Disposed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
