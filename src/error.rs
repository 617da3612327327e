//! Error types for the harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while launching and driving a form under test
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to start a browser or page worker
    #[error("Harness initialization failed: {0}")]
    InitializationError(String),

    /// Failed to navigate the page
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The renderer failed to mount or update the form
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A schema or launch config could not be encoded or decoded
    #[error("Codec error: {0}")]
    CodecError(String),

    /// A `type` tag that is not part of the field table
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    /// The page never attached its launch target
    #[error("Launch target not attached after {0} attempts")]
    LaunchTargetMissing(u32),

    /// No element matched a locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page worker has shut down
    #[error("Page is closed")]
    PageClosed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CodecError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::LoadError(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
