//! Error types for the vox client

use thiserror::Error;

/// Result type alias for vox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the vox client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or credential error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure (connect, read, or write on the streaming socket)
    #[error("transport error: {0}")]
    Transport(String),

    /// Unexpected event where the protocol mandates an order
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Explicit error event from the server, payload verbatim
    #[error("server error: {0}")]
    Server(String),

    /// Capture or playback device failure
    #[error("device error: {0}")]
    Device(String),

    /// One-shot API call failure (enrollment, recognition)
    #[error("api error: {0}")]
    Api(String),

    /// Audio file handling error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
