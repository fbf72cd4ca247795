//! Error types for the tutor gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tutor gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone or playback permission denied by the OS
    #[error("permission denied: {0}")]
    Permission(String),

    /// Audio device missing or unavailable
    #[error("device unavailable: {0}")]
    Device(String),

    /// General audio processing error (encoding, stream setup)
    #[error("audio error: {0}")]
    Audio(String),

    /// Synthesized audio could not be decoded for playback
    #[error("decode error: {0}")]
    Decode(String),

    /// Remote service reported a non-success outcome
    #[error("service error {status}: {body}")]
    Remote {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body, useful for diagnostics
        body: String,
    },

    /// The exchange with the remote service could not complete
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
