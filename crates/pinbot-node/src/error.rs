//! Error types for the pinbot node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or running the node.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host list could not be used
    #[error("Host list {file}: {reason}")]
    HostList { file: String, reason: String },

    /// Engine error
    #[error(transparent)]
    Core(#[from] pinbot_core::Error),

    /// Client construction error
    #[error(transparent)]
    Client(#[from] pinbot_ipfs::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
