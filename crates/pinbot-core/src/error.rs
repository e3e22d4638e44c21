//! Error types for pinbot-core.

use thiserror::Error;

/// Result type for pinbot-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating replication.
#[derive(Debug, Error)]
pub enum Error {
    /// The path named a direct content address that does not decode.
    #[error("malformed content identifier: {0}")]
    MalformedIdentifier(String),

    /// The storage endpoint could not resolve the path.
    #[error("could not resolve {path}: {reason}")]
    UnresolvablePath { path: String, reason: String },

    /// A storage or cluster call failed.
    #[error(transparent)]
    Remote(#[from] pinbot_ipfs::Error),

    /// No cluster peer is configured.
    #[error("no cluster peers configured")]
    NoClusterPeers,

    /// No storage endpoint is configured.
    #[error("no storage endpoints configured")]
    NoEndpoints,

    /// The notification consumer has gone away.
    #[error("notification queue closed")]
    QueueClosed,

    /// A notification could not be delivered.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
