//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The persistence collaborator rejected a packet commit.
    #[error("packet commit failed: {0}")]
    Commit(String),

    /// The transport collaborator rejected a packet transmission.
    #[error("packet send failed: {0}")]
    Send(String),

    /// Storage-layer error (for `PacketStore` implementations).
    #[error("storage error: {0}")]
    Storage(String),

    /// Network-layer error (for `PacketTransport` implementations).
    #[error("network error: {0}")]
    Network(String),

    /// A required collaborator is missing or a value is out of range.
    #[error("engine misconfigured: {0}")]
    Misconfigured(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
