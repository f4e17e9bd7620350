//! Engine configuration.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Configuration for the sync engine.
///
/// All fields have working defaults; construct with struct-update syntax:
///
/// ```
/// use std::time::Duration;
/// use uplink_sync::SyncConfig;
///
/// let config = SyncConfig {
///     batch_size: 2,
///     debounce: Duration::from_millis(500),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum messages bundled into one packet.
    pub batch_size: usize,

    /// Quiet period after the last enqueue before a batch may be built.
    pub debounce: Duration,

    /// Period of the scheduler tick driving the engine.
    pub sync_rate: Duration,

    /// How long to wait for an acknowledgement before resending the
    /// outstanding packet.
    pub ack_rate: Duration,

    /// Silence since the outstanding packet's *first* transmission after
    /// which the peer is considered offline.
    pub offline_timeout: Duration,

    /// How many sent packet ids to retain for duplicate-ack detection.
    pub history_limit: usize,

    /// Whether the engine may sync while peer presence is still `Unknown`.
    /// When false, an explicit `Online` signal is required before the
    /// first packet goes out.
    pub sync_while_unknown: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            debounce: Duration::from_secs(10),
            sync_rate: Duration::from_secs(3),
            ack_rate: Duration::from_secs(10),
            offline_timeout: Duration::from_secs(20),
            history_limit: 16,
            sync_while_unknown: true,
        }
    }
}

impl SyncConfig {
    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".into()));
        }
        if self.sync_rate.is_zero() {
            return Err(SyncError::Config("sync_rate must be non-zero".into()));
        }
        if self.ack_rate.is_zero() {
            return Err(SyncError::Config("ack_rate must be non-zero".into()));
        }
        if self.offline_timeout < self.ack_rate {
            return Err(SyncError::Config(
                "offline_timeout must be at least ack_rate".into(),
            ));
        }
        Ok(())
    }
}
