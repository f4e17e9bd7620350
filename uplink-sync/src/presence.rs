//! Peer presence tracking.
//!
//! Presence is a belief, not a measurement: it flips `Online` when an
//! acknowledgement arrives, `Offline` when the outstanding packet has gone
//! unacknowledged past the offline timeout, and follows whatever an
//! external presence source reports in between.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// The engine's belief about remote-peer reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceStatus {
    /// No signal either way yet.
    Unknown,
    /// The peer recently acknowledged, or a presence source says so.
    Online,
    /// Acknowledgements stopped arriving, or a presence source says so.
    Offline,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        };
        write!(f, "{s}")
    }
}

/// Holds the current presence belief and reports transitions.
#[derive(Debug)]
pub struct PresenceMonitor {
    status: PresenceStatus,
}

impl PresenceMonitor {
    /// Creates a monitor in the `Unknown` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: PresenceStatus::Unknown,
        }
    }

    /// Current presence belief.
    #[must_use]
    pub fn status(&self) -> PresenceStatus {
        self.status
    }

    /// Applies a presence transition. Returns true when the status
    /// actually changed.
    pub fn set(&mut self, status: PresenceStatus) -> bool {
        if self.status == status {
            return false;
        }
        info!("peer presence: {} -> {}", self.status, status);
        self.status = status;
        true
    }

    /// Whether sync work may proceed under the current belief.
    ///
    /// `Offline` always suspends; `Unknown` suspends only when the engine
    /// is configured to require an explicit online signal.
    #[must_use]
    pub fn allows_sync(&self, sync_while_unknown: bool) -> bool {
        match self.status {
            PresenceStatus::Online => true,
            PresenceStatus::Unknown => sync_while_unknown,
            PresenceStatus::Offline => false,
        }
    }
}

impl Default for PresenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
