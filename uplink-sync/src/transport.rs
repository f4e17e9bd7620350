//! Transport collaborator contract.
//!
//! Abstracts over whatever channel carries packets to the remote peer.
//! The engine calls `send` for both the initial transmission and resends
//! of the identical packet; delivery is at-least-once and deduplication is
//! the consumer's problem.

use crate::error::SyncResult;
use async_trait::async_trait;
use uplink_types::Packet;

/// Packet delivery channel consumed by the engine.
#[async_trait]
pub trait PacketTransport: Send + Sync {
    /// Transmits a packet to the remote peer.
    async fn send(&self, packet: &Packet) -> SyncResult<()>;
}

/// An in-memory transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records transmitted packets in memory; sends can be toggled to
    /// fail for error-path tests.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        sent: Arc<Mutex<Vec<Packet>>>,
        failing: AtomicBool,
    }

    impl MockTransport {
        /// Creates a transport with an empty send log.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent send fail (or succeed again).
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Number of transmissions so far, resends included.
        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        /// Clones the transmitted packets, in send order.
        pub fn sent(&self) -> Vec<Packet> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PacketTransport for MockTransport {
        async fn send(&self, packet: &Packet) -> SyncResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::Network("send rejected".into()));
            }
            self.sent.lock().unwrap().push(packet.clone());
            Ok(())
        }
    }
}
