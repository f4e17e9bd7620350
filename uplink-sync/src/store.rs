//! Persistence collaborator contract.
//!
//! The engine commits every packet before transmitting it; a packet that
//! was never accepted by the store is never put on the wire. What "commit"
//! means (database row, journal append, cloud object) is up to the
//! implementation.

use crate::error::SyncResult;
use async_trait::async_trait;
use uplink_types::Packet;

/// Durable packet storage consumed by the engine.
///
/// `start()` refuses to run without one configured.
#[async_trait]
pub trait PacketStore: Send + Sync {
    /// Persists a packet. Must resolve (success or failure) before the
    /// engine attempts transmission.
    async fn commit(&self, packet: &Packet) -> SyncResult<()>;
}

/// An in-memory store for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records committed packets in memory; commits can be toggled to
    /// fail for error-path tests.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        committed: Arc<Mutex<Vec<Packet>>>,
        failing: AtomicBool,
    }

    impl MemoryStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent commit fail (or succeed again).
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Number of packets committed so far.
        pub fn committed_count(&self) -> usize {
            self.committed.lock().unwrap().len()
        }

        /// Clones the committed packets, in commit order.
        pub fn committed(&self) -> Vec<Packet> {
            self.committed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PacketStore for MemoryStore {
        async fn commit(&self, packet: &Packet) -> SyncResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::Storage("commit rejected".into()));
            }
            self.committed.lock().unwrap().push(packet.clone());
            Ok(())
        }
    }
}
