//! Inbound delivery contract — the consumer side of the protocol.
//!
//! When a packet arrives from the peer, the engine hands each contained
//! message to the application, in packet order, and produces the
//! acknowledgement to ship back.

use crate::error::SyncResult;
use async_trait::async_trait;
use uplink_types::Message;

/// Applies received change-events to local application state.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Applies one message. Called once per message, in packet order.
    async fn apply(&self, message: &Message) -> SyncResult<()>;
}

/// An in-memory sink for testing.
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records applied messages in arrival order.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        applied: Arc<Mutex<Vec<Message>>>,
    }

    impl RecordingSink {
        /// Creates a sink with an empty log.
        pub fn new() -> Self {
            Self::default()
        }

        /// Clones the applied messages, in application order.
        pub fn applied(&self) -> Vec<Message> {
            self.applied.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn apply(&self, message: &Message) -> SyncResult<()> {
            self.applied.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
