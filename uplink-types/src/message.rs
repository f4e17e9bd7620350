//! The change-event record carried through the queue and onto the wire.

use crate::{MessageId, ObjectKey, Timestamp};
use serde::{Deserialize, Serialize};

/// A single change-event bound for the remote peer.
///
/// Messages are immutable after creation. The payload is opaque to the
/// engine; only the object key participates in coalescing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, allocated by the queue's monotonic counter.
    pub id: MessageId,

    /// The object this change applies to.
    pub object: ObjectKey,

    /// Opaque payload, interpreted only by the receiving application.
    pub payload: String,

    /// When this message entered the queue.
    pub enqueued_at: Timestamp,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(
        id: MessageId,
        object: ObjectKey,
        payload: impl Into<String>,
        enqueued_at: Timestamp,
    ) -> Self {
        Self {
            id,
            object,
            payload: payload.into(),
            enqueued_at,
        }
    }
}
