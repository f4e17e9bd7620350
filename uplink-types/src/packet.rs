//! Packets and acknowledgements — the delivery units of the sync protocol.

use crate::{Message, PacketId, Timestamp};
use serde::{Deserialize, Serialize};

/// An immutable bundle of messages sent as a single delivery unit.
///
/// Identity is the packet id; the same packet may be transmitted more than
/// once (resends) but its contents never change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    id: PacketId,
    created_at: Timestamp,
    messages: Vec<Message>,
}

impl Packet {
    /// Creates a new packet wrapping a batch of messages.
    #[must_use]
    pub fn new(id: PacketId, created_at: Timestamp, messages: Vec<Message>) -> Self {
        Self {
            id,
            created_at,
            messages,
        }
    }

    /// The packet's identity.
    #[must_use]
    pub const fn id(&self) -> PacketId {
        self.id
    }

    /// When the packet was built.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// The bundled messages, in queue order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of bundled messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the packet carries no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Acknowledgement of a received packet, sent back by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// The packet being acknowledged.
    pub packet_id: PacketId,

    /// When the consumer registered the packet.
    pub received_at: Timestamp,
}

impl Ack {
    /// Creates an acknowledgement for a packet, stamped now.
    #[must_use]
    pub fn new(packet_id: PacketId) -> Self {
        Self {
            packet_id,
            received_at: Timestamp::now(),
        }
    }
}
