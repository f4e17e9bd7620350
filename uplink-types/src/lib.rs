//! Core type definitions for Uplink.
//!
//! This crate defines the fundamental, transport-agnostic types used by the
//! sync engine:
//! - Message, packet, and object identifiers (monotonic u64 counters)
//! - Hybrid wall/logical timestamps
//! - The wire records exchanged with the remote peer (`Message`, `Packet`,
//!   `Ack`)
//!
//! Everything that knows about queues, flow control, or presence belongs in
//! `uplink-sync`, not here.

mod ids;
mod message;
mod packet;
mod timestamp;

pub use ids::{MessageId, ObjectKey, PacketId};
pub use message::Message;
pub use packet::{Ack, Packet};
pub use timestamp::Timestamp;
