//! Sync orchestration engine for Uplink.
//!
//! Synchronizes a stream of change-events from a producer to a remote
//! consumer over an unreliable, intermittently-connected channel. Bursts
//! of edits are debounced and coalesced, batched into immutable packets,
//! and delivered with at-most-one-outstanding flow control: a packet must
//! be acknowledged (or time out and be resent) before the next one goes
//! out. Prolonged silence flips the peer offline and suspends the engine
//! until presence recovers.
//!
//! # Components
//!
//! - **Queue** (`MessageQueue`): ordered buffer of pending change-events
//!   with debounce tracking and per-object coalescing
//! - **Outbound** (`PacketFactory`, `PacketTracker`): packet construction
//!   and the acknowledgement/retry state machine
//! - **Presence** (`PresenceMonitor`): belief about peer reachability,
//!   derived from ack timeliness and an external presence source
//! - **Engine** (`SyncEngine`): the per-tick orchestration state machine
//! - **Orchestrator** (`SyncOrchestrator`): lifecycle, the periodic tick,
//!   and the event stream
//!
//! Persistence, transport, and inbound application are collaborator
//! traits (`PacketStore`, `PacketTransport`, `MessageSink`); the engine
//! commits every packet before it is transmitted.
//!
//! # Example
//!
//! ```
//! use uplink_sync::{SyncConfig, SyncEngine};
//!
//! let engine = SyncEngine::new(SyncConfig::default());
//! assert_eq!(engine.config().batch_size, 5);
//! ```

mod config;
mod engine;
mod error;
pub mod inbound;
mod orchestrator;
mod outbound;
mod presence;
mod queue;
pub mod store;
pub mod transport;

pub use config::SyncConfig;
pub use engine::{CycleOutcome, EngineLifecycle, EngineSnapshot, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use inbound::MessageSink;
pub use orchestrator::{SyncEvent, SyncHandle, SyncOrchestrator};
pub use outbound::{AckOutcome, OutstandingPacket, PacketFactory, PacketStatus, PacketTracker};
pub use presence::{PresenceMonitor, PresenceStatus};
pub use queue::MessageQueue;
pub use store::PacketStore;
pub use transport::PacketTransport;
