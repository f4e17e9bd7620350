//! Sync engine — the orchestration state machine.
//!
//! The engine owns the queue, the packet factory, the acknowledgement
//! tracker, and the presence monitor, and decides once per scheduler tick
//! whether to batch-and-send a new packet or wait on / resend the
//! outstanding one. It performs its collaborator I/O (commit, send) inline
//! so a whole cycle resolves before the caller releases the engine; the
//! orchestrator wraps it in a mutex and never overlaps cycles.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::inbound::MessageSink;
use crate::outbound::{AckOutcome, PacketFactory, PacketStatus, PacketTracker};
use crate::presence::{PresenceMonitor, PresenceStatus};
use crate::queue::MessageQueue;
use crate::store::PacketStore;
use crate::transport::PacketTransport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uplink_types::{Ack, MessageId, ObjectKey, Packet, PacketId};

/// Engine lifecycle. `Stopped` never transitions back on its own; a fresh
/// `start()` is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineLifecycle {
    /// Constructed, not yet ticking.
    Initialized,
    /// The scheduler is driving cycles.
    Running,
    /// Ticking has been cancelled.
    Stopped,
}

impl fmt::Display for EngineLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Presence forbids any sync work this tick.
    Suspended,
    /// Nothing queued and nothing outstanding to chase.
    Idle,
    /// Messages are queued but the debounce window is still open.
    DebouncePending,
    /// A new packet went out.
    Sent(PacketId),
    /// The outstanding packet was retransmitted.
    Resent(PacketId),
    /// The outstanding packet is within its ack window; keep waiting.
    AwaitingAck,
    /// The outstanding packet aged past the offline timeout; the peer is
    /// now considered offline.
    PeerOffline,
}

/// Point-in-time view of the engine, returned by `status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub lifecycle: EngineLifecycle,
    pub packet_status: PacketStatus,
    pub presence: PresenceStatus,
    pub queue_len: usize,
    pub outstanding: Option<PacketId>,
    pub parked: Option<PacketId>,
    pub sent_history: Vec<PacketId>,
    pub ack_override: bool,
    pub acks_received: u64,
}

/// The sync engine.
///
/// All state mutation happens through `&mut self`; callers are responsible
/// for serializing access (the orchestrator does this with a mutex held
/// across each full cycle).
pub struct SyncEngine {
    config: SyncConfig,
    lifecycle: EngineLifecycle,
    queue: MessageQueue,
    factory: PacketFactory,
    tracker: PacketTracker,
    presence: PresenceMonitor,
    ack_override: bool,
    store: Option<Arc<dyn PacketStore>>,
    transport: Option<Arc<dyn PacketTransport>>,
    sink: Option<Arc<dyn MessageSink>>,
}

impl SyncEngine {
    /// Creates an engine with no collaborators configured.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let history_limit = config.history_limit;
        Self {
            config,
            lifecycle: EngineLifecycle::Initialized,
            queue: MessageQueue::new(),
            factory: PacketFactory::new(),
            tracker: PacketTracker::new(history_limit),
            presence: PresenceMonitor::new(),
            ack_override: false,
            store: None,
            transport: None,
            sink: None,
        }
    }

    /// Sets the persistence collaborator.
    pub fn set_store(&mut self, store: Arc<dyn PacketStore>) {
        self.store = Some(store);
    }

    /// Sets the transport collaborator.
    pub fn set_transport(&mut self, transport: Arc<dyn PacketTransport>) {
        self.transport = Some(transport);
    }

    /// Sets the inbound delivery handler.
    pub fn set_sink(&mut self, sink: Arc<dyn MessageSink>) {
        self.sink = Some(sink);
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Read access to the pending queue.
    #[must_use]
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> EngineLifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: EngineLifecycle) {
        self.lifecycle = lifecycle;
    }

    /// Current packet status.
    #[must_use]
    pub fn packet_status(&self) -> PacketStatus {
        self.tracker.status()
    }

    /// Current presence belief.
    #[must_use]
    pub fn presence(&self) -> PresenceStatus {
        self.presence.status()
    }

    /// Verifies the engine can start: valid config plus a configured store
    /// and transport.
    pub fn ensure_ready(&self) -> SyncResult<()> {
        self.config.validate()?;
        if self.store.is_none() {
            return Err(SyncError::Misconfigured(
                "no packet store configured".into(),
            ));
        }
        if self.transport.is_none() {
            return Err(SyncError::Misconfigured(
                "no packet transport configured".into(),
            ));
        }
        Ok(())
    }

    /// Queues a change-event for delivery and resets the debounce clock.
    pub fn enqueue(&mut self, payload: impl Into<String>, object: ObjectKey) -> MessageId {
        self.queue.enqueue(payload, object)
    }

    /// Engages or clears the diagnostic override that permits sending a
    /// new packet while one is still awaiting acknowledgement.
    pub fn override_acks(&mut self, enabled: bool) {
        if self.ack_override != enabled {
            info!(
                "ack override {}",
                if enabled { "engaged" } else { "cleared" }
            );
        }
        self.ack_override = enabled;
    }

    /// Applies a presence transition from an external presence source.
    /// Returns true when the belief actually changed.
    ///
    /// Coming back `Online` with a packet still outstanding re-anchors the
    /// offline timeout to now; `last_sent` stays in the past so the next
    /// cycle retransmits promptly.
    pub fn update_presence(&mut self, status: PresenceStatus) -> bool {
        let changed = self.presence.set(status);
        if changed && status == PresenceStatus::Online {
            self.tracker.reanchor(Instant::now());
        }
        changed
    }

    /// Registers an acknowledgement from the peer.
    ///
    /// A match frees the send slot and marks the peer online; everything
    /// else is logged and changes nothing.
    pub fn register_ack(&mut self, ack: &Ack) -> AckOutcome {
        let outcome = self.tracker.register_ack(ack);
        if matches!(outcome, AckOutcome::Acknowledged(_)) {
            self.presence.set(PresenceStatus::Online);
        }
        outcome
    }

    /// Consumer side: applies each message in a received packet to the
    /// configured sink, in packet order, and returns the acknowledgement
    /// to ship back. A sink failure on one message is logged and delivery
    /// continues with the rest.
    pub async fn receive(&self, packet: &Packet) -> SyncResult<Ack> {
        let sink = self.sink.clone().ok_or_else(|| {
            SyncError::Misconfigured("no message sink configured".into())
        })?;

        let mut applied = 0usize;
        for message in packet.messages() {
            match sink.apply(message).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    "failed to apply message {} from packet {}: {e}",
                    message.id,
                    packet.id()
                ),
            }
        }

        info!(
            "applied {applied}/{} message(s) from packet {}",
            packet.len(),
            packet.id()
        );
        Ok(Ack::new(packet.id()))
    }

    /// Runs one orchestration cycle.
    ///
    /// Commit and send failures come back as errors and leave the packet
    /// status exactly as it was; every other condition is a normal
    /// `CycleOutcome`.
    pub async fn run_cycle(&mut self) -> SyncResult<CycleOutcome> {
        let now = Instant::now();

        if !self.presence.allows_sync(self.config.sync_while_unknown) {
            debug!("peer is {}, sync suspended", self.presence.status());
            return Ok(CycleOutcome::Suspended);
        }

        if self.tracker.status() == PacketStatus::AckPending && !self.ack_override {
            self.await_or_retry(now).await
        } else {
            self.dispatch_next(now).await
        }
    }

    /// Send-new-packet path: retry a parked packet if one exists,
    /// otherwise batch the queue once the debounce window has closed.
    async fn dispatch_next(&mut self, now: Instant) -> SyncResult<CycleOutcome> {
        // A committed packet whose transmission failed takes priority over
        // building a new one.
        if let Some(packet) = self.tracker.take_parked() {
            debug!("retrying transmission of parked packet {}", packet.id());
            return self.transmit(packet, now).await;
        }

        if self.queue.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        if !self.queue.debounce_expired(self.config.debounce, now) {
            debug!("debounce window still open, deferring batch");
            return Ok(CycleOutcome::DebouncePending);
        }

        self.queue.normalize();
        let batch = self.queue.peek_batch(self.config.batch_size);
        let packet = self.factory.create(batch);

        let store = self.store.clone().ok_or_else(|| {
            SyncError::Misconfigured("no packet store configured".into())
        })?;
        if let Err(e) = store.commit(&packet).await {
            // The batch was only peeked; the queue still holds it.
            return Err(SyncError::Commit(e.to_string()));
        }

        // The store owns the packet now; the queued originals can go.
        let removed = self.queue.dequeue_batch(packet.len());
        debug_assert_eq!(removed.len(), packet.len());

        info!(
            "built packet {} with {} message(s), {} left in queue",
            packet.id(),
            packet.len(),
            self.queue.len()
        );
        self.transmit(packet, now).await
    }

    async fn transmit(&mut self, packet: Packet, now: Instant) -> SyncResult<CycleOutcome> {
        let transport = self.transport.clone().ok_or_else(|| {
            SyncError::Misconfigured("no packet transport configured".into())
        })?;

        match transport.send(&packet).await {
            Ok(()) => {
                let id = packet.id();
                self.tracker.mark_outstanding(packet, now);
                info!("packet {id} sent, awaiting ack");
                Ok(CycleOutcome::Sent(id))
            }
            Err(e) => {
                // Already committed; park it so the next cycle retries the
                // transmission instead of rebuilding.
                self.tracker.park(packet);
                Err(SyncError::Send(e.to_string()))
            }
        }
    }

    /// Await-or-retry path for the outstanding packet.
    async fn await_or_retry(&mut self, now: Instant) -> SyncResult<CycleOutcome> {
        let Some(out) = self.tracker.outstanding() else {
            // Unreachable while the tracker invariant holds.
            return Ok(CycleOutcome::AwaitingAck);
        };
        let packet = out.packet.clone();
        let first_sent = out.first_sent;
        let last_sent = out.last_sent;

        let since_first = now.saturating_duration_since(first_sent);
        if since_first >= self.config.offline_timeout {
            warn!(
                "no ack for packet {} after {since_first:?}, marking peer offline",
                packet.id()
            );
            self.presence.set(PresenceStatus::Offline);
            return Ok(CycleOutcome::PeerOffline);
        }

        let since_last = now.saturating_duration_since(last_sent);
        if since_last < self.config.ack_rate {
            debug!("awaiting ack for packet {}", packet.id());
            return Ok(CycleOutcome::AwaitingAck);
        }

        let transport = self.transport.clone().ok_or_else(|| {
            SyncError::Misconfigured("no packet transport configured".into())
        })?;
        info!(
            "resending packet {} ({since_last:?} since last transmission)",
            packet.id()
        );
        match transport.send(&packet).await {
            Ok(()) => {
                self.tracker.mark_resent(now);
                Ok(CycleOutcome::Resent(packet.id()))
            }
            // State untouched; the packet is still overdue next tick.
            Err(e) => Err(SyncError::Send(e.to_string())),
        }
    }

    /// Builds a point-in-time status snapshot.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            lifecycle: self.lifecycle,
            packet_status: self.tracker.status(),
            presence: self.presence.status(),
            queue_len: self.queue.len(),
            outstanding: self.tracker.outstanding().map(|o| o.packet.id()),
            parked: self.tracker.parked(),
            sent_history: self.tracker.history(),
            ack_override: self.ack_override,
            acks_received: self.tracker.acks_received(),
        }
    }
}
