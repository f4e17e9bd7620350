//! Outbound packet lifecycle — construction, the single outstanding slot,
//! and acknowledgement matching.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, warn};
use uplink_types::{Ack, Message, Packet, PacketId, Timestamp};

/// Engine-global packet status, governing whether a new packet may be
/// built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketStatus {
    /// No packet has been sent yet this session.
    Init,
    /// A packet is outstanding, awaiting acknowledgement.
    AckPending,
    /// The last sent packet was acknowledged.
    AckOk,
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::AckPending => "ACK_PENDING",
            Self::AckOk => "ACK_OK",
        };
        write!(f, "{s}")
    }
}

/// Allocates packet ids and wraps batches into immutable packets.
///
/// Ids are strictly increasing and independent of the message id space.
#[derive(Debug)]
pub struct PacketFactory {
    next_id: u64,
    clock: Timestamp,
}

impl PacketFactory {
    /// Creates a factory with a fresh id counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            clock: Timestamp::now(),
        }
    }

    /// Builds a packet from a batch of messages.
    pub fn create(&mut self, batch: Vec<Message>) -> Packet {
        let id = PacketId::new(self.next_id);
        self.next_id += 1;
        self.clock = self.clock.tick();
        Packet::new(id, self.clock, batch)
    }
}

impl Default for PacketFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// The single sent-but-unacknowledged packet.
///
/// Exists if and only if the tracker status is `AckPending`. `first_sent`
/// anchors the offline timeout to the original transmission; resends only
/// move `last_sent`.
#[derive(Debug, Clone)]
pub struct OutstandingPacket {
    /// The packet awaiting acknowledgement.
    pub packet: Packet,
    /// When the packet was first transmitted.
    pub first_sent: Instant,
    /// When the packet was most recently transmitted.
    pub last_sent: Instant,
}

/// How an incoming acknowledgement was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Matched the outstanding packet; the send slot is now free.
    Acknowledged(PacketId),
    /// Arrived while nothing was outstanding.
    NoneOutstanding(PacketId),
    /// Matched a previously sent packet, not the outstanding one.
    Duplicate(PacketId),
    /// Referenced a packet id this engine never sent.
    Unknown(PacketId),
}

/// Tracks the in-flight packet, matches acknowledgements, and keeps a
/// bounded window of recently sent packet ids for duplicate detection.
#[derive(Debug)]
pub struct PacketTracker {
    status: PacketStatus,
    outstanding: Option<OutstandingPacket>,
    /// Committed packet whose first transmission failed; retried before
    /// any new packet is built.
    parked: Option<Packet>,
    history: VecDeque<PacketId>,
    history_limit: usize,
    acks_received: u64,
}

impl PacketTracker {
    /// Creates a tracker retaining at most `history_limit` sent ids.
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            status: PacketStatus::Init,
            outstanding: None,
            parked: None,
            history: VecDeque::new(),
            history_limit,
            acks_received: 0,
        }
    }

    /// Current packet status.
    #[must_use]
    pub fn status(&self) -> PacketStatus {
        self.status
    }

    /// The outstanding packet record, if one exists.
    #[must_use]
    pub fn outstanding(&self) -> Option<&OutstandingPacket> {
        self.outstanding.as_ref()
    }

    /// Id of the parked (committed but never transmitted) packet.
    #[must_use]
    pub fn parked(&self) -> Option<PacketId> {
        self.parked.as_ref().map(Packet::id)
    }

    /// Ids of recently sent packets, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<PacketId> {
        self.history.iter().copied().collect()
    }

    /// Total acknowledgements registered, matched or not.
    #[must_use]
    pub fn acks_received(&self) -> u64 {
        self.acks_received
    }

    /// Records a successful transmission of a new packet: the packet
    /// becomes outstanding and its id enters the sent history.
    pub fn mark_outstanding(&mut self, packet: Packet, now: Instant) {
        self.history.push_back(packet.id());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        self.outstanding = Some(OutstandingPacket {
            packet,
            first_sent: now,
            last_sent: now,
        });
        self.status = PacketStatus::AckPending;
        self.check_invariant();
    }

    /// Records a retransmission of the outstanding packet. `first_sent`
    /// is left untouched so the offline timeout keeps measuring from the
    /// original send.
    pub fn mark_resent(&mut self, now: Instant) {
        if let Some(out) = self.outstanding.as_mut() {
            out.last_sent = now;
        }
    }

    /// Re-anchors the offline timeout after the peer came back online
    /// with a packet still outstanding. `last_sent` is left in the past
    /// so the next cycle retransmits promptly.
    pub fn reanchor(&mut self, now: Instant) {
        if let Some(out) = self.outstanding.as_mut() {
            out.first_sent = now;
        }
    }

    /// Parks a committed packet whose transmission failed. Status and the
    /// outstanding slot are untouched.
    pub fn park(&mut self, packet: Packet) {
        self.parked = Some(packet);
    }

    /// Takes the parked packet for a transmission retry.
    pub fn take_parked(&mut self) -> Option<Packet> {
        self.parked.take()
    }

    /// Matches an incoming acknowledgement against the outstanding packet.
    ///
    /// Only an exact match advances the status; everything else is an
    /// anomaly reported through the returned outcome and a log line, with
    /// no state change.
    pub fn register_ack(&mut self, ack: &Ack) -> AckOutcome {
        self.acks_received += 1;

        let Some(out) = self.outstanding.as_ref() else {
            warn!("ack for packet {} with nothing outstanding", ack.packet_id);
            return AckOutcome::NoneOutstanding(ack.packet_id);
        };

        if out.packet.id() == ack.packet_id {
            debug!("packet {} acknowledged", ack.packet_id);
            self.outstanding = None;
            self.status = PacketStatus::AckOk;
            self.check_invariant();
            return AckOutcome::Acknowledged(ack.packet_id);
        }

        if self.history.contains(&ack.packet_id) {
            warn!(
                "stale ack for previously sent packet {} (outstanding is {})",
                ack.packet_id,
                out.packet.id()
            );
            AckOutcome::Duplicate(ack.packet_id)
        } else {
            warn!("ack for unknown packet {}", ack.packet_id);
            AckOutcome::Unknown(ack.packet_id)
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.outstanding.is_some(),
            self.status == PacketStatus::AckPending,
            "outstanding record must exist exactly while ACK_PENDING"
        );
    }
}
