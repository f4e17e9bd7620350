use std::time::Duration;
use tokio::time::Instant;
use uplink_sync::{AckOutcome, PacketFactory, PacketStatus, PacketTracker};
use uplink_types::{Ack, Message, MessageId, ObjectKey, Packet, PacketId, Timestamp};

fn make_message(id: u64, object: u64) -> Message {
    Message::new(
        MessageId::new(id),
        ObjectKey::new(object),
        "payload",
        Timestamp::now(),
    )
}

fn make_packet(factory: &mut PacketFactory) -> Packet {
    factory.create(vec![make_message(1, 1)])
}

// ── PacketFactory ────────────────────────────────────────────────

#[test]
fn factory_ids_are_strictly_increasing() {
    let mut factory = PacketFactory::new();
    let ids: Vec<PacketId> = (0..20).map(|_| make_packet(&mut factory).id()).collect();

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn factory_wraps_batch_in_order() {
    let mut factory = PacketFactory::new();
    let batch = vec![make_message(1, 1), make_message(2, 2), make_message(3, 3)];
    let packet = factory.create(batch.clone());

    assert_eq!(packet.messages(), batch.as_slice());
    assert_eq!(packet.len(), 3);
}

#[test]
fn factory_stamps_are_strictly_increasing() {
    let mut factory = PacketFactory::new();
    let a = make_packet(&mut factory);
    let b = make_packet(&mut factory);
    assert!(a.created_at() < b.created_at());
}

// ── PacketTracker transitions ────────────────────────────────────

#[test]
fn tracker_starts_in_init_with_no_record() {
    let tracker = PacketTracker::new(16);
    assert_eq!(tracker.status(), PacketStatus::Init);
    assert!(tracker.outstanding().is_none());
    assert!(tracker.history().is_empty());
}

#[test]
fn mark_outstanding_sets_ack_pending() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let packet = make_packet(&mut factory);
    let id = packet.id();

    tracker.mark_outstanding(packet, Instant::now());

    assert_eq!(tracker.status(), PacketStatus::AckPending);
    let out = tracker.outstanding().unwrap();
    assert_eq!(out.packet.id(), id);
    assert_eq!(out.first_sent, out.last_sent);
    assert_eq!(tracker.history(), vec![id]);
}

#[test]
fn mark_resent_moves_last_sent_only() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(10);

    tracker.mark_outstanding(make_packet(&mut factory), t0);
    tracker.mark_resent(t1);

    let out = tracker.outstanding().unwrap();
    assert_eq!(out.first_sent, t0);
    assert_eq!(out.last_sent, t1);
}

#[test]
fn reanchor_moves_first_sent_only() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(30);

    tracker.mark_outstanding(make_packet(&mut factory), t0);
    tracker.reanchor(t1);

    let out = tracker.outstanding().unwrap();
    assert_eq!(out.first_sent, t1);
    assert_eq!(out.last_sent, t0);
}

#[test]
fn history_window_is_bounded() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(2);

    let mut ids = Vec::new();
    for _ in 0..4 {
        let packet = make_packet(&mut factory);
        ids.push(packet.id());
        tracker.mark_outstanding(packet, Instant::now());
    }

    // Only the two most recent ids survive.
    assert_eq!(tracker.history(), vec![ids[2], ids[3]]);
}

#[test]
fn park_and_take_roundtrip() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let packet = make_packet(&mut factory);
    let id = packet.id();

    tracker.park(packet);
    assert_eq!(tracker.parked(), Some(id));
    // Parking does not touch the status machine.
    assert_eq!(tracker.status(), PacketStatus::Init);
    assert!(tracker.outstanding().is_none());

    let taken = tracker.take_parked().unwrap();
    assert_eq!(taken.id(), id);
    assert!(tracker.take_parked().is_none());
}

// ── Acknowledgement matching ─────────────────────────────────────

#[test]
fn matching_ack_frees_the_slot() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let packet = make_packet(&mut factory);
    let id = packet.id();
    tracker.mark_outstanding(packet, Instant::now());

    let outcome = tracker.register_ack(&Ack::new(id));

    assert_eq!(outcome, AckOutcome::Acknowledged(id));
    assert_eq!(tracker.status(), PacketStatus::AckOk);
    assert!(tracker.outstanding().is_none());
    assert_eq!(tracker.acks_received(), 1);
}

#[test]
fn ack_with_nothing_outstanding_is_reported() {
    let mut tracker = PacketTracker::new(16);
    let id = PacketId::new(42);

    let outcome = tracker.register_ack(&Ack::new(id));

    assert_eq!(outcome, AckOutcome::NoneOutstanding(id));
    assert_eq!(tracker.status(), PacketStatus::Init);
}

#[test]
fn stale_ack_for_previous_packet_changes_nothing() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);

    let first = make_packet(&mut factory);
    let first_id = first.id();
    tracker.mark_outstanding(first, Instant::now());
    tracker.register_ack(&Ack::new(first_id));

    let second = make_packet(&mut factory);
    let second_id = second.id();
    tracker.mark_outstanding(second, Instant::now());

    let outcome = tracker.register_ack(&Ack::new(first_id));

    assert_eq!(outcome, AckOutcome::Duplicate(first_id));
    assert_eq!(tracker.status(), PacketStatus::AckPending);
    assert_eq!(tracker.outstanding().unwrap().packet.id(), second_id);
}

#[test]
fn unknown_packet_id_is_reported() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    tracker.mark_outstanding(make_packet(&mut factory), Instant::now());

    let bogus = PacketId::new(9999);
    let outcome = tracker.register_ack(&Ack::new(bogus));

    assert_eq!(outcome, AckOutcome::Unknown(bogus));
    assert_eq!(tracker.status(), PacketStatus::AckPending);
}

#[test]
fn every_registration_is_counted() {
    let mut factory = PacketFactory::new();
    let mut tracker = PacketTracker::new(16);
    let packet = make_packet(&mut factory);
    let id = packet.id();
    tracker.mark_outstanding(packet, Instant::now());

    tracker.register_ack(&Ack::new(PacketId::new(777)));
    tracker.register_ack(&Ack::new(id));
    tracker.register_ack(&Ack::new(id));

    assert_eq!(tracker.acks_received(), 3);
}
