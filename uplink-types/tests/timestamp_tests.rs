use uplink_types::Timestamp;

#[test]
fn now_has_no_logical_component() {
    let ts = Timestamp::now();
    assert_eq!(ts.logical(), 0);
    assert!(ts.wall_time() > 0);
}

#[test]
fn components_roundtrip() {
    let ts = Timestamp::new(1_700_000_000_000, 7);
    assert_eq!(ts.wall_time(), 1_700_000_000_000);
    assert_eq!(ts.logical(), 7);
}

#[test]
fn tick_is_strictly_monotonic() {
    let mut ts = Timestamp::now();
    for _ in 0..1000 {
        let next = ts.tick();
        assert!(next > ts);
        ts = next;
    }
}

#[test]
fn tick_increments_logical_when_wall_time_stalls() {
    // A stamp far in the future forces the logical-counter branch.
    let ts = Timestamp::new(u64::MAX - 1, 0);
    let next = ts.tick();
    assert_eq!(next.wall_time(), ts.wall_time());
    assert_eq!(next.logical(), 1);
}

#[test]
fn ordering_is_wall_time_then_logical() {
    let a = Timestamp::new(100, 5);
    let b = Timestamp::new(100, 6);
    let c = Timestamp::new(101, 0);

    assert!(a < b);
    assert!(b < c);
    assert!(a < c);
}

#[test]
fn serde_roundtrip() {
    let ts = Timestamp::new(123_456, 3);
    let json = serde_json::to_string(&ts).unwrap();
    let parsed: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ts);
}
