// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;

fn emit_n(bus: &EventBus, project: &str, n: usize) {
    for _ in 0..n {
        bus.emit(project, None, EventPayload::Heartbeat);
    }
}

#[test]
fn ids_are_monotonic_and_never_reused() {
    let bus = EventBus::new(3);
    emit_n(&bus, "alpha", 5);
    // Ring kept only the last 3, but ids keep counting
    let history = bus.history(&EventFilter::default(), None, None);
    let seqs: Vec<u64> = history.iter().filter_map(|e| e.id.seq()).collect();
    assert_eq!(seqs, vec![3, 4, 5]);
    let next = bus.emit("alpha", None, EventPayload::Heartbeat);
    assert_eq!(next.id.seq(), Some(6));
}

#[test]
fn subscribers_receive_matching_events_in_order() {
    let bus = EventBus::new(100);
    let seen = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _guard = bus.subscribe(EventFilter::for_project("alpha"), move |e| {
        sink.lock().push(e.id.clone());
    });

    bus.emit("alpha", None, EventPayload::Heartbeat);
    bus.emit("beta", None, EventPayload::Heartbeat);
    bus.emit("alpha", None, EventPayload::Heartbeat);

    let ids: Vec<String> = seen.lock().iter().map(|i| i.as_str().to_string()).collect();
    assert_eq!(ids, vec!["evt-1", "evt-3"]);
}

#[test]
fn dropping_guard_unsubscribes() {
    let bus = EventBus::new(100);
    let seen = Arc::new(PlMutex::new(0usize));
    let sink = Arc::clone(&seen);
    let guard = bus.subscribe(EventFilter::default(), move |_| {
        *sink.lock() += 1;
    });
    bus.emit("alpha", None, EventPayload::Heartbeat);
    drop(guard);
    bus.emit("alpha", None, EventPayload::Heartbeat);
    assert_eq!(*seen.lock(), 1);
    assert_eq!(bus.snapshot().subscriber_count, 0);
}

#[test]
fn history_since_is_strictly_after() {
    let bus = EventBus::new(100);
    emit_n(&bus, "alpha", 5);
    let since = EventId::from_seq(3);
    let events = bus.history(&EventFilter::default(), Some(&since), None);
    let seqs: Vec<u64> = events.iter().filter_map(|e| e.id.seq()).collect();
    assert_eq!(seqs, vec![4, 5]);
}

#[test]
fn history_limit_keeps_newest() {
    let bus = EventBus::new(100);
    emit_n(&bus, "alpha", 5);
    let events = bus.history(&EventFilter::default(), None, Some(2));
    let seqs: Vec<u64> = events.iter().filter_map(|e| e.id.seq()).collect();
    assert_eq!(seqs, vec![4, 5]);
}

#[test]
fn subscribing_from_within_a_callback_does_not_deadlock() {
    let bus = EventBus::new(100);
    let bus_clone = bus.clone();
    let inner_guard = Arc::new(PlMutex::new(None));
    let slot = Arc::clone(&inner_guard);
    let _guard = bus.subscribe(EventFilter::default(), move |_| {
        let g = bus_clone.subscribe(EventFilter::default(), |_| {});
        *slot.lock() = Some(g);
    });
    bus.emit("alpha", None, EventPayload::Heartbeat);
    assert!(inner_guard.lock().is_some());
}

#[test]
fn snapshot_reports_ring_state() {
    let bus = EventBus::new(2);
    emit_n(&bus, "alpha", 3);
    let snapshot = bus.snapshot();
    assert_eq!(snapshot.next_seq, 4);
    assert_eq!(snapshot.history_len, 2);
    assert_eq!(snapshot.capacity, 2);
}
