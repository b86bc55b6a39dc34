//! Spec: gap-free history resume, the contract behind SSE `since=`.

use crate::prelude::*;
use ah_core::{EventFilter, EventId, EventPayload};

#[tokio::test]
async fn resume_from_since_is_gap_free() {
    let rig = Rig::with_project("alpha").await;
    let bus = rig.manager.bus();
    for i in 0..10 {
        bus.emit(
            "alpha",
            None,
            EventPayload::Output {
                text: format!("line {i}"),
            },
        );
    }

    // First read: everything
    let all = bus.history(&EventFilter::for_project("alpha"), None, None);
    let last_seen = all[4].id.clone();

    // Reconnect strictly after the cursor
    let resumed = bus.history(
        &EventFilter::for_project("alpha"),
        Some(&last_seen),
        None,
    );
    let seqs: Vec<u64> = resumed.iter().filter_map(|e| e.id.seq()).collect();
    let expected: Vec<u64> = ((last_seen.seq().unwrap() + 1)..=all.last().unwrap().id.seq().unwrap()).collect();
    assert_eq!(seqs, expected);

    // Resuming from the newest id yields nothing until new events land
    let newest = all.last().unwrap().id.clone();
    assert!(bus
        .history(&EventFilter::for_project("alpha"), Some(&newest), None)
        .is_empty());
    bus.emit("alpha", None, EventPayload::Heartbeat);
    assert_eq!(
        bus.history(&EventFilter::for_project("alpha"), Some(&newest), None)
            .len(),
        1
    );
}

#[tokio::test]
async fn eviction_leaves_monotonic_tail() {
    // Small dedicated bus so eviction actually happens
    let bus = ah_engine::EventBus::new(5);
    for _ in 0..12 {
        bus.emit("alpha", None, EventPayload::Heartbeat);
    }
    let events = bus.history(&EventFilter::default(), None, None);
    let seqs: Vec<u64> = events.iter().filter_map(|e| e.id.seq()).collect();
    assert_eq!(seqs, vec![8, 9, 10, 11, 12]);
}

#[tokio::test]
async fn since_parse_rejects_garbage() {
    assert!(EventId::parse("evt-100").is_some());
    assert!(EventId::parse("100").is_none());
    assert!(EventId::parse("evt-x").is_none());
}
