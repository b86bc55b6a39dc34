//! Spec: agent create → observe → delete over the bus.

use crate::prelude::*;
use ah_core::{AgentStatus, EventFilter, EventPayload};
use ah_engine::ManagerError;
use parking_lot::Mutex;
use std::sync::Arc;

#[tokio::test]
async fn subscriber_sees_started_then_status_then_output() {
    let rig = Rig::with_project("alpha").await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _guard = rig.manager.bus().subscribe(
        EventFilter::for_project("alpha"),
        move |e| sink.lock().push(e.payload.kind().to_string()),
    );

    let target = rig.spawn_agent("alpha", "codex", "codex-spec-agent", "").await;

    rig.mux.set_capture(&target, "compiling the parser");
    rig.poller.tick().await;

    let kinds = seen.lock().clone();
    assert_eq!(kinds[0], "agent_started");
    assert_eq!(kinds[1], "status_changed");
    assert!(kinds.contains(&"output".to_string()), "kinds: {kinds:?}");

    // Non-empty diff moved the agent out of starting
    assert_eq!(
        rig.manager.store().agent("codex-spec-agent").unwrap().status,
        AgentStatus::Processing
    );
}

#[tokio::test]
async fn created_agent_is_listed_exactly_once() {
    let rig = Rig::with_project("alpha").await;
    rig.spawn_agent("alpha", "codex", "listed-agent", "").await;

    let listed = rig.manager.store().agents_in_project("alpha");
    let matching: Vec<_> = listed
        .iter()
        .filter(|a| a.id.as_str() == "listed-agent")
        .collect();
    assert_eq!(matching.len(), 1);
}

#[tokio::test]
async fn duplicate_id_conflicts_one_winner() {
    let rig = Rig::with_project("alpha").await;
    rig.spawn_agent("alpha", "codex", "contested-agent", "").await;

    let second = rig
        .manager
        .create_agent(
            "alpha",
            ah_core::AgentSpec {
                id: Some("contested-agent".to_string()),
                provider: "codex".to_string(),
                ..ah_core::AgentSpec::default()
            },
        )
        .await;
    assert!(matches!(second, Err(ManagerError::AgentIdTaken(_))));
    assert_eq!(rig.manager.store().agents_in_project("alpha").len(), 1);
}

#[tokio::test]
async fn delete_emits_exit_events_and_forgets_agent() {
    let rig = Rig::with_project("alpha").await;
    rig.spawn_agent("alpha", "codex", "doomed-agent", "").await;

    rig.manager.delete_agent("alpha", "doomed-agent").await.unwrap();

    let exits = rig.manager.bus().history(
        &EventFilter {
            types: Some(vec!["agent_exited".to_string()]),
            ..EventFilter::default()
        },
        None,
        None,
    );
    assert_eq!(exits.len(), 1);
    match &exits[0].payload {
        EventPayload::AgentExited { exit_code } => assert!(exit_code.is_none()),
        other => panic!("unexpected payload {other:?}"),
    }

    // Deleted id 404s and no new events carry it
    assert!(matches!(
        rig.manager.delete_agent("alpha", "doomed-agent").await,
        Err(ManagerError::AgentNotFound(_))
    ));
    let seq_after_delete = rig.manager.bus().last_seq();
    rig.poller.tick().await;
    assert_eq!(rig.manager.bus().last_seq(), seq_after_delete);
}
