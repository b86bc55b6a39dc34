//! Spec: initial task injection and interactive input.

use crate::prelude::*;
use ah_core::{AgentStatus, EventFilter};

#[tokio::test]
async fn initial_task_reaches_the_pane() {
    let rig = Rig::with_project("alpha").await;
    let target = rig
        .spawn_agent("alpha", "codex", "tasked-agent", "Reply with: 4")
        .await;

    // The fake pane runs the provider binary, so readiness passes on
    // the first poll of the injection task
    let mux = rig.mux.clone();
    wait_until("task injection", move || {
        mux.window(&target)
            .is_some_and(|w| w.inputs.contains(&"Reply with: 4\n".to_string()))
    })
    .await;
}

#[tokio::test]
async fn interactive_input_emits_and_processing_follows() {
    let rig = Rig::with_project("alpha").await;
    let target = rig.spawn_agent("alpha", "pi", "chat-agent", "").await;

    // Agent settles idle first
    rig.mux.set_capture(&target, "pi › ");
    rig.poller.tick().await;
    assert_eq!(
        rig.manager.store().agent("chat-agent").unwrap().status,
        AgentStatus::Idle
    );

    rig.manager.send_input("alpha", "chat-agent", "hi").await.unwrap();

    let input_events = rig.manager.bus().history(
        &EventFilter {
            types: Some(vec!["input_sent".to_string()]),
            ..EventFilter::default()
        },
        None,
        None,
    );
    assert_eq!(input_events.len(), 1);

    // Within one poll cycle the spinner moves the agent to processing
    rig.mux.set_capture(&target, "> hi\n⠹ thinking");
    rig.poller.tick().await;
    assert_eq!(
        rig.manager.store().agent("chat-agent").unwrap().status,
        AgentStatus::Processing
    );
}

#[tokio::test]
async fn abort_sends_interrupt_keys() {
    let rig = Rig::with_project("alpha").await;
    rig.spawn_agent("alpha", "claude-code", "abort-agent", "").await;

    rig.manager.abort_agent("alpha", "abort-agent").await.unwrap();

    let escapes = rig
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, ah_adapters::MuxCall::SendKeys { keys, .. } if keys.contains(&"Escape".to_string())))
        .count();
    assert_eq!(escapes, 2);
}
