//! Spec: external pane death is detected and terminal.

use crate::prelude::*;
use ah_core::{AgentStatus, EventFilter, EventPayload, StatusSource};
use ah_engine::ManagerError;

#[tokio::test]
async fn killed_window_exits_within_one_cycle() {
    let rig = Rig::with_project("alpha").await;
    let target = rig.spawn_agent("alpha", "codex", "victim-agent", "").await;

    // A user attached to the mux kills the window out-of-band
    rig.mux.kill_window_external(&target);
    rig.poller.tick().await;

    let agent = rig.manager.store().agent("victim-agent").unwrap();
    assert_eq!(agent.status, AgentStatus::Exited);

    let events = rig.manager.bus().history(
        &EventFilter::for_agent("alpha", "victim-agent"),
        None,
        None,
    );
    let status_event = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::StatusChanged { to, source, .. } if *to == AgentStatus::Exited => {
                Some(*source)
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(status_event, Some(StatusSource::PaneDead));
    assert!(events
        .iter()
        .any(|e| matches!(e.payload, EventPayload::AgentExited { exit_code: None })));
}

#[tokio::test]
async fn dead_pane_with_remain_on_exit_also_exits() {
    let rig = Rig::with_project("alpha").await;
    let target = rig.spawn_agent("alpha", "pi", "remains-agent", "").await;

    // remain-on-exit keeps the pane but marks it dead
    rig.mux.set_pane_dead(&target);
    rig.poller.tick().await;

    assert_eq!(
        rig.manager.store().agent("remains-agent").unwrap().status,
        AgentStatus::Exited
    );
}

#[tokio::test]
async fn operations_on_exited_agent_behave() {
    let rig = Rig::with_project("alpha").await;
    let target = rig.spawn_agent("alpha", "pi", "gone-agent", "").await;
    rig.mux.kill_window_external(&target);
    rig.poller.tick().await;

    // Input to a dead window surfaces the mux error
    assert!(matches!(
        rig.manager.send_input("alpha", "gone-agent", "hello").await,
        Err(ManagerError::Mux(_))
    ));

    // Deletion still works and is terminal
    rig.manager.delete_agent("alpha", "gone-agent").await.unwrap();
    assert!(rig.manager.store().agent("gone-agent").is_none());
}
