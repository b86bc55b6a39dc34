//! Spec: webhook delivery against a real local receiver.

use crate::prelude::*;
use ah_core::config::WebhookConfig;
use ah_core::{Callback, EventFilter, EventPayload};
use ah_engine::WebhookDispatcher;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct Receiver {
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    script: Arc<Mutex<VecDeque<u16>>>,
}

async fn hook(
    State(receiver): State<Receiver>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> StatusCode {
    receiver.bodies.lock().push(body);
    let code = receiver.script.lock().pop_front().unwrap_or(200);
    StatusCode::from_u16(code).unwrap_or(StatusCode::OK)
}

async fn start_receiver(script: Vec<u16>) -> (Receiver, String) {
    let receiver = Receiver {
        script: Arc::new(Mutex::new(script.into())),
        ..Receiver::default()
    };
    let app = Router::new()
        .route("/hook", post(hook))
        .with_state(receiver.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (receiver, format!("http://{}/hook", addr))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn terminal_event_retries_until_receiver_recovers() {
    let (receiver, url) = start_receiver(vec![503, 503, 503, 200]).await;
    let rig = Rig::with_project("alpha").await;
    let _dispatcher = WebhookDispatcher::start_with_base_delay(
        rig.manager.bus().clone(),
        rig.manager.store().clone(),
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(5),
    );

    // Agent carries a callback
    let agent = rig
        .manager
        .create_agent(
            "alpha",
            ah_core::AgentSpec {
                id: Some("hooked-agent".to_string()),
                provider: "codex".to_string(),
                callback: Some(Callback {
                    url,
                    token: None,
                    discord_channel: None,
                    session_key: None,
                }),
                ..ah_core::AgentSpec::default()
            },
        )
        .await
        .unwrap();

    // Pane death produces the terminal event
    rig.mux.kill_window_external(&agent.mux_target);
    rig.poller.tick().await;

    let bodies = receiver.bodies.clone();
    wait_until("four webhook attempts", move || bodies.lock().len() >= 4).await;

    let delivered = receiver.bodies.lock().clone();
    // status_changed{to: exited} queued first, then agent_exited; the
    // first delivery succeeded on its fourth attempt
    assert_eq!(delivered[0]["event"], "status_changed");
    assert_eq!(delivered[0]["agentId"], "hooked-agent");
    assert_eq!(delivered[0]["project"], "alpha");
    assert_eq!(delivered[0]["status"], "exited");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn project_callback_is_inherited_by_agents() {
    let (receiver, url) = start_receiver(vec![]).await;
    let rig = Rig::new().await;
    rig.manager
        .create_project(
            "beta",
            "/tmp/b".into(),
            Some(Callback {
                url,
                token: None,
                discord_channel: None,
                session_key: None,
            }),
        )
        .await
        .unwrap();
    let _dispatcher = WebhookDispatcher::start_with_base_delay(
        rig.manager.bus().clone(),
        rig.manager.store().clone(),
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(5),
    );

    let target = rig
        .spawn_agent("beta", "pi", "inheriting-agent", "")
        .await;
    rig.mux.set_pane_dead(&target);
    rig.poller.tick().await;

    let bodies = receiver.bodies.clone();
    wait_until("inherited callback delivery", move || {
        !bodies.lock().is_empty()
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn agents_without_callback_stay_silent() {
    let (receiver, url) = start_receiver(vec![]).await;
    let rig = Rig::with_project("alpha").await;
    let _dispatcher = WebhookDispatcher::start_with_base_delay(
        rig.manager.bus().clone(),
        rig.manager.store().clone(),
        WebhookConfig {
            url: Some(url),
            ..WebhookConfig::default()
        },
        CancellationToken::new(),
        Duration::from_millis(5),
    );

    let target = rig.spawn_agent("alpha", "pi", "quiet-agent", "").await;
    rig.mux.set_pane_dead(&target);
    rig.poller.tick().await;

    // Terminal events happened, but the agent has no callback
    let exited = rig.manager.bus().history(
        &EventFilter {
            types: Some(vec!["agent_exited".to_string()]),
            ..EventFilter::default()
        },
        None,
        None,
    );
    assert_eq!(exited.len(), 1);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(receiver.bodies.lock().is_empty());
}
