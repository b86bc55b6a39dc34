// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ah_core::{AgentId, EventPayload, Project, ProjectName};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Default)]
struct Receiver {
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    /// Status codes to return, in order; repeats the last one when empty
    script: Arc<Mutex<VecDeque<u16>>>,
}

async fn hook(
    State(receiver): State<Receiver>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> StatusCode {
    receiver.bodies.lock().push(body);
    receiver.auth.lock().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );
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

fn seeded_store(callback_url: &str) -> Store {
    let store = Store::new();
    let name = ProjectName::parse("alpha").unwrap();
    store.insert_project(Project::new(
        name.clone(),
        PathBuf::from("/tmp"),
        None,
        "ah",
        Utc::now(),
    ));
    let now = Utc::now();
    store.insert_agent(Agent {
        id: AgentId::parse("hook-agent").unwrap(),
        project: name,
        provider: "codex".to_string(),
        task: String::new(),
        model: None,
        subscription: None,
        status: AgentStatus::Processing,
        created_at: now,
        last_activity: now,
        last_captured_output: String::new(),
        last_diff_at: None,
        window_name: "hook-agent".to_string(),
        mux_target: "ah-alpha:hook-agent.0".to_string(),
        attach_command: "tmux attach -t ah-alpha".to_string(),
        callback: Some(Callback {
            url: callback_url.to_string(),
            token: Some("hook-token".to_string()),
            discord_channel: Some("ops".to_string()),
            session_key: None,
        }),
        provider_runtime_dir: None,
        provider_session_file: None,
    });
    store
}

async fn wait_for<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retries_until_success_and_records() {
    let (receiver, url) = start_receiver(vec![503, 503, 503, 200]).await;
    let bus = EventBus::new(100);
    let store = seeded_store(&url);
    let dispatcher = WebhookDispatcher::start_with_base_delay(
        bus.clone(),
        store,
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(5),
    );

    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::StatusChanged {
            from: AgentStatus::Processing,
            to: AgentStatus::Idle,
            source: None,
        },
    );

    wait_for("four delivery attempts", || receiver.bodies.lock().len() == 4).await;

    let body = receiver.bodies.lock().last().cloned().unwrap();
    assert_eq!(body["event"], "status_changed");
    assert_eq!(body["project"], "alpha");
    assert_eq!(body["agentId"], "hook-agent");
    assert_eq!(body["provider"], "codex");
    assert_eq!(body["discordChannel"], "ops");
    assert_eq!(
        receiver.auth.lock()[0].as_deref(),
        Some("Bearer hook-token")
    );

    wait_for("delivery record", || {
        dispatcher
            .records()
            .first()
            .is_some_and(|r| r.delivered && r.attempts == 4)
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_retryable_status_stops_after_one_attempt() {
    let (receiver, url) = start_receiver(vec![404]).await;
    let bus = EventBus::new(100);
    let dispatcher = WebhookDispatcher::start_with_base_delay(
        bus.clone(),
        seeded_store(&url),
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(5),
    );

    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::Error {
            message: "boom".to_string(),
        },
    );

    wait_for("failed delivery record", || {
        dispatcher
            .records()
            .first()
            .is_some_and(|r| !r.delivered && r.attempts == 1 && r.last_status == Some(404))
    })
    .await;
    assert_eq!(receiver.bodies.lock().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_attempts_record_final_failure() {
    let (receiver, url) = start_receiver(vec![500, 500, 500, 500, 500, 500]).await;
    let bus = EventBus::new(100);
    let dispatcher = WebhookDispatcher::start_with_base_delay(
        bus.clone(),
        seeded_store(&url),
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(2),
    );

    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::AgentExited { exit_code: None },
    );

    wait_for("exhausted record", || {
        dispatcher
            .records()
            .first()
            .is_some_and(|r| !r.delivered && r.attempts == 5)
    })
    .await;
    assert_eq!(receiver.bodies.lock().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn irrelevant_events_and_missing_callbacks_are_skipped() {
    let (receiver, url) = start_receiver(vec![]).await;
    let bus = EventBus::new(100);
    let store = seeded_store(&url);
    // Second agent without a callback
    store.insert_agent(Agent {
        callback: None,
        id: AgentId::parse("mute-agent").unwrap(),
        ..store.agent("hook-agent").unwrap()
    });
    let _dispatcher = WebhookDispatcher::start_with_base_delay(
        bus.clone(),
        store,
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(2),
    );

    // status_changed to processing is not terminal
    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::StatusChanged {
            from: AgentStatus::Idle,
            to: AgentStatus::Processing,
            source: None,
        },
    );
    // terminal event, but the agent has no callback
    bus.emit(
        "alpha",
        Some("mute-agent".to_string()),
        EventPayload::AgentExited { exit_code: None },
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(receiver.bodies.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleted_agent_still_gets_exit_webhook() {
    let (receiver, url) = start_receiver(vec![200, 200]).await;
    let bus = EventBus::new(100);
    let store = seeded_store(&url);
    let _dispatcher = WebhookDispatcher::start_with_base_delay(
        bus.clone(),
        store.clone(),
        WebhookConfig::default(),
        CancellationToken::new(),
        Duration::from_millis(2),
    );

    // Any event caches the agent snapshot
    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::StatusChanged {
            from: AgentStatus::Processing,
            to: AgentStatus::Idle,
            source: None,
        },
    );
    // Deletion removes the agent from the store before agent_exited
    store.remove_agent("hook-agent");
    bus.emit(
        "alpha",
        Some("hook-agent".to_string()),
        EventPayload::AgentExited { exit_code: None },
    );

    wait_for("two deliveries", || receiver.bodies.lock().len() == 2).await;
    let last = receiver.bodies.lock().last().cloned().unwrap();
    assert_eq!(last["event"], "agent_exited");
}

#[yare::parameterized(
    timeout        = { 408, true },
    rate_limited   = { 429, true },
    server_error   = { 500, true },
    bad_gateway    = { 502, true },
    not_found      = { 404, false },
    forbidden      = { 403, false },
    redirect       = { 301, false },
)]
fn retryable_statuses(status: u16, expected: bool) {
    assert_eq!(retryable(status), expected);
}

#[test]
fn backoff_doubles_and_caps() {
    let base = Duration::from_millis(500);
    assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
    assert_eq!(backoff_delay(base, 2), Duration::from_millis(1000));
    assert_eq!(backoff_delay(base, 3), Duration::from_millis(2000));
    assert_eq!(backoff_delay(base, 4), Duration::from_millis(4000));
    assert_eq!(backoff_delay(base, 5), Duration::from_millis(8000));
    assert_eq!(backoff_delay(base, 6), Duration::from_secs(10));
}

#[test]
fn relevance_filter() {
    assert!(relevant(&EventPayload::AgentExited { exit_code: Some(0) }));
    assert!(relevant(&EventPayload::Error {
        message: "x".to_string()
    }));
    assert!(relevant(&EventPayload::StatusChanged {
        from: AgentStatus::Processing,
        to: AgentStatus::Idle,
        source: None,
    }));
    assert!(!relevant(&EventPayload::StatusChanged {
        from: AgentStatus::Idle,
        to: AgentStatus::Processing,
        source: None,
    }));
    assert!(!relevant(&EventPayload::Heartbeat));
    assert!(!relevant(&EventPayload::Output {
        text: "hi".to_string()
    }));
}
