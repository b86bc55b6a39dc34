// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook dispatcher.
//!
//! Subscribes to the bus and delivers terminal events to each agent's
//! callback with bounded retry. The bus callback only enqueues; all I/O
//! (payload assembly, the POST, backoff sleeps) happens on a per-agent
//! worker task so one slow receiver cannot stall other agents.

use crate::bus::{EventBus, SubscriptionGuard};
use crate::store::Store;
use ah_core::config::WebhookConfig;
use ah_core::{Agent, AgentStatus, Callback, EventFilter, EventPayload, NormalizedEvent};
use ah_adapters::internals;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Per-agent queue bound; overflow drops the oldest pending delivery.
const QUEUE_CAP: usize = 256;
const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY: Duration = Duration::from_millis(500);
const DELAY_CAP: Duration = Duration::from_secs(10);
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: String,
    pub project: String,
    pub agent_id: String,
    pub provider: String,
    pub status: AgentStatus,
    pub last_message: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, String>>,
}

/// Last delivery outcome for one agent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub agent_id: String,
    pub event: String,
    pub url: String,
    pub attempts: u32,
    pub last_status: Option<u16>,
    pub delivered: bool,
}

struct AgentQueue {
    jobs: Mutex<VecDeque<NormalizedEvent>>,
    notify: Notify,
    /// Deliveries dropped because the queue was full
    dropped: Mutex<u64>,
}

struct DispatcherInner {
    store: Store,
    bus: EventBus,
    config: WebhookConfig,
    client: reqwest::Client,
    base_delay: Duration,
    cancel: CancellationToken,
    queues: Mutex<HashMap<String, Arc<AgentQueue>>>,
    /// Agents seen on the bus; survives store removal so agent_exited
    /// after deletion still resolves a callback
    agents_seen: Mutex<HashMap<String, Agent>>,
    records: Mutex<HashMap<String, DeliveryRecord>>,
}

/// Bus-fed webhook dispatcher. Dropping it unsubscribes from the bus;
/// workers stop on cancellation.
pub struct WebhookDispatcher {
    inner: Arc<DispatcherInner>,
    _subscription: SubscriptionGuard,
}

impl WebhookDispatcher {
    pub fn start(
        bus: EventBus,
        store: Store,
        config: WebhookConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::start_with_base_delay(bus, store, config, cancel, BASE_DELAY)
    }

    /// Tests shorten the backoff schedule.
    pub fn start_with_base_delay(
        bus: EventBus,
        store: Store,
        config: WebhookConfig,
        cancel: CancellationToken,
        base_delay: Duration,
    ) -> Self {
        let inner = Arc::new(DispatcherInner {
            store,
            bus: bus.clone(),
            config,
            client: reqwest::Client::new(),
            base_delay,
            cancel,
            queues: Mutex::new(HashMap::new()),
            agents_seen: Mutex::new(HashMap::new()),
            records: Mutex::new(HashMap::new()),
        });

        let filter = EventFilter {
            types: Some(vec![
                "agent_exited".to_string(),
                "error".to_string(),
                "status_changed".to_string(),
            ]),
            ..EventFilter::default()
        };
        let hook = Arc::clone(&inner);
        let subscription = bus.subscribe(filter, move |event| hook.on_event(event));

        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Last delivery outcome per agent, for the diagnostics endpoint.
    pub fn records(&self) -> Vec<DeliveryRecord> {
        let mut records: Vec<DeliveryRecord> =
            self.inner.records.lock().values().cloned().collect();
        records.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        records
    }

    pub fn configured_url(&self) -> Option<String> {
        self.inner.config.url.clone()
    }

    /// Deliver a synthetic payload to the configured receiver.
    pub async fn send_test(&self) -> Result<u16, String> {
        let url = self
            .inner
            .config
            .url
            .clone()
            .ok_or_else(|| "no webhook url configured".to_string())?;
        let payload = WebhookPayload {
            event: "test".to_string(),
            project: "-".to_string(),
            agent_id: "-".to_string(),
            provider: "-".to_string(),
            status: AgentStatus::Idle,
            last_message: None,
            timestamp: chrono::Utc::now(),
            discord_channel: None,
            session_key: None,
            extra: None,
        };
        let response = self
            .inner
            .request(&url, self.inner.config.token.as_deref(), &payload)
            .await
            .map_err(|e| e.to_string())?;
        Ok(response.status().as_u16())
    }

    /// Reachability probe against the configured receiver.
    pub async fn probe_receiver(&self) -> Result<u16, String> {
        let url = self
            .inner
            .config
            .url
            .clone()
            .ok_or_else(|| "no webhook url configured".to_string())?;
        let response = self
            .inner
            .client
            .get(&url)
            .timeout(ATTEMPT_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(response.status().as_u16())
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("queues", &self.inner.queues.lock().len())
            .finish()
    }
}

impl DispatcherInner {
    /// Bus callback. Must not block: refresh the agent cache, check
    /// relevance, enqueue, wake the worker.
    fn on_event(self: &Arc<Self>, event: &NormalizedEvent) {
        let Some(agent_id) = event.agent_id.clone() else {
            return;
        };

        if let Some(agent) = self.store.agent(&agent_id) {
            self.agents_seen.lock().insert(agent_id.clone(), agent);
        }

        if !relevant(&event.payload) {
            return;
        }
        let Some(agent) = self.agents_seen.lock().get(&agent_id).cloned() else {
            return;
        };
        if agent.callback.is_none() {
            return;
        }

        let queue = {
            let mut queues = self.queues.lock();
            match queues.get(&agent_id) {
                Some(queue) => Arc::clone(queue),
                None => {
                    let queue = Arc::new(AgentQueue {
                        jobs: Mutex::new(VecDeque::new()),
                        notify: Notify::new(),
                        dropped: Mutex::new(0),
                    });
                    queues.insert(agent_id.clone(), Arc::clone(&queue));
                    let worker = Arc::clone(self);
                    let worker_queue = Arc::clone(&queue);
                    tokio::spawn(async move {
                        worker.run_worker(agent_id, worker_queue).await;
                    });
                    queue
                }
            }
        };

        let mut jobs = queue.jobs.lock();
        if jobs.len() >= QUEUE_CAP {
            jobs.pop_front();
            *queue.dropped.lock() += 1;
        }
        jobs.push_back(event.clone());
        drop(jobs);
        queue.notify.notify_one();
    }

    /// One worker per agent: serialized deliveries, at most one in flight.
    async fn run_worker(self: Arc<Self>, agent_id: String, queue: Arc<AgentQueue>) {
        loop {
            let job = queue.jobs.lock().pop_front();
            match job {
                Some(event) => self.deliver(&agent_id, event).await,
                None => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = queue.notify.notified() => {}
                    }
                }
            }
            if self.cancel.is_cancelled() {
                return;
            }
        }
    }

    async fn deliver(&self, agent_id: &str, event: NormalizedEvent) {
        let Some(agent) = self.agents_seen.lock().get(agent_id).cloned() else {
            return;
        };
        let Some(callback) = agent.callback.clone() else {
            return;
        };

        let payload = self.build_payload(&agent, &callback, &event);
        let token = callback.token.as_deref().or(self.config.token.as_deref());

        let mut record = DeliveryRecord {
            agent_id: agent_id.to_string(),
            event: payload.event.clone(),
            url: callback.url.clone(),
            attempts: 0,
            last_status: None,
            delivered: false,
        };

        for attempt in 1..=MAX_ATTEMPTS {
            record.attempts = attempt;
            match self.request(&callback.url, token, &payload).await {
                Ok(response) => {
                    let status = response.status();
                    record.last_status = Some(status.as_u16());
                    if status.is_success() {
                        record.delivered = true;
                        tracing::debug!(agent = agent_id, attempt, "webhook delivered");
                        break;
                    }
                    if !retryable(status.as_u16()) {
                        tracing::warn!(
                            agent = agent_id,
                            status = status.as_u16(),
                            "webhook rejected, not retrying"
                        );
                        break;
                    }
                    tracing::debug!(agent = agent_id, attempt, status = status.as_u16(), "webhook attempt failed");
                }
                Err(e) => {
                    tracing::debug!(agent = agent_id, attempt, error = %e, "webhook transport failure");
                }
            }
            if attempt == MAX_ATTEMPTS {
                tracing::warn!(agent = agent_id, "webhook delivery failed after {} attempts", MAX_ATTEMPTS);
                break;
            }
            let delay = backoff_delay(self.base_delay, attempt);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.records.lock().insert(agent_id.to_string(), record);
    }

    async fn request(
        &self,
        url: &str,
        token: Option<&str>,
        payload: &WebhookPayload,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.post(url).timeout(ATTEMPT_TIMEOUT).json(payload);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    fn build_payload(
        &self,
        agent: &Agent,
        callback: &Callback,
        event: &NormalizedEvent,
    ) -> WebhookPayload {
        // Current status when the agent still exists, else the snapshot
        let status = self
            .store
            .agent(agent.id.as_str())
            .map(|a| a.status)
            .unwrap_or(agent.status);

        let last_message = self.last_message(agent);

        let extra = if self.config.defaults.is_empty() {
            None
        } else {
            Some(self.config.defaults.clone())
        };

        WebhookPayload {
            event: event.payload.kind().to_string(),
            project: agent.project.as_str().to_string(),
            agent_id: agent.id.as_str().to_string(),
            provider: agent.provider.clone(),
            status,
            last_message,
            timestamp: event.ts,
            discord_channel: callback.discord_channel.clone(),
            session_key: callback.session_key.clone(),
            extra,
        }
    }

    /// Most recent assistant text: provider internals first, then the
    /// bus's last `output` event.
    fn last_message(&self, agent: &Agent) -> Option<String> {
        if let Some(path) = agent.provider_session_file.as_deref() {
            if let Some(text) = internals::last_assistant_text(path) {
                return Some(text);
            }
        }
        if let Some(dir) = agent.provider_runtime_dir.as_deref() {
            if let Some(path) = internals::latest_jsonl(dir) {
                if let Some(text) = internals::last_assistant_text(&path) {
                    return Some(text);
                }
            }
        }
        let filter = EventFilter {
            agent_id: Some(agent.id.as_str().to_string()),
            types: Some(vec!["output".to_string()]),
            ..EventFilter::default()
        };
        self.bus
            .history(&filter, None, Some(1))
            .pop()
            .and_then(|e| match e.payload {
                EventPayload::Output { text } => Some(text),
                _ => None,
            })
    }
}

/// Terminal events worth delivering.
fn relevant(payload: &EventPayload) -> bool {
    match payload {
        EventPayload::AgentExited { .. } | EventPayload::Error { .. } => true,
        EventPayload::StatusChanged { to, .. } => matches!(
            to,
            AgentStatus::Idle | AgentStatus::Error | AgentStatus::Exited
        ),
        _ => false,
    }
}

fn retryable(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << (attempt - 1).min(8);
    (base * factor).min(DELAY_CAP)
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
