// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and project lifecycle.
//!
//! Every mutation funnels through the manager so the store, the mux, and
//! the bus stay consistent: mux side-effects happen first, the store is
//! updated next, and events are emitted last. Reads go straight to the
//! store.

use crate::bus::EventBus;
use crate::error::ManagerError;
use crate::ident;
use crate::store::Store;
use ah_adapters::{MuxAdapter, MuxError, ProviderRegistry, ProviderStrategy, WindowCommand};
use ah_core::config::ProviderConfig;
use ah_core::subscription::SubscriptionSummary;
use ah_core::{
    Agent, AgentId, AgentSpec, AgentStatus, AhConfig, Callback, Clock, EventPayload,
    NormalizedEvent, Project, ProjectName, StatusSource, Subscription,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Grace period between the provider exit command and `kill-window`.
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// How long agent creation waits for the provider to come up before
/// injecting the initial task anyway.
const READINESS_TIMEOUT: Duration = Duration::from_secs(30);
const READINESS_POLL: Duration = Duration::from_millis(250);

/// Construction-time dependencies.
pub struct ManagerDeps<M: MuxAdapter, C: Clock> {
    pub mux: M,
    pub clock: C,
    pub registry: ProviderRegistry,
    pub config: AhConfig,
    /// Root for per-agent pipe logs and provider runtime dirs
    pub state_dir: PathBuf,
    pub subscriptions: Vec<Subscription>,
}

struct ManagerInner<M: MuxAdapter, C: Clock> {
    mux: M,
    clock: C,
    registry: ProviderRegistry,
    config: AhConfig,
    state_dir: PathBuf,
    store: Store,
    bus: EventBus,
    subscriptions: HashMap<String, Subscription>,
    /// Serializes all project/agent mutations (single-writer discipline)
    write_lock: tokio::sync::Mutex<()>,
    /// Per-agent locks so poll cycles and user input do not interleave
    agent_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    mux_available: AtomicBool,
}

/// The lifecycle coordinator. Cheap to clone; clones share state.
pub struct Manager<M: MuxAdapter, C: Clock> {
    inner: Arc<ManagerInner<M, C>>,
}

impl<M: MuxAdapter, C: Clock> Clone for Manager<M, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Diagnostic bundle for one agent.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDebug {
    pub agent: Agent,
    pub pane_vars: BTreeMap<String, String>,
    /// Windows of the owning mux session, as the mux reports them
    pub windows: Vec<ah_adapters::WindowInfo>,
    pub recent_events: Vec<NormalizedEvent>,
}

impl<M: MuxAdapter, C: Clock> Manager<M, C> {
    pub fn new(deps: ManagerDeps<M, C>) -> Self {
        let bus = EventBus::with_clock(deps.config.max_event_history, deps.clock.clone());
        let subscriptions = deps
            .subscriptions
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Self {
            inner: Arc::new(ManagerInner {
                mux: deps.mux,
                clock: deps.clock,
                registry: deps.registry,
                config: deps.config,
                state_dir: deps.state_dir,
                store: Store::new(),
                bus,
                subscriptions,
                write_lock: tokio::sync::Mutex::new(()),
                agent_locks: Mutex::new(HashMap::new()),
                mux_available: AtomicBool::new(true),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &AhConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    pub fn mux(&self) -> &M {
        &self.inner.mux
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }

    /// Last observed mux availability, maintained by every mux call
    /// that goes through the manager. The health endpoint reports this
    /// flag; the poller skips cycles while it is false, re-checking via
    /// [`Manager::probe_mux`].
    pub fn mux_available(&self) -> bool {
        self.inner.mux_available.load(Ordering::Relaxed)
    }

    /// Actively probe the mux and refresh the availability flag.
    pub async fn probe_mux(&self) -> bool {
        let probed = self
            .inner
            .mux
            .list_sessions(&self.inner.config.mux_prefix)
            .await;
        self.note_mux(&probed);
        probed.is_ok()
    }

    /// Record the outcome of a mux call for the availability flag. The
    /// poller feeds its own capture and pane-var probes through here.
    pub(crate) fn note_mux<T>(&self, result: &Result<T, MuxError>) {
        match result {
            Err(MuxError::MuxNotInstalled) => {
                self.inner.mux_available.store(false, Ordering::Relaxed);
            }
            Ok(_) => {
                self.inner.mux_available.store(true, Ordering::Relaxed);
            }
            Err(_) => {}
        }
    }

    pub fn subscription_summaries(&self) -> Vec<SubscriptionSummary> {
        let mut summaries: Vec<SubscriptionSummary> = self
            .inner
            .subscriptions
            .values()
            .map(Subscription::summary)
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// The per-agent mutex, created on first use.
    pub fn agent_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.agent_locks.lock();
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    // -- projects --

    pub async fn create_project(
        &self,
        name: &str,
        cwd: PathBuf,
        callback: Option<Callback>,
    ) -> Result<Project, ManagerError> {
        let name = ProjectName::parse(name)?;
        let _write = self.inner.write_lock.lock().await;

        if self.inner.store.project(name.as_str()).is_some() {
            return Err(ManagerError::ProjectExists(name.into_string()));
        }

        let project = Project::new(
            name,
            cwd,
            callback,
            &self.inner.config.mux_prefix,
            self.inner.clock.now(),
        );

        // Idempotent session ensure: an existing session is reused
        let has = self.inner.mux.has_session(&project.mux_session).await;
        self.note_mux(&has);
        if !has? {
            let created = self
                .inner
                .mux
                .create_session(&project.mux_session, &project.cwd)
                .await;
            self.note_mux(&created);
            created?;
            // Stamp the session so shells inside it can tell whose it is
            if let Err(e) = self
                .inner
                .mux
                .set_env(&project.mux_session, "AH_PROJECT", project.name.as_str())
                .await
            {
                tracing::debug!(project = %project.name, error = %e, "set-environment failed");
            }
        }

        self.inner.store.insert_project(project.clone());
        tracing::info!(project = %project.name, session = %project.mux_session, "project created");
        Ok(project)
    }

    pub async fn update_project(
        &self,
        name: &str,
        callback: Option<Callback>,
    ) -> Result<Project, ManagerError> {
        let _write = self.inner.write_lock.lock().await;
        if !self.inner.store.update_project(name, |p| {
            p.callback = callback.clone();
        }) {
            return Err(ManagerError::ProjectNotFound(name.to_string()));
        }
        self.inner
            .store
            .project(name)
            .ok_or_else(|| ManagerError::ProjectNotFound(name.to_string()))
    }

    /// Delete a project: all its agents first, then the mux session.
    pub async fn delete_project(&self, name: &str) -> Result<(), ManagerError> {
        let project = self
            .inner
            .store
            .project(name)
            .ok_or_else(|| ManagerError::ProjectNotFound(name.to_string()))?;

        for agent in self.inner.store.agents_in_project(name) {
            if let Err(e) = self.delete_agent(name, agent.id.as_str()).await {
                tracing::warn!(project = name, agent = %agent.id, error = %e, "agent cleanup failed during project delete");
            }
        }

        let _write = self.inner.write_lock.lock().await;
        let killed = self.inner.mux.kill_session(&project.mux_session).await;
        self.note_mux(&killed);
        if let Err(e) = killed {
            if !e.is_not_found() {
                tracing::warn!(project = name, error = %e, "kill-session failed during project delete");
            }
        }
        self.inner.store.remove_project(name);
        tracing::info!(project = name, "project deleted");
        Ok(())
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.inner.store.list_projects()
    }

    // -- agents --

    pub async fn create_agent(
        &self,
        project_name: &str,
        spec: AgentSpec,
    ) -> Result<Agent, ManagerError> {
        let strategy = self
            .inner
            .registry
            .get(&spec.provider)
            .ok_or_else(|| ManagerError::ProviderUnknown(spec.provider.clone()))?;
        let provider_config = self.provider_config(&spec.provider)?;

        let _write = self.inner.write_lock.lock().await;

        let project = self
            .inner
            .store
            .project(project_name)
            .ok_or_else(|| ManagerError::ProjectNotFound(project_name.to_string()))?;

        // The session may have been killed out-of-band; recreate it
        let has = self.inner.mux.has_session(&project.mux_session).await;
        self.note_mux(&has);
        if !has? {
            let created = self
                .inner
                .mux
                .create_session(&project.mux_session, &project.cwd)
                .await;
            self.note_mux(&created);
            created?;
        }

        let id = self.allocate_agent_id(&spec)?;

        let subscription = spec
            .subscription
            .as_deref()
            .and_then(|sid| match self.inner.subscriptions.get(sid) {
                Some(s) => Some(s.clone()),
                None => {
                    tracing::warn!(subscription = sid, "unknown subscription on agent spec, ignoring");
                    None
                }
            });

        let argv = strategy.build_command(&provider_config, spec.model.as_deref());
        let mut env = strategy.build_env(&provider_config);
        if let Some(ref sub) = subscription {
            env.extend(sub.env.clone());
        }

        let (runtime_dir, session_file) = if strategy.supports_internals() {
            let dir = self
                .inner
                .state_dir
                .join("providers")
                .join(project_name)
                .join(id.as_str());
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!(agent = %id, error = %e, "provider runtime dir creation failed");
            }
            for (key, value) in strategy.internals_env(&dir) {
                env.insert(key, value);
            }
            let file = dir.join("session.jsonl");
            (Some(dir), Some(file))
        } else {
            (None, None)
        };

        let command = WindowCommand::new(argv).with_env(env);
        let window_name = id.as_str().to_string();
        let created = self
            .inner
            .mux
            .create_window(&project.mux_session, &window_name, &project.cwd, &command)
            .await;
        self.note_mux(&created);
        let pane_id = match created {
            Ok(pane) => pane,
            Err(e) => {
                // Roll back the only side effect taken so far
                if let Some(ref dir) = runtime_dir {
                    let _ = std::fs::remove_dir_all(dir);
                }
                return Err(e.into());
            }
        };

        let now = self.inner.clock.now();
        let mux_target = format!("{}:{}.0", project.mux_session, window_name);
        let agent = Agent {
            id: id.clone(),
            project: project.name.clone(),
            provider: spec.provider.clone(),
            task: spec.task.clone(),
            model: spec.model.clone(),
            subscription: subscription.map(|s| s.id),
            status: AgentStatus::Starting,
            created_at: now,
            last_activity: now,
            last_captured_output: String::new(),
            last_diff_at: None,
            window_name,
            mux_target: mux_target.clone(),
            attach_command: format!("tmux attach -t {}", project.mux_session),
            callback: spec.callback.clone().or(project.callback.clone()),
            provider_runtime_dir: runtime_dir,
            provider_session_file: session_file,
        };
        self.inner.store.insert_agent(agent.clone());
        tracing::info!(agent = %id, project = project_name, pane = %pane_id, "agent created");

        let piped = self
            .inner
            .mux
            .start_pipe_pane(&mux_target, &self.agent_log_path(project_name, id.as_str()))
            .await;
        if let Err(e) = piped {
            tracing::warn!(agent = %id, error = %e, "pipe-pane failed, continuing without log");
        }

        self.schedule_task_injection(agent.clone(), Arc::clone(&strategy));

        self.emit_for(&agent, EventPayload::AgentStarted);
        // Synthetic heartbeat transition so subscribers see the agent
        // immediately with its creation status
        self.emit_for(
            &agent,
            EventPayload::StatusChanged {
                from: AgentStatus::Starting,
                to: AgentStatus::Starting,
                source: Some(StatusSource::Create),
            },
        );

        Ok(agent)
    }

    fn provider_config(&self, tag: &str) -> Result<ProviderConfig, ManagerError> {
        match self.inner.config.providers.get(tag) {
            Some(config) if !config.enabled => Err(ManagerError::ProviderUnknown(tag.to_string())),
            Some(config) => Ok(config.clone()),
            None => Ok(ProviderConfig::default()),
        }
    }

    fn allocate_agent_id(&self, spec: &AgentSpec) -> Result<AgentId, ManagerError> {
        match spec.id {
            Some(ref requested) => {
                let id = AgentId::parse(requested.clone())?;
                if self.inner.store.agent(id.as_str()).is_some() {
                    return Err(ManagerError::AgentIdTaken(id.into_string()));
                }
                Ok(id)
            }
            None => {
                let store = &self.inner.store;
                let mut rng = rand::rng();
                let generated = ident::generate_agent_id(&spec.provider, &mut rng, |candidate| {
                    store.agent(candidate).is_some()
                });
                Ok(AgentId::generated(generated))
            }
        }
    }

    fn agent_log_path(&self, project: &str, id: &str) -> PathBuf {
        let dir = self.inner.state_dir.join("logs").join(project);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::debug!(project, error = %e, "log dir creation failed");
        }
        dir.join(format!("{}.log", id))
    }

    /// Wait for the provider to come up, then inject the initial task.
    ///
    /// Readiness is "the pane runs something that is not a shell" or the
    /// provider's idle prompt showing; after the timeout the task is
    /// injected regardless.
    fn schedule_task_injection(&self, agent: Agent, strategy: Arc<dyn ProviderStrategy>) {
        if agent.task.is_empty() {
            return;
        }
        let manager = self.clone();
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + READINESS_TIMEOUT;
            loop {
                tokio::time::sleep(READINESS_POLL).await;
                // Agent deleted while we waited
                if manager.inner.store.agent(agent.id.as_str()).is_none() {
                    return;
                }
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                if let Ok(command) = manager
                    .inner
                    .mux
                    .get_pane_var(&agent.mux_target, "pane_current_command")
                    .await
                {
                    if crate::fusion::pane_process_alive(&command) {
                        break;
                    }
                }
                if let Ok(captured) = manager.inner.mux.capture_pane(&agent.mux_target, 50).await {
                    let stripped = ah_adapters::provider::ansi::strip_ansi(&captured);
                    if strategy.is_idle_prompt(&stripped) {
                        break;
                    }
                }
            }

            let text = strategy.format_input(&agent.task);
            match manager.inner.mux.send_input(&agent.mux_target, &text).await {
                Ok(()) => {
                    manager.inner.store.update_agent(agent.id.as_str(), |a| {
                        a.last_activity = manager.inner.clock.now();
                    });
                    manager.emit_for(
                        &agent,
                        EventPayload::InputSent {
                            text: agent.task.clone(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(agent = %agent.id, error = %e, "initial task injection failed");
                }
            }
        });
    }

    /// Best-effort ordered teardown. Every step may fail independently;
    /// failures log and the teardown proceeds.
    pub async fn delete_agent(&self, project: &str, id: &str) -> Result<(), ManagerError> {
        let agent = self
            .inner
            .store
            .agent_in_project(project, id)
            .ok_or_else(|| ManagerError::AgentNotFound(id.to_string()))?;
        let agent_lock = self.agent_lock(id);
        let _agent_guard = agent_lock.lock().await;
        let _write = self.inner.write_lock.lock().await;

        if let Err(e) = self.inner.mux.stop_pipe_pane(&agent.mux_target).await {
            tracing::debug!(agent = id, error = %e, "stop pipe-pane failed");
        }

        let strategy = self.inner.registry.get(&agent.provider);
        if let Some(strategy) = strategy {
            let exit = strategy.format_input(strategy.exit_command());
            if let Err(e) = self.inner.mux.send_input(&agent.mux_target, &exit).await {
                tracing::debug!(agent = id, error = %e, "exit command failed");
            } else {
                tokio::time::sleep(EXIT_GRACE).await;
            }
        }

        if let Err(e) = self.inner.mux.kill_window(&agent.mux_target).await {
            if !e.is_not_found() {
                tracing::warn!(agent = id, error = %e, "kill-window failed");
            }
        }

        self.inner.store.remove_agent(id);
        self.inner.agent_locks.lock().remove(id);

        let from = agent.status;
        if from != AgentStatus::Exited {
            self.emit_for(
                &agent,
                EventPayload::StatusChanged {
                    from,
                    to: AgentStatus::Exited,
                    source: Some(StatusSource::Delete),
                },
            );
        }
        self.emit_for(&agent, EventPayload::AgentExited { exit_code: None });
        tracing::info!(agent = id, project, "agent deleted");
        Ok(())
    }

    pub async fn send_input(
        &self,
        project: &str,
        id: &str,
        text: &str,
    ) -> Result<(), ManagerError> {
        let agent = self
            .inner
            .store
            .agent_in_project(project, id)
            .ok_or_else(|| ManagerError::AgentNotFound(id.to_string()))?;
        let strategy = self
            .inner
            .registry
            .get(&agent.provider)
            .ok_or_else(|| ManagerError::ProviderUnknown(agent.provider.clone()))?;

        let agent_lock = self.agent_lock(id);
        let _agent_guard = agent_lock.lock().await;

        let formatted = strategy.format_input(text);
        let sent = self.inner.mux.send_input(&agent.mux_target, &formatted).await;
        self.note_mux(&sent);
        sent?;

        self.inner.store.update_agent(id, |a| {
            a.last_activity = self.inner.clock.now();
        });
        self.emit_for(
            &agent,
            EventPayload::InputSent {
                text: text.to_string(),
            },
        );
        Ok(())
    }

    /// Send the interrupt sequence (double Escape with a beat between).
    pub async fn abort_agent(&self, project: &str, id: &str) -> Result<(), ManagerError> {
        let agent = self
            .inner
            .store
            .agent_in_project(project, id)
            .ok_or_else(|| ManagerError::AgentNotFound(id.to_string()))?;

        self.inner.mux.send_keys(&agent.mux_target, &["Escape"]).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.mux.send_keys(&agent.mux_target, &["Escape"]).await?;
        tracing::info!(agent = id, project, "abort keys sent");
        Ok(())
    }

    /// Apply a status transition observed by the poller (or synthetic
    /// sources). Illegal transitions are dropped. Returns whether the
    /// store changed; the `status_changed` event is emitted only after
    /// the store holds the new status.
    pub fn update_agent_status(
        &self,
        id: &str,
        to: AgentStatus,
        source: StatusSource,
    ) -> bool {
        let Some(agent) = self.inner.store.agent(id) else {
            return false;
        };
        let from = agent.status;
        if from == to {
            return false;
        }
        if !from.can_transition(to) {
            tracing::debug!(agent = id, %from, %to, "dropping illegal status transition");
            return false;
        }
        self.inner.store.update_agent(id, |a| {
            a.status = to;
            a.last_activity = self.inner.clock.now();
        });
        self.emit_for(
            &agent,
            EventPayload::StatusChanged {
                from,
                to,
                source: Some(source),
            },
        );
        true
    }

    /// Store the latest capture and stamp `last_diff_at` when it moved.
    pub fn update_agent_output(&self, id: &str, raw: String, diff_detected: bool) {
        let now = self.inner.clock.now();
        self.inner.store.update_agent(id, |a| {
            a.last_captured_output = raw;
            if diff_detected {
                a.last_diff_at = Some(now);
                a.last_activity = now;
            }
        });
    }

    pub async fn get_agent_debug(
        &self,
        project: &str,
        id: &str,
    ) -> Result<AgentDebug, ManagerError> {
        let agent = self
            .inner
            .store
            .agent_in_project(project, id)
            .ok_or_else(|| ManagerError::AgentNotFound(id.to_string()))?;

        let mut pane_vars = BTreeMap::new();
        for var in ["pane_dead", "pane_current_command", "pane_pid", "pane_id"] {
            match self.inner.mux.get_pane_var(&agent.mux_target, var).await {
                Ok(value) => {
                    pane_vars.insert(var.to_string(), value);
                }
                Err(e) => {
                    pane_vars.insert(var.to_string(), format!("<{}>", e));
                }
            }
        }

        let session = agent
            .mux_target
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string();
        let windows = self
            .inner
            .mux
            .list_windows(&session)
            .await
            .unwrap_or_default();

        let filter = ah_core::EventFilter::for_agent(project, id);
        let recent_events = self.inner.bus.history(&filter, None, Some(50));

        Ok(AgentDebug {
            agent,
            pane_vars,
            windows,
            recent_events,
        })
    }

    /// Emit an agent-scoped event on the bus.
    pub fn emit_for(&self, agent: &Agent, payload: EventPayload) -> NormalizedEvent {
        self.inner.bus.emit(
            agent.project.as_str(),
            Some(agent.id.as_str().to_string()),
            payload,
        )
    }
}

impl<M: MuxAdapter, C: Clock> std::fmt::Debug for Manager<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (projects, agents) = self.inner.store.counts();
        f.debug_struct("Manager")
            .field("projects", &projects)
            .field("agents", &agents)
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
