// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling loop: capture → diff → parse → fuse → emit.
//!
//! One tick visits every non-exited agent in parallel. A tick that is
//! still running when the next interval fires makes the new tick a
//! no-op (single-flight); a per-agent mutex keeps a tick from
//! interleaving with user-initiated input on the same agent.

use crate::diff::capture_diff;
use crate::fusion::{self, FusionInput};
use crate::manager::Manager;
use ah_adapters::internals;
use ah_adapters::{MuxAdapter, ProviderStrategy};
use ah_core::{Agent, AgentStatus, Clock, EventPayload, ProviderEvent, StatusSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodic agent poller.
pub struct Poller<M: MuxAdapter, C: Clock> {
    manager: Manager<M, C>,
    interval: Duration,
    polling: Arc<AtomicBool>,
}

impl<M: MuxAdapter, C: Clock> Poller<M, C> {
    pub fn new(manager: Manager<M, C>) -> Self {
        let interval = Duration::from_millis(manager.config().poll_interval_ms);
        Self {
            manager,
            interval,
            polling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run until cancelled. In-flight agent polls complete before exit.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("poller stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One poll cycle. Public so tests (and diagnostics) can tick manually.
    pub async fn tick(&self) {
        if self.polling.swap(true, Ordering::AcqRel) {
            tracing::debug!("previous poll cycle still running, skipping tick");
            return;
        }

        // Degraded mode: the mux vanished at runtime. Re-probe once per
        // tick and skip the cycle until it comes back.
        if !self.manager.mux_available() && !self.manager.probe_mux().await {
            tracing::debug!("mux unavailable, skipping poll cycle");
            self.polling.store(false, Ordering::Release);
            return;
        }

        let ids = self.manager.store().live_agent_ids();
        let polls = ids.iter().map(|id| self.poll_agent(id.as_str()));
        futures_util::future::join_all(polls).await;

        self.polling.store(false, Ordering::Release);
    }

    async fn poll_agent(&self, id: &str) {
        let lock = self.manager.agent_lock(id);
        let _guard = lock.lock().await;

        let Some(agent) = self.manager.store().agent(id) else {
            return;
        };
        if agent.status == AgentStatus::Exited {
            return;
        }
        let Some(strategy) = self.manager.registry().get(&agent.provider) else {
            tracing::warn!(agent = id, provider = %agent.provider, "no strategy for agent provider");
            return;
        };

        if self.check_pane_dead(&agent).await {
            return;
        }

        let captured = self
            .manager
            .mux()
            .capture_pane(&agent.mux_target, self.manager.config().capture_lines)
            .await;
        self.manager.note_mux(&captured);
        let capture = match captured {
            Ok(capture) => capture,
            Err(e) => {
                tracing::debug!(agent = id, error = %e, "capture failed");
                return;
            }
        };

        let diff = capture_diff(&agent.last_captured_output, &capture);
        let diff_nonempty = !diff.is_empty();
        self.manager
            .update_agent_output(id, capture.clone(), diff_nonempty);

        let events = if diff_nonempty {
            strategy.parse_output_diff(&diff)
        } else {
            Vec::new()
        };

        let pane_command = self
            .manager
            .mux()
            .get_pane_var(&agent.mux_target, "pane_current_command")
            .await
            .unwrap_or_default();

        let outcome = self.fused_status(&agent, strategy.as_ref(), &capture, &events, diff_nonempty, &pane_command);
        if let Some(outcome) = outcome {
            self.manager
                .update_agent_status(id, outcome.status, outcome.source);
        }

        for event in events {
            self.emit_provider_event(&agent, event);
        }
    }

    /// `pane_dead` or a vanished window both terminate the agent.
    async fn check_pane_dead(&self, agent: &Agent) -> bool {
        let probed = self
            .manager
            .mux()
            .get_pane_var(&agent.mux_target, "pane_dead")
            .await;
        self.manager.note_mux(&probed);
        let dead = match probed {
            Ok(value) => value == "1",
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                tracing::debug!(agent = %agent.id, error = %e, "pane_dead probe failed");
                return false;
            }
        };
        if !dead {
            return false;
        }
        self.manager.update_agent_status(
            agent.id.as_str(),
            AgentStatus::Exited,
            StatusSource::PaneDead,
        );
        self.manager
            .emit_for(agent, EventPayload::AgentExited { exit_code: None });
        true
    }

    fn fused_status(
        &self,
        agent: &Agent,
        strategy: &dyn ProviderStrategy,
        capture: &str,
        events: &[ProviderEvent],
        diff_nonempty: bool,
        pane_command: &str,
    ) -> Option<fusion::FusionOutcome> {
        let session_file_exists = agent
            .provider_session_file
            .as_deref()
            .is_some_and(|p| p.exists());
        let runtime_dir_set = agent.provider_runtime_dir.is_some();
        let internals_backed = strategy.internals_backed(session_file_exists, runtime_dir_set);

        let internals_status = if internals_backed {
            agent
                .provider_session_file
                .as_deref()
                .filter(|p| p.exists())
                .and_then(internals::parse_status)
                .or_else(|| {
                    agent
                        .provider_runtime_dir
                        .as_deref()
                        .and_then(internals::status_from_runtime_dir)
                })
        } else {
            None
        };
        // Internals only own the status once they produce one; before
        // the provider writes its first session file the UI parser
        // still drives.
        let ui_allowed = internals_status.is_none();

        // Freshly stored last_diff_at: 0ms when this tick diffed
        let ms_since_last_diff = self
            .manager
            .store()
            .agent(agent.id.as_str())
            .and_then(|a| a.last_diff_at)
            .map(|at| (self.manager.now() - at).num_milliseconds());

        let input = FusionInput {
            current: agent.status,
            pane_dead: false,
            internals_status,
            ui_status: strategy.parse_status(capture),
            ui_allowed,
            events,
            diff_nonempty,
            pane_command,
            ms_since_last_diff,
            has_output: !capture.trim().is_empty(),
        };
        fusion::fuse(&input)
    }

    /// Lift a provider event into its normalized form.
    ///
    /// `Completion` carries no payload of its own — it only feeds status
    /// fusion — so it produces no bus event.
    fn emit_provider_event(&self, agent: &Agent, event: ProviderEvent) {
        let payload = match event {
            ProviderEvent::Text { text } => EventPayload::Output { text },
            ProviderEvent::ToolStart { tool, input } => EventPayload::ToolUse { tool, input },
            ProviderEvent::ToolEnd { tool, output } => EventPayload::ToolResult { tool, output },
            ProviderEvent::Error { message } => EventPayload::Error { message },
            ProviderEvent::PermissionRequested { description } => {
                EventPayload::PermissionRequested { description }
            }
            ProviderEvent::QuestionAsked { question, options } => EventPayload::QuestionAsked {
                question,
                options: options
                    .into_iter()
                    .map(|label| ah_core::QuestionOption { label })
                    .collect(),
            },
            ProviderEvent::Unknown { raw } => EventPayload::Unknown { raw },
            ProviderEvent::Completion => return,
        };
        self.manager.emit_for(agent, payload);
    }
}

impl<M: MuxAdapter, C: Clock> std::fmt::Debug for Poller<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
