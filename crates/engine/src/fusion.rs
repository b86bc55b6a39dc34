// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status fusion.
//!
//! One poll cycle produces several status signals: pane liveness, the
//! provider-internals parser, the UI parser, the diff's provider events,
//! and the diff itself. `fuse` combines them with a fixed precedence
//! into at most one transition per tick.

use ah_core::{AgentStatus, ProviderEvent, StatusSource};

/// Pane processes that mean "the provider is gone, only the shell is left".
const SHELL_NAMES: &[&str] = &["bash", "zsh", "sh", "fish", "nu", "dash", "ksh"];

/// Milliseconds without a diff before a processing agent is considered idle.
pub const STALL_TO_IDLE_MS: i64 = 3000;

/// Signals gathered for one agent in one poll cycle.
#[derive(Debug, Clone)]
pub struct FusionInput<'a> {
    pub current: AgentStatus,
    pub pane_dead: bool,
    /// Status the provider-internals parser produced, when the provider
    /// is internals-backed right now
    pub internals_status: Option<AgentStatus>,
    /// Status the UI parser produced from the full capture
    pub ui_status: AgentStatus,
    /// False when internals own this agent's status
    pub ui_allowed: bool,
    pub events: &'a [ProviderEvent],
    pub diff_nonempty: bool,
    /// `pane_current_command`, empty when unavailable
    pub pane_command: &'a str,
    /// Milliseconds since the last observed diff, None before the first
    pub ms_since_last_diff: Option<i64>,
    /// Whether any output has ever been captured
    pub has_output: bool,
}

/// A fused transition proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionOutcome {
    pub status: AgentStatus,
    pub source: StatusSource,
}

fn outcome(status: AgentStatus, source: StatusSource) -> Option<FusionOutcome> {
    Some(FusionOutcome { status, source })
}

/// True when the pane is running something other than a bare shell.
pub fn pane_process_alive(pane_command: &str) -> bool {
    !pane_command.is_empty() && !SHELL_NAMES.contains(&pane_command)
}

/// Combine one cycle's signals. `None` keeps the current status.
pub fn fuse(input: &FusionInput<'_>) -> Option<FusionOutcome> {
    if input.pane_dead {
        return outcome(AgentStatus::Exited, StatusSource::PaneDead);
    }

    if let Some(status) = input.internals_status {
        return outcome(status, StatusSource::Internals);
    }

    if input.ui_allowed && input.ui_status != AgentStatus::Starting {
        return outcome(input.ui_status, StatusSource::UiParser);
    }

    if let Some(status) = status_from_events(input.events) {
        return outcome(status, StatusSource::UiParser);
    }

    if input.diff_nonempty {
        return outcome(AgentStatus::Processing, StatusSource::UiParser);
    }

    let alive = pane_process_alive(input.pane_command);

    if input.current == AgentStatus::Processing
        && alive
        && input.ms_since_last_diff.is_some_and(|ms| ms >= STALL_TO_IDLE_MS)
    {
        return outcome(AgentStatus::Idle, StatusSource::UiParser);
    }

    if input.current == AgentStatus::Starting && alive && input.has_output {
        return outcome(AgentStatus::Idle, StatusSource::UiParser);
    }

    None
}

/// Direct status mapping for classified provider events.
fn status_from_events(events: &[ProviderEvent]) -> Option<AgentStatus> {
    let mut has_permission = false;
    let mut has_question = false;
    let mut has_tool_start = false;
    let mut has_completion = false;
    for event in events {
        match event {
            ProviderEvent::Error { .. } => return Some(AgentStatus::Error),
            ProviderEvent::PermissionRequested { .. } => has_permission = true,
            ProviderEvent::QuestionAsked { .. } => has_question = true,
            ProviderEvent::ToolStart { .. } => has_tool_start = true,
            ProviderEvent::Completion => has_completion = true,
            _ => {}
        }
    }
    if has_permission || has_question {
        return Some(AgentStatus::WaitingInput);
    }
    if has_tool_start {
        return Some(AgentStatus::Processing);
    }
    if has_completion {
        return Some(AgentStatus::Idle);
    }
    None
}

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;
