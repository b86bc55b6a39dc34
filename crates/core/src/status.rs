// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent status machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a supervised agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Pane allocated, agent process still booting
    Starting,
    /// Agent finished its turn and is waiting at the prompt
    Idle,
    /// Agent is actively producing output
    Processing,
    /// Agent is blocked on a permission or question prompt
    WaitingInput,
    /// Agent reported an error
    Error,
    /// Pane process is gone; terminal state
    Exited,
}

impl AgentStatus {
    /// Whether the state machine permits a transition from `self` to `to`.
    ///
    /// `Exited` is terminal. Self-transitions are rejected except the
    /// synthetic `starting -> starting` heartbeat emitted at creation,
    /// which is not routed through this check.
    pub fn can_transition(self, to: AgentStatus) -> bool {
        match (self, to) {
            (AgentStatus::Exited, _) => false,
            (_, AgentStatus::Starting) => false,
            (a, b) if a == b => false,
            _ => true,
        }
    }

    /// True for statuses the poller no longer visits.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Exited)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Idle => "idle",
            AgentStatus::Processing => "processing",
            AgentStatus::WaitingInput => "waiting_input",
            AgentStatus::Error => "error",
            AgentStatus::Exited => "exited",
        };
        write!(f, "{}", s)
    }
}

/// Where a status transition was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusSource {
    /// Provider-written session files on disk
    Internals,
    /// Terminal scrollback pattern matching
    UiParser,
    /// `pane_dead` reported by the mux
    PaneDead,
    /// Synthetic transition emitted at agent creation
    Create,
    /// Synthetic transition emitted at agent deletion
    Delete,
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusSource::Internals => "internals",
            StatusSource::UiParser => "ui-parser",
            StatusSource::PaneDead => "pane-dead",
            StatusSource::Create => "create",
            StatusSource::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
