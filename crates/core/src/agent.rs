// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent records.
//!
//! An agent is one provider CLI process hosted in one mux window. Its
//! lifetime is bounded by the pane's existence in the mux and by the
//! manager's knowledge of it; the record below is the manager's side.

use crate::id::{AgentId, ProjectName};
use crate::project::Callback;
use crate::status::AgentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-supplied parameters for creating an agent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// Human-readable id; generated from the word lists when absent
    #[serde(default)]
    pub id: Option<String>,
    pub provider: String,
    /// Initial prompt injected once the pane is ready
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Opaque credential handle id resolved outside the core
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub callback: Option<Callback>,
}

/// A supervised agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub project: ProjectName,
    pub provider: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Raw text of the most recent pane capture; diffed against the next
    #[serde(skip)]
    pub last_captured_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_diff_at: Option<DateTime<Utc>>,
    pub window_name: String,
    /// `<session>:<window>.0`, unique process-wide
    pub mux_target: String,
    pub attach_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Callback>,
    /// Runtime dir hint for providers with internals-backed status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_runtime_dir: Option<PathBuf>,
    /// Session-file hint (claude-style JSONL) for internals-backed status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_session_file: Option<PathBuf>,
}

impl Agent {
    /// Whether provider internals can drive this agent's status.
    pub fn internals_available(&self) -> bool {
        self.provider_session_file
            .as_deref()
            .is_some_and(|p| p.exists())
            || self.provider_runtime_dir.is_some()
    }
}
