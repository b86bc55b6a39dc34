// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized bus events and the provider-event intermediate.

use crate::status::{AgentStatus, StatusSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonically increasing event id, `evt-<N>`.
///
/// Ids are never reused, even after history eviction; ordering is the
/// numeric ordering of `N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("evt-{}", seq))
    }

    /// Parse `evt-<N>` back to its sequence number.
    pub fn seq(&self) -> Option<u64> {
        self.0.strip_prefix("evt-")?.parse().ok()
    }

    /// Parse a caller-supplied `since` value.
    pub fn parse(s: &str) -> Option<Self> {
        let id = Self(s.to_string());
        id.seq().map(|_| id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One option offered by an agent's question prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
}

/// Type-specific payload of a normalized event.
///
/// Serializes with `{"type": "<name>", ...fields}`; field names are
/// camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    AgentStarted,
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        from: AgentStatus,
        to: AgentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<StatusSource>,
    },
    Output {
        text: String,
    },
    ToolUse {
        tool: String,
        input: String,
    },
    ToolResult {
        tool: String,
        output: String,
    },
    Error {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentExited {
        exit_code: Option<i32>,
    },
    InputSent {
        text: String,
    },
    PermissionRequested {
        description: String,
    },
    QuestionAsked {
        question: String,
        #[serde(default)]
        options: Vec<QuestionOption>,
    },
    Unknown {
        raw: String,
    },
    Heartbeat,
}

impl EventPayload {
    /// Wire name of the discriminator, used for filter matching and as
    /// the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::AgentStarted => "agent_started",
            EventPayload::StatusChanged { .. } => "status_changed",
            EventPayload::Output { .. } => "output",
            EventPayload::ToolUse { .. } => "tool_use",
            EventPayload::ToolResult { .. } => "tool_result",
            EventPayload::Error { .. } => "error",
            EventPayload::AgentExited { .. } => "agent_exited",
            EventPayload::InputSent { .. } => "input_sent",
            EventPayload::PermissionRequested { .. } => "permission_requested",
            EventPayload::QuestionAsked { .. } => "question_asked",
            EventPayload::Unknown { .. } => "unknown",
            EventPayload::Heartbeat => "heartbeat",
        }
    }
}

/// An event as published on the bus and over SSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub id: EventId,
    pub ts: DateTime<Utc>,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Subscriber-side filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventFilter {
    pub project: Option<String>,
    pub agent_id: Option<String>,
    pub types: Option<Vec<String>>,
}

impl EventFilter {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    pub fn for_agent(project: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            agent_id: Some(agent_id.into()),
            types: None,
        }
    }

    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if let Some(ref p) = self.project {
            if event.project != *p {
                return false;
            }
        }
        if let Some(ref a) = self.agent_id {
            if event.agent_id.as_deref() != Some(a.as_str()) {
                return false;
            }
        }
        if let Some(ref types) = self.types {
            if !types.iter().any(|t| t == event.payload.kind()) {
                return false;
            }
        }
        true
    }
}

/// Per-diff classification produced by a provider strategy.
///
/// Not persisted; the poller lifts these into [`NormalizedEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Text { text: String },
    ToolStart { tool: String, input: String },
    ToolEnd { tool: String, output: String },
    Error { message: String },
    Completion,
    PermissionRequested { description: String },
    QuestionAsked { question: String, options: Vec<String> },
    Unknown { raw: String },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
