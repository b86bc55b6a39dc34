// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex strategy.
//!
//! Codex keeps rollout files under its home directory, so when a runtime
//! dir is allocated its internals drive status even before the first
//! session file appears.

use super::{parse_diff_with, parse_status_with, ProviderStrategy, UiPatterns};
use ah_core::{AgentStatus, ProviderEvent};
use std::path::Path;

const PATTERNS: UiPatterns = UiPatterns {
    idle: &["Ask Codex", "send a message", "⏎ send"],
    busy: &["Working (", "esc to interrupt", "Thinking"],
    permission: &["Allow command", "Approve this", "y/N"],
    question: &["Select an option"],
    error: &["ERROR:", "stream error", "unexpected status"],
};

/// Strategy for the `codex` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codex;

impl ProviderStrategy for Codex {
    fn tag(&self) -> &'static str {
        "codex"
    }

    fn default_command(&self) -> &'static str {
        "codex"
    }

    fn supports_internals(&self) -> bool {
        true
    }

    fn internals_env(&self, runtime_dir: &Path) -> Vec<(String, String)> {
        vec![(
            "CODEX_HOME".to_string(),
            runtime_dir.to_string_lossy().to_string(),
        )]
    }

    fn internals_backed(&self, session_file_exists: bool, runtime_dir_set: bool) -> bool {
        session_file_exists || runtime_dir_set
    }

    fn parse_status(&self, captured: &str) -> AgentStatus {
        parse_status_with(&PATTERNS, captured)
    }

    fn parse_output_diff(&self, diff: &str) -> Vec<ProviderEvent> {
        parse_diff_with(&PATTERNS, diff, classify_line)
    }

    fn exit_command(&self) -> &'static str {
        "/quit"
    }

    fn is_idle_prompt(&self, stripped: &str) -> bool {
        PATTERNS.idle.iter().any(|p| stripped.contains(p))
    }
}

fn classify_line(line: &str) -> Option<ProviderEvent> {
    let trimmed = line.trim_start();

    if let Some(command) = trimmed.strip_prefix("$ ") {
        return Some(ProviderEvent::ToolStart {
            tool: "shell".to_string(),
            input: command.to_string(),
        });
    }
    if let Some(rest) = trimmed.strip_prefix("exec ") {
        return Some(ProviderEvent::ToolStart {
            tool: "shell".to_string(),
            input: rest.to_string(),
        });
    }

    if let Some(output) = trimmed.strip_prefix("└ ") {
        return Some(ProviderEvent::ToolEnd {
            tool: "shell".to_string(),
            output: output.to_string(),
        });
    }

    if PATTERNS.permission.iter().any(|p| trimmed.contains(p)) {
        return Some(ProviderEvent::PermissionRequested {
            description: trimmed.to_string(),
        });
    }

    if PATTERNS.question.iter().any(|p| trimmed.contains(p)) {
        return Some(ProviderEvent::QuestionAsked {
            question: trimmed.to_string(),
            options: Vec::new(),
        });
    }

    if trimmed.starts_with("• Completed") || trimmed.contains("tokens used") {
        return Some(ProviderEvent::Completion);
    }

    if PATTERNS.error.iter().any(|p| trimmed.contains(p)) {
        return Some(ProviderEvent::Error {
            message: trimmed.to_string(),
        });
    }

    None
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
