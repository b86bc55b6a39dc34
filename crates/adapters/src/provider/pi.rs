// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pi strategy. UI-parser driven; pi has no readable internals.

use super::{parse_diff_with, parse_status_with, ProviderStrategy, UiPatterns};
use ah_core::{AgentStatus, ProviderEvent};

const PATTERNS: UiPatterns = UiPatterns {
    idle: &["pi ›", "Type a message"],
    busy: &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "working…"],
    permission: &["Allow tool", "[y/n]"],
    question: &["Choose one"],
    error: &["error:", "Error:"],
};

/// Strategy for the `pi` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pi;

impl ProviderStrategy for Pi {
    fn tag(&self) -> &'static str {
        "pi"
    }

    fn default_command(&self) -> &'static str {
        "pi"
    }

    fn internals_backed(&self, _session_file_exists: bool, _runtime_dir_set: bool) -> bool {
        false
    }

    fn parse_status(&self, captured: &str) -> AgentStatus {
        parse_status_with(&PATTERNS, captured)
    }

    fn parse_output_diff(&self, diff: &str) -> Vec<ProviderEvent> {
        parse_diff_with(&PATTERNS, diff, classify_line)
    }

    fn exit_command(&self) -> &'static str {
        "/exit"
    }

    fn is_idle_prompt(&self, stripped: &str) -> bool {
        PATTERNS.idle.iter().any(|p| stripped.contains(p))
    }
}

fn classify_line(line: &str) -> Option<ProviderEvent> {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix("→ ") {
        let (tool, input) = rest.split_once(' ').unwrap_or((rest, ""));
        return Some(ProviderEvent::ToolStart {
            tool: tool.to_string(),
            input: input.to_string(),
        });
    }

    if let Some(output) = trimmed.strip_prefix("← ") {
        return Some(ProviderEvent::ToolEnd {
            tool: String::new(),
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

    if PATTERNS.error.iter().any(|p| trimmed.contains(p)) {
        return Some(ProviderEvent::Error {
            message: trimmed.to_string(),
        });
    }

    None
}

#[cfg(test)]
#[path = "pi_tests.rs"]
mod tests;
