// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code strategy.

use super::{parse_diff_with, parse_status_with, ProviderStrategy, UiPatterns};
use ah_core::{AgentStatus, ProviderEvent};
use std::path::Path;

const PATTERNS: UiPatterns = UiPatterns {
    idle: &["? for shortcuts", "Bypassing Permissions", "⏵⏵ accept edits"],
    busy: &["esc to interrupt", "✻ ", "✳ "],
    permission: &["Do you want to", "Bypass Permissions mode", "1. Yes"],
    question: &["(Use arrow keys)", "❯ "],
    error: &["API Error", "⎿  Error", "Error:"],
};

/// Strategy for the `claude-code` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeCode;

impl ProviderStrategy for ClaudeCode {
    fn tag(&self) -> &'static str {
        "claude-code"
    }

    fn default_command(&self) -> &'static str {
        "claude"
    }

    fn supports_internals(&self) -> bool {
        true
    }

    fn internals_env(&self, runtime_dir: &Path) -> Vec<(String, String)> {
        vec![(
            "CLAUDE_CONFIG_DIR".to_string(),
            runtime_dir.to_string_lossy().to_string(),
        )]
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

    // "⏺ Bash(cargo test)" opens a tool call; "⏺ plain text" is the
    // assistant talking and falls through to the text rule.
    if let Some(rest) = trimmed.strip_prefix("⏺ ").or_else(|| trimmed.strip_prefix("● ")) {
        if let Some(event) = parse_tool_call(rest) {
            return Some(event);
        }
        return Some(ProviderEvent::Text {
            text: rest.trim().to_string(),
        });
    }

    if let Some(rest) = trimmed.strip_prefix("⎿") {
        return Some(ProviderEvent::ToolEnd {
            tool: String::new(),
            output: rest.trim().to_string(),
        });
    }

    if PATTERNS.permission.iter().any(|p| trimmed.contains(p)) {
        return Some(ProviderEvent::PermissionRequested {
            description: trimmed.to_string(),
        });
    }

    if trimmed.contains("(Use arrow keys)") {
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

fn parse_tool_call(rest: &str) -> Option<ProviderEvent> {
    let open = rest.find('(')?;
    let close = rest.rfind(')')?;
    if close <= open {
        return None;
    }
    let tool = rest[..open].trim();
    let named_like_tool = !tool.is_empty()
        && tool
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !named_like_tool {
        return None;
    }
    Some(ProviderEvent::ToolStart {
        tool: tool.to_string(),
        input: rest[open + 1..close].to_string(),
    })
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
