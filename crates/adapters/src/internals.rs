// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internals-backed status: provider-written session files.
//!
//! Providers that record their conversation as JSONL (claude-style) let
//! the daemon read status and structured messages straight from disk
//! instead of scraping the terminal. Parsing is tolerant: a malformed
//! line is counted, never fatal.

use ah_core::AgentStatus;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// How far back in the file the tail readers look.
const TAIL_BYTES: u64 = 64 * 1024;

/// One structured message extracted from a session file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMessage {
    pub role: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Result of reading a session file's messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessages {
    pub messages: Vec<ProviderMessage>,
    pub parse_error_count: usize,
    pub warnings: Vec<String>,
}

/// Derive a status from the last complete line of a session file.
///
/// Returns `None` when the file cannot be read, so callers fall back to
/// the UI parser.
pub fn parse_status(path: &Path) -> Option<AgentStatus> {
    let line = last_nonempty_line(path)?;
    Some(status_from_line(&line))
}

/// Derive a status from the most recent `.jsonl` under a runtime dir.
pub fn status_from_runtime_dir(dir: &Path) -> Option<AgentStatus> {
    let latest = latest_jsonl(dir)?;
    parse_status(&latest)
}

/// Find the newest session file in a provider runtime dir, searching one
/// level of subdirectories (codex groups rollouts by date).
pub fn latest_jsonl(dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    collect_jsonl(dir, 2, &mut candidates);
    candidates
        .into_iter()
        .max_by_key(|p| p.metadata().ok().and_then(|m| m.modified().ok()))
}

fn collect_jsonl(dir: &Path, depth: u8, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|x| x == "jsonl") {
            out.push(path);
        } else if depth > 0 && path.is_dir() {
            collect_jsonl(&path, depth - 1, out);
        }
    }
}

/// Status for a single JSONL line.
fn status_from_line(line: &str) -> AgentStatus {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(line) else {
        return AgentStatus::Processing;
    };
    if detect_error(&json).is_some() {
        return AgentStatus::Error;
    }
    if json.get("type").and_then(|v| v.as_str()) != Some("assistant") {
        return AgentStatus::Processing;
    }
    let msg = json.get("message");
    let stop_reason = msg.and_then(|m| m.get("stop_reason"));
    if matches!(stop_reason, Some(sr) if !sr.is_null()) {
        return AgentStatus::Processing;
    }
    // tool_use and thinking blocks mean the turn is still going
    let has_active = msg
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
        .is_some_and(|arr| {
            arr.iter().any(|item| {
                matches!(
                    item.get("type").and_then(|v| v.as_str()),
                    Some("tool_use" | "thinking")
                )
            })
        });
    if has_active {
        AgentStatus::Processing
    } else {
        AgentStatus::Idle
    }
}

fn detect_error(json: &serde_json::Value) -> Option<String> {
    json.get("error")
        .and_then(|v| v.as_str())
        .or_else(|| {
            json.get("message")
                .and_then(|m| m.get("error"))
                .and_then(|v| v.as_str())
        })
        .map(String::from)
}

/// Extract the most recent assistant text from a session file.
///
/// Scans the tail in reverse for the last `"type": "assistant"` line and
/// concatenates its text content blocks.
pub fn last_assistant_text(path: &Path) -> Option<String> {
    let tail = read_tail(path)?;
    for line in tail.lines().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            continue;
        };
        if json.get("type").and_then(|v| v.as_str()) != Some("assistant") {
            continue;
        }
        let text = text_blocks(&json);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Read structured messages, newest-last, optionally filtered by role.
pub fn read_messages(path: &Path, limit: usize, role: Option<&str>) -> SessionMessages {
    let mut result = SessionMessages::default();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            result
                .warnings
                .push(format!("session file unreadable: {}", e));
            return result;
        }
    };

    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            result.parse_error_count += 1;
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                result.parse_error_count += 1;
                continue;
            }
        };
        let Some(msg_role) = json.get("type").and_then(|v| v.as_str()) else {
            continue;
        };
        if !matches!(msg_role, "user" | "assistant") {
            continue;
        }
        if role.is_some_and(|r| r != msg_role) {
            continue;
        }
        let text = match msg_role {
            "assistant" => text_blocks(&json),
            _ => user_text(&json),
        };
        if text.is_empty() {
            continue;
        }
        result.messages.push(ProviderMessage {
            role: msg_role.to_string(),
            text,
            timestamp: json
                .get("timestamp")
                .and_then(|v| v.as_str())
                .map(String::from),
        });
    }

    if result.parse_error_count > 0 {
        result.warnings.push(format!(
            "{} line(s) could not be parsed",
            result.parse_error_count
        ));
    }

    let len = result.messages.len();
    if limit > 0 && len > limit {
        result.messages.drain(..len - limit);
    }
    result
}

fn text_blocks(json: &serde_json::Value) -> String {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
        .map(|arr| {
            arr.iter()
                .filter(|item| item.get("type").and_then(|v| v.as_str()) == Some("text"))
                .filter_map(|item| item.get("text").and_then(|v| v.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn user_text(json: &serde_json::Value) -> String {
    let content = json.get("message").and_then(|m| m.get("content"));
    match content {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(_)) => text_blocks(json),
        _ => String::new(),
    }
}

/// Last non-empty complete line of a file, reading only the tail.
fn last_nonempty_line(path: &Path) -> Option<String> {
    let tail = read_tail(path)?;
    tail.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

fn read_tail(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    let start = len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).ok()?;
    let mut buf = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut buf).ok()?;
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    // Drop the partial first line when we started mid-file
    if start > 0 {
        if let Some(pos) = text.find('\n') {
            text.drain(..=pos);
        }
    }
    Some(text)
}

#[cfg(test)]
#[path = "internals_tests.rs"]
mod tests;
