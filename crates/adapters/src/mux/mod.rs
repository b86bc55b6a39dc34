// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mux adapter: a typed wrapper around the multiplexer subprocess.
//!
//! Every call shells out to the mux binary and classifies failures from
//! stderr. The adapter is stateless; each call spawns a fresh process,
//! so it is inherently safe to use from concurrent tasks.

mod command;
mod tmux;

pub use command::WindowCommand;
pub use tmux::Tmux;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMux, FakeWindow, MuxCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from mux operations.
#[derive(Debug, Clone, Error)]
pub enum MuxError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("window not found: {0}")]
    WindowNotFound(String),
    #[error("mux binary not installed")]
    MuxNotInstalled,
    #[error("mux command failed (exit {exit_code}): {command}: {stderr}")]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: i32,
    },
}

impl MuxError {
    /// Classify a non-zero mux exit from its stderr.
    ///
    /// The mux reports missing targets with a handful of known phrases;
    /// anything else stays a `CommandFailed` with the full stderr.
    pub fn classify(command: String, stderr: String, exit_code: i32, target: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("no server running")
            || lower.contains("session not found")
            || lower.contains("can't find session")
        {
            return MuxError::SessionNotFound(target.to_string());
        }
        if lower.contains("window not found") || lower.contains("can't find window") {
            return MuxError::WindowNotFound(target.to_string());
        }
        MuxError::CommandFailed {
            command,
            stderr,
            exit_code,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MuxError::SessionNotFound(_) | MuxError::WindowNotFound(_)
        )
    }
}

/// One mux session as reported by `list-sessions`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub name: String,
    pub window_count: u32,
    pub created_at: Option<i64>,
    pub attached: bool,
}

/// One window as reported by `list-windows`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub index: u32,
    pub name: String,
    pub active: bool,
    pub pane_id: String,
}

/// Adapter over the terminal multiplexer subprocess.
#[async_trait]
pub trait MuxAdapter: Clone + Send + Sync + 'static {
    /// Create a detached session with the fixed virtual geometry and the
    /// daemon's session options applied. Idempotence is the caller's
    /// concern via [`MuxAdapter::has_session`].
    async fn create_session(&self, name: &str, cwd: &Path) -> Result<(), MuxError>;

    /// Create a window running `command`, returning the new pane id.
    async fn create_window(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        command: &WindowCommand,
    ) -> Result<String, MuxError>;

    /// Paste text into a pane and submit it with Enter.
    ///
    /// Uses the buffer-paste protocol rather than `send-keys` so that
    /// provider TUIs receive the text as a single non-bracketed paste.
    async fn send_input(&self, target: &str, text: &str) -> Result<(), MuxError>;

    /// Send raw key names (e.g. `Escape`, `Enter`, `C-c`).
    async fn send_keys(&self, target: &str, keys: &[&str]) -> Result<(), MuxError>;

    /// Capture `lines` of scrollback plus the visible pane as plain text.
    async fn capture_pane(&self, target: &str, lines: u32) -> Result<String, MuxError>;

    /// Start appending pane output to `log_path`.
    async fn start_pipe_pane(&self, target: &str, log_path: &Path) -> Result<(), MuxError>;

    /// Stop an active pipe on the pane.
    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MuxError>;

    async fn kill_window(&self, target: &str) -> Result<(), MuxError>;

    async fn kill_session(&self, name: &str) -> Result<(), MuxError>;

    async fn has_session(&self, name: &str) -> Result<bool, MuxError>;

    /// List sessions whose names start with `<prefix>-`.
    ///
    /// "no server running" is an empty list, not an error.
    async fn list_sessions(&self, prefix: &str) -> Result<Vec<SessionInfo>, MuxError>;

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, MuxError>;

    /// Read a pane format variable, e.g. `pane_dead` or `pane_current_command`.
    async fn get_pane_var(&self, target: &str, var: &str) -> Result<String, MuxError>;

    /// Set a session environment variable.
    async fn set_env(&self, session: &str, name: &str, value: &str) -> Result<(), MuxError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
