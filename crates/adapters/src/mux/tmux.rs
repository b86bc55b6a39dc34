// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux mux adapter.

use super::command::WindowCommand;
use super::{MuxAdapter, MuxError, SessionInfo, WindowInfo};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Virtual geometry for detached sessions. Wide enough that provider
/// TUIs do not wrap their status lines.
const SESSION_WIDTH: &str = "220";
const SESSION_HEIGHT: &str = "50";

/// Default settle delay between pasting text and pressing Enter.
const PASTE_SETTLE_MS: u64 = 120;

/// Tmux-backed mux adapter. Stateless; every call spawns `tmux`.
#[derive(Clone)]
pub struct Tmux {
    bin: String,
    settle: Duration,
}

impl Tmux {
    pub fn new() -> Self {
        let settle = std::env::var("AH_PASTE_SETTLE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(PASTE_SETTLE_MS);
        Self {
            bin: "tmux".to_string(),
            settle: Duration::from_millis(settle),
        }
    }

    /// Use a different binary name (tests point this at a stub).
    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Run one mux invocation and return its stdout.
    async fn run(&self, args: &[&str], target: &str) -> Result<String, MuxError> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MuxError::MuxNotInstalled
                } else {
                    MuxError::CommandFailed {
                        command: format!("{} {}", self.bin, args.join(" ")),
                        stderr: e.to_string(),
                        exit_code: -1,
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let command = format!("{} {}", self.bin, args.join(" "));
            tracing::debug!(command = %command, stderr = %stderr, "mux command failed");
            return Err(MuxError::classify(
                command,
                stderr,
                output.status.code().unwrap_or(-1),
                target,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn set_option(&self, session: &str, key: &str, value: &str) -> Result<(), MuxError> {
        self.run(&["set-option", "-t", session, key, value], session)
            .await
            .map(|_| ())
    }
}

impl Default for Tmux {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MuxAdapter for Tmux {
    async fn create_session(&self, name: &str, cwd: &Path) -> Result<(), MuxError> {
        let cwd_str = cwd.to_string_lossy();
        self.run(
            &[
                "new-session",
                "-d",
                "-s",
                name,
                "-c",
                &cwd_str,
                "-x",
                SESSION_WIDTH,
                "-y",
                SESSION_HEIGHT,
            ],
            name,
        )
        .await?;

        // Panes must survive process death for post-mortem capture, and
        // window names must stay stable so targets keep resolving.
        self.set_option(name, "remain-on-exit", "on").await?;
        self.set_option(name, "allow-rename", "off").await?;
        self.set_option(name, "automatic-rename", "off").await?;
        Ok(())
    }

    async fn create_window(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        command: &WindowCommand,
    ) -> Result<String, MuxError> {
        let cwd_str = cwd.to_string_lossy();
        let shell = command.shell_string();
        let pane_id = self
            .run(
                &[
                    "new-window",
                    "-t",
                    session,
                    "-n",
                    window,
                    "-c",
                    &cwd_str,
                    "-P",
                    "-F",
                    "#{pane_id}",
                    &shell,
                ],
                session,
            )
            .await?;
        Ok(pane_id.trim().to_string())
    }

    async fn send_input(&self, target: &str, text: &str) -> Result<(), MuxError> {
        // Four-step paste protocol: writing through a buffer avoids
        // send-keys' per-character delivery, and the settle delay lets
        // the provider TUI finish re-rendering before Enter lands.
        let tmpfile = write_buffer_file(text).map_err(|e| MuxError::CommandFailed {
            command: "load-buffer".to_string(),
            stderr: e.to_string(),
            exit_code: -1,
        })?;
        let path = tmpfile.path().to_string_lossy().to_string();

        self.run(&["load-buffer", &path], target).await?;
        self.run(&["paste-buffer", "-t", target, "-d"], target)
            .await?;
        tokio::time::sleep(self.settle).await;
        self.run(&["send-keys", "-t", target, "Enter"], target)
            .await?;
        // tmpfile removed on drop, including the error paths above
        Ok(())
    }

    async fn send_keys(&self, target: &str, keys: &[&str]) -> Result<(), MuxError> {
        let mut args = vec!["send-keys", "-t", target];
        args.extend_from_slice(keys);
        self.run(&args, target).await.map(|_| ())
    }

    async fn capture_pane(&self, target: &str, lines: u32) -> Result<String, MuxError> {
        let start = format!("-{}", lines);
        self.run(
            &["capture-pane", "-t", target, "-p", "-S", &start],
            target,
        )
        .await
    }

    async fn start_pipe_pane(&self, target: &str, log_path: &Path) -> Result<(), MuxError> {
        let sink = format!(
            "cat >> {}",
            super::command::shell_quote(&log_path.to_string_lossy())
        );
        self.run(&["pipe-pane", "-t", target, &sink], target)
            .await
            .map(|_| ())
    }

    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MuxError> {
        self.run(&["pipe-pane", "-t", target], target)
            .await
            .map(|_| ())
    }

    async fn kill_window(&self, target: &str) -> Result<(), MuxError> {
        self.run(&["kill-window", "-t", target], target)
            .await
            .map(|_| ())
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        self.run(&["kill-session", "-t", name], name)
            .await
            .map(|_| ())
    }

    async fn has_session(&self, name: &str) -> Result<bool, MuxError> {
        match self.run(&["has-session", "-t", name], name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(MuxError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_sessions(&self, prefix: &str) -> Result<Vec<SessionInfo>, MuxError> {
        let format = "#{session_name}\t#{session_windows}\t#{session_created}\t#{session_attached}";
        let output = match self.run(&["list-sessions", "-F", format], "").await {
            Ok(out) => out,
            // A mux with no server has no sessions
            Err(MuxError::SessionNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let wanted = format!("{}-", prefix);
        Ok(output
            .lines()
            .filter_map(|line| parse_session_line(line))
            .filter(|s| s.name.starts_with(&wanted))
            .collect())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, MuxError> {
        let format = "#{window_index}\t#{window_name}\t#{window_active}\t#{pane_id}";
        let output = self
            .run(&["list-windows", "-t", session, "-F", format], session)
            .await?;
        Ok(output
            .lines()
            .filter_map(|line| parse_window_line(line))
            .collect())
    }

    async fn get_pane_var(&self, target: &str, var: &str) -> Result<String, MuxError> {
        let format = format!("#{{{}}}", var);
        let output = self
            .run(&["display-message", "-t", target, "-p", &format], target)
            .await?;
        Ok(output.trim_end_matches('\n').to_string())
    }

    async fn set_env(&self, session: &str, name: &str, value: &str) -> Result<(), MuxError> {
        self.run(&["set-environment", "-t", session, name, value], session)
            .await
            .map(|_| ())
    }
}

fn write_buffer_file(text: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn parse_session_line(line: &str) -> Option<SessionInfo> {
    let mut fields = line.split('\t');
    let name = fields.next()?.to_string();
    let window_count = fields.next()?.parse().ok()?;
    let created_at = fields.next().and_then(|v| v.parse().ok());
    let attached = fields.next().is_some_and(|v| v != "0" && !v.is_empty());
    Some(SessionInfo {
        name,
        window_count,
        created_at,
        attached,
    })
}

fn parse_window_line(line: &str) -> Option<WindowInfo> {
    let mut fields = line.split('\t');
    let index = fields.next()?.parse().ok()?;
    let name = fields.next()?.to_string();
    let active = fields.next()? == "1";
    let pane_id = fields.next()?.to_string();
    Some(WindowInfo {
        index,
        name,
        active,
        pane_id,
    })
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
