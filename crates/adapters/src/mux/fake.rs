// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake mux adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::command::WindowCommand;
use super::{MuxAdapter, MuxError, SessionInfo, WindowInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded mux call.
#[derive(Debug, Clone)]
pub enum MuxCall {
    CreateSession { name: String, cwd: PathBuf },
    CreateWindow {
        session: String,
        window: String,
        cwd: PathBuf,
        shell: String,
    },
    SendInput { target: String, text: String },
    SendKeys { target: String, keys: Vec<String> },
    CapturePane { target: String, lines: u32 },
    StartPipePane { target: String, log_path: PathBuf },
    StopPipePane { target: String },
    KillWindow { target: String },
    KillSession { name: String },
}

/// Simulated window state.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub name: String,
    pub pane_id: String,
    pub dead: bool,
    pub current_command: String,
    pub capture: String,
    pub piping_to: Option<PathBuf>,
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct FakeSession {
    cwd: PathBuf,
    windows: Vec<FakeWindow>,
    env: Vec<(String, String)>,
}

#[derive(Default)]
struct FakeState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<MuxCall>,
    next_pane: u64,
    installed: bool,
}

/// Fake mux adapter for testing.
#[derive(Clone)]
pub struct FakeMux {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeMux {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                installed: true,
                ..FakeState::default()
            })),
        }
    }
}

impl FakeMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a machine without the mux binary.
    pub fn not_installed() -> Self {
        let fake = Self::new();
        fake.inner.lock().installed = false;
        fake
    }

    /// Simulate the mux binary disappearing or returning at runtime.
    pub fn set_installed(&self, installed: bool) {
        self.inner.lock().installed = installed;
    }

    pub fn calls(&self) -> Vec<MuxCall> {
        self.inner.lock().calls.clone()
    }

    pub fn session_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().sessions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn window(&self, target: &str) -> Option<FakeWindow> {
        let inner = self.inner.lock();
        lookup(&inner, target).cloned()
    }

    pub fn session_cwd(&self, session: &str) -> Option<PathBuf> {
        self.inner.lock().sessions.get(session).map(|s| s.cwd.clone())
    }

    pub fn session_env(&self, session: &str) -> Vec<(String, String)> {
        self.inner
            .lock()
            .sessions
            .get(session)
            .map(|s| s.env.clone())
            .unwrap_or_default()
    }

    /// Replace a pane's simulated scrollback.
    pub fn set_capture(&self, target: &str, text: impl Into<String>) {
        let mut inner = self.inner.lock();
        if let Some(w) = lookup_mut(&mut inner, target) {
            w.capture = text.into();
        }
    }

    /// Mark a pane dead (process exited, pane retained by remain-on-exit).
    pub fn set_pane_dead(&self, target: &str) {
        let mut inner = self.inner.lock();
        if let Some(w) = lookup_mut(&mut inner, target) {
            w.dead = true;
            w.current_command = String::new();
        }
    }

    pub fn set_pane_command(&self, target: &str, command: impl Into<String>) {
        let mut inner = self.inner.lock();
        if let Some(w) = lookup_mut(&mut inner, target) {
            w.current_command = command.into();
        }
    }

    /// Kill a window out-of-band, as a user attached to the mux would.
    pub fn kill_window_external(&self, target: &str) {
        let mut inner = self.inner.lock();
        remove_window(&mut inner, target);
    }

    fn check_installed(&self) -> Result<(), MuxError> {
        if self.inner.lock().installed {
            Ok(())
        } else {
            Err(MuxError::MuxNotInstalled)
        }
    }
}

/// Split `<session>:<window>.0` into its parts.
fn split_target(target: &str) -> Option<(&str, &str)> {
    let (session, rest) = target.split_once(':')?;
    let window = rest.strip_suffix(".0").unwrap_or(rest);
    Some((session, window))
}

fn lookup<'a>(state: &'a FakeState, target: &str) -> Option<&'a FakeWindow> {
    if let Some((session, window)) = split_target(target) {
        return state
            .sessions
            .get(session)?
            .windows
            .iter()
            .find(|w| w.name == window);
    }
    // Pane-id addressing
    state
        .sessions
        .values()
        .flat_map(|s| s.windows.iter())
        .find(|w| w.pane_id == target)
}

fn lookup_mut<'a>(state: &'a mut FakeState, target: &str) -> Option<&'a mut FakeWindow> {
    if let Some((session, window)) = split_target(target) {
        return state
            .sessions
            .get_mut(session)?
            .windows
            .iter_mut()
            .find(|w| w.name == window);
    }
    state
        .sessions
        .values_mut()
        .flat_map(|s| s.windows.iter_mut())
        .find(|w| w.pane_id == target)
}

fn remove_window(state: &mut FakeState, target: &str) -> bool {
    let Some((session, window)) = split_target(target) else {
        return false;
    };
    let Some(s) = state.sessions.get_mut(session) else {
        return false;
    };
    let before = s.windows.len();
    s.windows.retain(|w| w.name != window);
    s.windows.len() != before
}

#[async_trait]
impl MuxAdapter for FakeMux {
    async fn create_session(&self, name: &str, cwd: &Path) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::CreateSession {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
        });
        inner.sessions.insert(
            name.to_string(),
            FakeSession {
                cwd: cwd.to_path_buf(),
                ..FakeSession::default()
            },
        );
        Ok(())
    }

    async fn create_window(
        &self,
        session: &str,
        window: &str,
        cwd: &Path,
        command: &WindowCommand,
    ) -> Result<String, MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.next_pane += 1;
        let pane_id = format!("%{}", inner.next_pane);
        inner.calls.push(MuxCall::CreateWindow {
            session: session.to_string(),
            window: window.to_string(),
            cwd: cwd.to_path_buf(),
            shell: command.shell_string(),
        });
        let process = command
            .argv
            .first()
            .and_then(|arg0| arg0.rsplit('/').next())
            .unwrap_or("sh")
            .to_string();
        let Some(s) = inner.sessions.get_mut(session) else {
            return Err(MuxError::SessionNotFound(session.to_string()));
        };
        s.windows.push(FakeWindow {
            name: window.to_string(),
            pane_id: pane_id.clone(),
            dead: false,
            current_command: process,
            capture: String::new(),
            piping_to: None,
            inputs: Vec::new(),
        });
        Ok(pane_id)
    }

    async fn send_input(&self, target: &str, text: &str) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::SendInput {
            target: target.to_string(),
            text: text.to_string(),
        });
        match lookup_mut(&mut inner, target) {
            Some(w) => {
                w.inputs.push(text.to_string());
                Ok(())
            }
            None => Err(MuxError::WindowNotFound(target.to_string())),
        }
    }

    async fn send_keys(&self, target: &str, keys: &[&str]) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::SendKeys {
            target: target.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        });
        if lookup(&inner, target).is_none() {
            return Err(MuxError::WindowNotFound(target.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(&self, target: &str, lines: u32) -> Result<String, MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::CapturePane {
            target: target.to_string(),
            lines,
        });
        match lookup(&inner, target) {
            Some(w) => Ok(w.capture.clone()),
            None => Err(MuxError::WindowNotFound(target.to_string())),
        }
    }

    async fn start_pipe_pane(&self, target: &str, log_path: &Path) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::StartPipePane {
            target: target.to_string(),
            log_path: log_path.to_path_buf(),
        });
        match lookup_mut(&mut inner, target) {
            Some(w) => {
                w.piping_to = Some(log_path.to_path_buf());
                Ok(())
            }
            None => Err(MuxError::WindowNotFound(target.to_string())),
        }
    }

    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::StopPipePane {
            target: target.to_string(),
        });
        match lookup_mut(&mut inner, target) {
            Some(w) => {
                w.piping_to = None;
                Ok(())
            }
            None => Err(MuxError::WindowNotFound(target.to_string())),
        }
    }

    async fn kill_window(&self, target: &str) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::KillWindow {
            target: target.to_string(),
        });
        if remove_window(&mut inner, target) {
            Ok(())
        } else {
            Err(MuxError::WindowNotFound(target.to_string()))
        }
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::KillSession {
            name: name.to_string(),
        });
        if inner.sessions.remove(name).is_none() {
            return Err(MuxError::SessionNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn has_session(&self, name: &str) -> Result<bool, MuxError> {
        self.check_installed()?;
        Ok(self.inner.lock().sessions.contains_key(name))
    }

    async fn list_sessions(&self, prefix: &str) -> Result<Vec<SessionInfo>, MuxError> {
        self.check_installed()?;
        let inner = self.inner.lock();
        let wanted = format!("{}-", prefix);
        let mut sessions: Vec<SessionInfo> = inner
            .sessions
            .iter()
            .filter(|(name, _)| name.starts_with(&wanted))
            .map(|(name, s)| SessionInfo {
                name: name.clone(),
                window_count: s.windows.len() as u32,
                created_at: None,
                attached: false,
            })
            .collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, MuxError> {
        self.check_installed()?;
        let inner = self.inner.lock();
        let s = inner
            .sessions
            .get(session)
            .ok_or_else(|| MuxError::SessionNotFound(session.to_string()))?;
        Ok(s.windows
            .iter()
            .enumerate()
            .map(|(i, w)| WindowInfo {
                index: i as u32,
                name: w.name.clone(),
                active: i == 0,
                pane_id: w.pane_id.clone(),
            })
            .collect())
    }

    async fn get_pane_var(&self, target: &str, var: &str) -> Result<String, MuxError> {
        self.check_installed()?;
        let inner = self.inner.lock();
        let w = lookup(&inner, target).ok_or_else(|| MuxError::WindowNotFound(target.to_string()))?;
        Ok(match var {
            "pane_dead" => {
                if w.dead {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            "pane_current_command" => w.current_command.clone(),
            "pane_id" => w.pane_id.clone(),
            "pane_pid" => "4242".to_string(),
            _ => String::new(),
        })
    }

    async fn set_env(&self, session: &str, name: &str, value: &str) -> Result<(), MuxError> {
        self.check_installed()?;
        let mut inner = self.inner.lock();
        let s = inner
            .sessions
            .get_mut(session)
            .ok_or_else(|| MuxError::SessionNotFound(session.to_string()))?;
        s.env.push((name.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
