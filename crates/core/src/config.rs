// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration surface.
//!
//! Every recognized option is an explicit field; unset optionals are
//! distinguished from zero values. Out-of-range numeric values clamp to
//! their documented bounds on load rather than erroring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 7070;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_MUX_PREFIX: &str = "ah";
pub const POLL_INTERVAL_MS: (u64, u64, u64) = (100, 1000, 30_000);
pub const CAPTURE_LINES: (u32, u32, u32) = (10, 500, 10_000);
pub const MAX_EVENT_HISTORY: (usize, usize, usize) = (100, 10_000, 100_000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bearer-token auth for the HTTP surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When set, required as `Authorization: Bearer <token>` on all routes
    #[serde(default)]
    pub token: Option<String>,
}

/// Per-provider command construction settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base command, e.g. `claude` or `codex`
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Outbound webhook dispatcher settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Fallback receiver used when an agent's callback has no url
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Extra key-values forwarded verbatim in the payload's `extra` field
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

/// The daemon's full configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AhConfig {
    pub port: u16,
    pub bind_address: String,
    /// Session-name prefix identifying this daemon's mux sessions
    pub mux_prefix: String,
    pub poll_interval_ms: u64,
    pub capture_lines: u32,
    pub max_event_history: usize,
    pub log_level: String,
    pub auth: AuthConfig,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub webhook: WebhookConfig,
}

impl Default for AhConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            mux_prefix: DEFAULT_MUX_PREFIX.to_string(),
            poll_interval_ms: POLL_INTERVAL_MS.1,
            capture_lines: CAPTURE_LINES.1,
            max_event_history: MAX_EVENT_HISTORY.1,
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            providers: BTreeMap::new(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl AhConfig {
    /// Parse from TOML and normalize.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        config.normalize();
        Ok(config)
    }

    /// Clamp numeric options to their documented bounds.
    pub fn normalize(&mut self) {
        self.poll_interval_ms = self
            .poll_interval_ms
            .clamp(POLL_INTERVAL_MS.0, POLL_INTERVAL_MS.2);
        self.capture_lines = self.capture_lines.clamp(CAPTURE_LINES.0, CAPTURE_LINES.2);
        self.max_event_history = self
            .max_event_history
            .clamp(MAX_EVENT_HISTORY.0, MAX_EVENT_HISTORY.2);
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        match self.log_level.as_str() {
            "debug" | "info" | "warn" | "error" => {}
            _ => self.log_level = "info".to_string(),
        }
    }

    pub fn provider(&self, tag: &str) -> Option<&ProviderConfig> {
        self.providers.get(tag).filter(|p| p.enabled)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
