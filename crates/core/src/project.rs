// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project records.

use crate::id::ProjectName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Delivery target for terminal-event webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Callback {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// A named grouping of agents sharing a working directory and mux session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: ProjectName,
    pub cwd: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Default callback inherited by agents created without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Callback>,
    /// Derived mux session name, `<prefix>-<name>`; 1:1 with the project
    /// for the daemon lifetime
    pub mux_session: String,
}

impl Project {
    pub fn new(
        name: ProjectName,
        cwd: PathBuf,
        callback: Option<Callback>,
        mux_prefix: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mux_session = format!("{}-{}", mux_prefix, name);
        Self {
            name,
            cwd,
            created_at,
            callback,
            mux_session,
        }
    }
}
