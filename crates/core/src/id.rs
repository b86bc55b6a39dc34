// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated identifier newtypes.
//!
//! A `ProjectName` doubles as the mux session suffix, so its alphabet is
//! restricted to what tmux accepts in a session name. An `AgentId` is
//! either caller-supplied (validated here) or generated by the engine's
//! word-list generator (which only produces valid ids).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure for a caller-supplied name or id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("invalid project name {0:?}: must match [a-z0-9][a-z0-9-]{{0,38}}")]
    Project(String),
    #[error("invalid agent id {0:?}: must match [a-z0-9][a-z0-9-]{{2,40}}")]
    Agent(String),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn head_ok(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `as_str()`, `Display`, `From<String>`, `PartialEq<&str>`,
/// and `Borrow<str>` implementations. Construction goes through the
/// type's own `parse`/`new` so validation cannot be bypassed by callers.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_name! {
    /// A project name: `[a-z0-9][a-z0-9-]{0,38}`.
    pub struct ProjectName;
}

impl ProjectName {
    /// Validate and wrap a caller-supplied project name.
    pub fn parse(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        let ok = !s.is_empty() && s.len() <= 39 && head_ok(&s) && s.chars().all(is_name_char);
        if ok {
            Ok(Self(s))
        } else {
            Err(NameError::Project(s))
        }
    }
}

define_name! {
    /// An agent id, unique within its project.
    pub struct AgentId;
}

impl AgentId {
    /// Validate and wrap a caller-supplied agent id: `[a-z0-9][a-z0-9-]{2,40}`.
    pub fn parse(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        let ok = s.len() >= 3 && s.len() <= 41 && head_ok(&s) && s.chars().all(is_name_char);
        if ok {
            Ok(Self(s))
        } else {
            Err(NameError::Agent(s))
        }
    }

    /// Wrap an id produced by the engine's generator.
    ///
    /// Generated ids (`<provider>-<adjective>-<noun>[-<k>]`) are built
    /// from the word lists and always satisfy the agent-id pattern.
    pub fn generated(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
