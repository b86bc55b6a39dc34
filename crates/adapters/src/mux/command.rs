// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell-string assembly for `new-window`.
//!
//! The mux runs the window command through a shell, so argv elements are
//! quoted and the environment is applied with an `env` prefix. Output is
//! deterministic: env entries sorted by key, unset keys deduplicated and
//! sorted.

use std::collections::BTreeMap;

/// The process to start inside a new window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowCommand {
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub unset_env: Vec<String>,
}

impl WindowCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Self::default()
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_unset_env(mut self, unset: Vec<String>) -> Self {
        self.unset_env = unset;
        self
    }

    /// Render as a single shell string: `env [-u KEY]… K=V … argv…`.
    ///
    /// The `env` prefix is emitted only when there is an environment to
    /// apply; a bare argv is just quoted and joined.
    pub fn shell_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.env.is_empty() || !self.unset_env.is_empty() {
            parts.push("env".to_string());
            let mut unset: Vec<&str> = self.unset_env.iter().map(String::as_str).collect();
            unset.sort_unstable();
            unset.dedup();
            for key in unset {
                parts.push("-u".to_string());
                parts.push(shell_quote(key));
            }
            // BTreeMap iteration is already key-sorted
            for (key, value) in &self.env {
                parts.push(shell_quote(&format!("{}={}", key, value)));
            }
        }

        for arg in &self.argv {
            parts.push(shell_quote(arg));
        }

        parts.join(" ")
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':' | '@' | '%' | '+' | ',')
}

/// Quote one word for the shell.
///
/// Words made of safe characters pass through untouched; everything else
/// is single-quoted with embedded single quotes escaped as `'\''`.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_safe_char) {
        return word.to_string();
    }
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('\'');
    for c in word.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
