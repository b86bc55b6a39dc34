// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider strategies.
//!
//! One strategy per supported CLI. A strategy knows how to start its
//! provider (command + env), how to read its terminal UI (status and
//! event extraction from capture diffs), how to feed it input, and how
//! to ask it to quit. Parsing is pattern-based; a line the strategy does
//! not recognize is preserved as an `unknown` event rather than dropped.

pub mod ansi;
mod claude;
mod codex;
mod opencode;
mod pi;

pub use claude::ClaudeCode;
pub use codex::Codex;
pub use opencode::Opencode;
pub use pi::Pi;

use ah_core::config::ProviderConfig;
use ah_core::{AgentStatus, ProviderEvent};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// How many stripped lines of the capture tail status parsing examines.
const STATUS_TAIL_LINES: usize = 20;

/// Per-provider rules for command construction and output parsing.
pub trait ProviderStrategy: Send + Sync {
    /// Provider tag, e.g. `claude-code`.
    fn tag(&self) -> &'static str;

    /// Binary invoked when the config does not override `command`.
    fn default_command(&self) -> &'static str;

    /// argv for a new agent: base command, optional model, extra args.
    fn build_command(&self, config: &ProviderConfig, model: Option<&str>) -> Vec<String> {
        let mut argv = vec![config
            .command
            .clone()
            .unwrap_or_else(|| self.default_command().to_string())];
        if let Some(model) = model.or(config.model.as_deref()) {
            argv.push("--model".to_string());
            argv.push(model.to_string());
        }
        argv.extend(config.extra_args.iter().cloned());
        argv
    }

    /// Environment for a new agent: configured env, provider additions.
    fn build_env(&self, config: &ProviderConfig) -> BTreeMap<String, String> {
        config.env.clone()
    }

    /// Whether this provider can write status files the daemon reads.
    fn supports_internals(&self) -> bool {
        false
    }

    /// Env entries steering the provider's state files into `runtime_dir`.
    fn internals_env(&self, _runtime_dir: &Path) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether internals currently drive status for this agent.
    fn internals_backed(&self, session_file_exists: bool, _runtime_dir_set: bool) -> bool {
        session_file_exists
    }

    /// Derive a status from the tail of ANSI-stripped scrollback.
    /// Returns `Starting` when nothing matches.
    fn parse_status(&self, captured: &str) -> AgentStatus;

    /// Classify a capture diff line-by-line into provider events.
    fn parse_output_diff(&self, diff: &str) -> Vec<ProviderEvent>;

    /// Rewrite a message for injection. Default appends a newline.
    fn format_input(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    /// The text the provider treats as "quit".
    fn exit_command(&self) -> &'static str;

    /// Whether the stripped capture shows the provider's idle prompt.
    /// The manager uses this to decide the pane is ready for the task.
    fn is_idle_prompt(&self, stripped: &str) -> bool;
}

/// Substring pattern tables driving the shared UI parsing.
pub(crate) struct UiPatterns {
    pub idle: &'static [&'static str],
    pub busy: &'static [&'static str],
    pub permission: &'static [&'static str],
    pub question: &'static [&'static str],
    pub error: &'static [&'static str],
}

impl UiPatterns {
    fn any(haystack: &str, needles: &[&str]) -> bool {
        needles.iter().any(|n| haystack.contains(n))
    }
}

/// Shared status scan: strip, take the tail, match bottom-up.
///
/// Check order matters: a permission dialog overlays the idle prompt,
/// and error banners persist under a live prompt, so the more specific
/// states win.
pub(crate) fn parse_status_with(patterns: &UiPatterns, captured: &str) -> AgentStatus {
    let stripped = ansi::strip_ansi(captured);
    let tail = ansi::tail_lines(&stripped, STATUS_TAIL_LINES);

    for line in tail.iter().rev() {
        if UiPatterns::any(line, patterns.permission) || UiPatterns::any(line, patterns.question) {
            return AgentStatus::WaitingInput;
        }
        if UiPatterns::any(line, patterns.error) {
            return AgentStatus::Error;
        }
        if UiPatterns::any(line, patterns.busy) {
            return AgentStatus::Processing;
        }
        if UiPatterns::any(line, patterns.idle) {
            return AgentStatus::Idle;
        }
        if looks_like_shell_prompt(line) {
            return AgentStatus::Exited;
        }
    }

    AgentStatus::Starting
}

/// A shell prompt re-appearing in the pane means the provider exited.
///
/// Matches `user@host:~/dir$`-shaped tokens rather than any trailing
/// `$`/`%`, so progress output like "50%" is not mistaken for a prompt.
pub(crate) fn looks_like_shell_prompt(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(last) = trimmed.split_whitespace().last() else {
        return false;
    };
    if !(last.ends_with('$') || last.ends_with('%')) {
        return false;
    }
    if last.len() == 1 || last.contains('@') || last.contains(':') || last.contains('~') {
        return true;
    }
    // Bare "host%" prompts: a single token with no digits
    trimmed == last && !last.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn has_alphanumeric(line: &str) -> bool {
    line.chars().any(|c| c.is_alphanumeric())
}

/// Shared diff classification driver.
///
/// `classify` handles the provider-specific categories (tool start/end,
/// permission, question, completion, error); the driver applies the drop
/// rules and the text/unknown fallback to whatever is left.
pub(crate) fn parse_diff_with<F>(
    patterns: &UiPatterns,
    diff: &str,
    classify: F,
) -> Vec<ProviderEvent>
where
    F: Fn(&str) -> Option<ProviderEvent>,
{
    let stripped = ansi::strip_ansi(diff);
    let mut events = Vec::new();

    for raw in stripped.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(event) = classify(line) {
            events.push(event);
            continue;
        }
        // Prompt chrome and spinner frames carry no information
        if UiPatterns::any(line, patterns.idle) || UiPatterns::any(line, patterns.busy) {
            continue;
        }
        if has_alphanumeric(line) {
            events.push(ProviderEvent::Text {
                text: line.trim().to_string(),
            });
        } else {
            events.push(ProviderEvent::Unknown {
                raw: line.to_string(),
            });
        }
    }

    events
}

/// Maps provider tags to strategies.
#[derive(Clone)]
pub struct ProviderRegistry {
    strategies: HashMap<&'static str, Arc<dyn ProviderStrategy>>,
}

impl ProviderRegistry {
    /// Registry with all built-in providers.
    pub fn builtin() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        registry.register(Arc::new(ClaudeCode));
        registry.register(Arc::new(Codex));
        registry.register(Arc::new(Pi));
        registry.register(Arc::new(Opencode));
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn ProviderStrategy>) {
        self.strategies.insert(strategy.tag(), strategy);
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ProviderStrategy>> {
        self.strategies.get(tag).cloned()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.strategies.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
