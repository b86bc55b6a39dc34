// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults() {
    let config = AhConfig::default();
    assert_eq!(config.port, 7070);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.mux_prefix, "ah");
    assert_eq!(config.poll_interval_ms, 1000);
    assert_eq!(config.capture_lines, 500);
    assert_eq!(config.max_event_history, 10_000);
    assert!(config.auth.token.is_none());
}

#[yare::parameterized(
    poll_low   = { "pollIntervalMs = 5", 100 },
    poll_high  = { "pollIntervalMs = 99999", 30_000 },
    poll_in    = { "pollIntervalMs = 250", 250 },
)]
fn poll_interval_clamps(toml: &str, expected: u64) {
    let config = AhConfig::from_toml(toml).unwrap();
    assert_eq!(config.poll_interval_ms, expected);
}

#[test]
fn capture_and_history_clamp() {
    let config = AhConfig::from_toml("captureLines = 1\nmaxEventHistory = 5").unwrap();
    assert_eq!(config.capture_lines, 10);
    assert_eq!(config.max_event_history, 100);
}

#[test]
fn unknown_log_level_falls_back() {
    let config = AhConfig::from_toml("logLevel = \"loud\"").unwrap();
    assert_eq!(config.log_level, "info");
}

#[test]
fn provider_table_parses() {
    let toml = r#"
[providers.codex]
command = "codex"
extraArgs = ["--sandbox", "workspace-write"]
model = "o4"

[providers.pi]
enabled = false
"#;
    let config = AhConfig::from_toml(toml).unwrap();
    let codex = config.provider("codex").unwrap();
    assert_eq!(codex.command.as_deref(), Some("codex"));
    assert_eq!(codex.extra_args.len(), 2);
    assert_eq!(codex.model.as_deref(), Some("o4"));
    // disabled providers are hidden
    assert!(config.provider("pi").is_none());
    assert!(config.provider("unknown").is_none());
}

#[test]
fn auth_token_parses() {
    let config = AhConfig::from_toml("[auth]\ntoken = \"s3cret\"").unwrap();
    assert_eq!(config.auth.token.as_deref(), Some("s3cret"));
}
