// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle_prompt   = { "▌ Ask Codex to do anything\n⏎ send", AgentStatus::Idle },
    busy          = { "Working (12s · esc to interrupt)", AgentStatus::Processing },
    permission    = { "Allow command? [y/N]", AgentStatus::WaitingInput },
    stream_error  = { "ERROR: stream disconnected", AgentStatus::Error },
    nothing       = { "starting up", AgentStatus::Starting },
)]
fn status(captured: &str, expected: AgentStatus) {
    assert_eq!(Codex.parse_status(captured), expected);
}

#[test]
fn diff_shell_exec_round() {
    let events = Codex.parse_output_diff("$ cargo build\n└ Compiling ah-core v0.1.0\n");
    assert_eq!(
        events,
        vec![
            ProviderEvent::ToolStart {
                tool: "shell".to_string(),
                input: "cargo build".to_string(),
            },
            ProviderEvent::ToolEnd {
                tool: "shell".to_string(),
                output: "Compiling ah-core v0.1.0".to_string(),
            },
        ]
    );
}

#[test]
fn diff_completion_marker() {
    let events = Codex.parse_output_diff("• Completed in 8s\n");
    assert_eq!(events, vec![ProviderEvent::Completion]);
}

#[test]
fn diff_plain_text() {
    let events = Codex.parse_output_diff("I will start with the parser.\n");
    assert_eq!(
        events,
        vec![ProviderEvent::Text {
            text: "I will start with the parser.".to_string()
        }]
    );
}

#[test]
fn internals_backed_by_runtime_dir_alone() {
    assert!(Codex.internals_backed(false, true));
    assert!(Codex.internals_backed(true, false));
    assert!(!Codex.internals_backed(false, false));
}

#[test]
fn internals_env_sets_codex_home() {
    let env = Codex.internals_env(std::path::Path::new("/state/run/c1"));
    assert_eq!(env, vec![("CODEX_HOME".to_string(), "/state/run/c1".to_string())]);
}
