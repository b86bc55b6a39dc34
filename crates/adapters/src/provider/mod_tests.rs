// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builtin_registry_has_all_providers() {
    let registry = ProviderRegistry::builtin();
    assert_eq!(registry.tags(), vec!["claude-code", "codex", "opencode", "pi"]);
    assert!(registry.get("claude-code").is_some());
    assert!(registry.get("gpt-terminal").is_none());
}

#[yare::parameterized(
    bash_prompt     = { "user@host:~/proj$", true },
    zsh_prompt      = { "host%", true },
    bare_dollar     = { "$", true },
    percent_number  = { "Downloading 50%", false },
    price           = { "costs 5$", false },
    plain           = { "hello", false },
)]
fn shell_prompt_detection(line: &str, expected: bool) {
    assert_eq!(looks_like_shell_prompt(line), expected);
}

#[test]
fn alphanumeric_split() {
    assert!(has_alphanumeric("x ─"));
    assert!(!has_alphanumeric("── ╮ ❯"));
}
