// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn cmd(argv: &[&str]) -> WindowCommand {
    WindowCommand::new(argv.iter().map(|s| s.to_string()).collect())
}

#[yare::parameterized(
    plain_word    = { "claude", "claude" },
    path          = { "/usr/bin/codex", "/usr/bin/codex" },
    flag          = { "--model=o4", "--model=o4" },
    with_space    = { "hello world", "'hello world'" },
    with_quote    = { "it's", "'it'\\''s'" },
    empty         = { "", "''" },
    dollar        = { "$HOME", "'$HOME'" },
)]
fn quoting(input: &str, expected: &str) {
    assert_eq!(shell_quote(input), expected);
}

#[test]
fn bare_argv_has_no_env_prefix() {
    assert_eq!(cmd(&["claude", "--continue"]).shell_string(), "claude --continue");
}

#[test]
fn env_entries_are_sorted_by_key() {
    let mut env = BTreeMap::new();
    env.insert("ZED".to_string(), "1".to_string());
    env.insert("ALPHA".to_string(), "two words".to_string());
    let rendered = cmd(&["codex"]).with_env(env).shell_string();
    assert_eq!(rendered, "env 'ALPHA=two words' ZED=1 codex");
}

#[test]
fn unset_keys_are_deduped_and_sorted() {
    let rendered = cmd(&["pi"])
        .with_unset_env(vec![
            "PATH2".to_string(),
            "ANTHROPIC_API_KEY".to_string(),
            "PATH2".to_string(),
        ])
        .shell_string();
    assert_eq!(rendered, "env -u ANTHROPIC_API_KEY -u PATH2 pi");
}

#[test]
fn full_composition_is_deterministic() {
    let mut env = BTreeMap::new();
    env.insert("B".to_string(), "2".to_string());
    env.insert("A".to_string(), "1".to_string());
    let command = cmd(&["claude", "--model", "opus 4"])
        .with_env(env)
        .with_unset_env(vec!["X".to_string()]);
    let first = command.shell_string();
    assert_eq!(first, "env -u X A=1 B=2 claude --model 'opus 4'");
    assert_eq!(command.shell_string(), first);
}
