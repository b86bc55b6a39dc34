// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain           = { "hello", "hello" },
    sgr_color       = { "\u{1b}[31mred\u{1b}[0m", "red" },
    cursor_move     = { "\u{1b}[2J\u{1b}[1;1Hwiped", "wiped" },
    csi_private     = { "\u{1b}[?25lhidden\u{1b}[?25h", "hidden" },
    osc_bel         = { "\u{1b}]0;title\u{07}after", "after" },
    osc_st          = { "\u{1b}]8;;http://x\u{1b}\\link", "link" },
    charset         = { "\u{1b}(Btext\u{1b})0", "text" },
    two_char        = { "\u{1b}Mup", "up" },
    nbsp            = { "a\u{a0}b", "a b" },
    truncated_esc   = { "tail\u{1b}", "tail" },
    mixed           = { "\u{1b}[1m\u{1b}[32m> \u{1b}[0mready\u{a0}", "> ready " },
)]
fn strips(input: &str, expected: &str) {
    assert_eq!(strip_ansi(input), expected);
}

#[test]
fn stripping_is_idempotent() {
    let noisy = "\u{1b}[31m⏺ Bash(ls)\u{1b}[0m\n\u{1b}]0;t\u{07}  ⎿ ok";
    let once = strip_ansi(noisy);
    assert_eq!(strip_ansi(&once), once);
}

#[test]
fn tail_lines_returns_last_n() {
    let text = "a\nb\nc\nd";
    assert_eq!(tail_lines(text, 2), vec!["c", "d"]);
    assert_eq!(tail_lines(text, 10), vec!["a", "b", "c", "d"]);
}
