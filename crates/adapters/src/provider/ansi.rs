// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI escape stripping.
//!
//! One hand-written scan instead of chained regex passes. Handles CSI
//! (`ESC[…final`), OSC (`ESC]…BEL` or `ESC]…ESC\`), character-set
//! selection (`ESC(x` / `ESC)x`) and bare two-character escapes, and
//! folds non-breaking spaces to regular spaces.

/// Strip terminal escape sequences from captured scrollback.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek().copied() {
                Some('[') => {
                    chars.next();
                    // Parameter/intermediate bytes run until a final byte in @..~
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '\u{07}' {
                            break;
                        }
                        if next == '\u{1b}' {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                Some('(') | Some(')') => {
                    chars.next();
                    chars.next();
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\u{a0}' => out.push(' '),
            _ => out.push(c),
        }
    }

    out
}

/// The last `n` lines of already-stripped output.
pub fn tail_lines(stripped: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = stripped.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

#[cfg(test)]
#[path = "ansi_tests.rs"]
mod tests;
