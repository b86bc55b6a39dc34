// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture diffing.
//!
//! Two successive pane captures overlap: the new capture repeats the old
//! one's tail (the scrollback window slides) and appends fresh output.
//! The diff is the fresh part — found by matching the longest suffix of
//! the old capture inside the new one. This is an approximation used
//! only for event extraction; users typing into the shared pane can make
//! it imprecise and that is acceptable.

/// New text in `new` relative to `old`.
pub fn capture_diff(old: &str, new: &str) -> String {
    if old.is_empty() {
        return new.to_string();
    }
    if new == old {
        return String::new();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    if old_lines.is_empty() {
        return new.to_string();
    }

    // For each possible end position in `new`, count how many trailing
    // lines match the old capture's tail; the longest match anchors
    // where the fresh output begins.
    let mut best_end = 0;
    let mut best_len = 0;
    for end in (1..=new_lines.len()).rev() {
        let mut k = 0;
        while k < end && k < old_lines.len() && new_lines[end - 1 - k] == old_lines[old_lines.len() - 1 - k]
        {
            k += 1;
        }
        if k > best_len {
            best_len = k;
            best_end = end;
        }
        if best_len == old_lines.len() {
            break;
        }
    }

    if best_len == 0 {
        // No suffix anchor. A rewritten last line (spinner frames) still
        // shares a line prefix with the old capture; past that, the pane
        // was cleared or replaced and the whole capture is fresh.
        let common = old_lines
            .iter()
            .zip(&new_lines)
            .take_while(|(a, b)| a == b)
            .count();
        if common > 0 && common < new_lines.len() {
            return new_lines[common..].join("\n");
        }
        return new.to_string();
    }

    new_lines[best_end..].join("\n")
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
