// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generated agent ids: `<provider>-<adjective>-<noun>`.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brave", "brisk", "calm", "clever", "cosmic", "crisp", "daring", "deft",
    "eager", "fleet", "gentle", "glad", "golden", "grand", "happy", "hardy", "keen", "kind",
    "lively", "lucid", "lunar", "merry", "mighty", "nimble", "noble", "polar", "proud", "quick",
    "quiet", "rapid", "royal", "rustic", "sharp", "silent", "sleek", "solar", "stable", "steady",
    "sturdy", "sunny", "swift", "tidy", "vivid", "wise", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "bee", "bison", "crane", "crow", "deer", "dove", "eagle", "falcon", "ferret",
    "finch", "fox", "gecko", "hare", "hawk", "heron", "ibex", "jay", "koala", "lark",
    "lemur", "llama", "lynx", "marmot", "marten", "mole", "moose", "newt", "otter", "owl",
    "panda", "pelican", "pika", "puffin", "quail", "raven", "robin", "seal", "shrew", "sparrow",
    "stork", "swan", "tapir", "tern", "toad", "vole", "wren", "yak",
];

/// Generate a fresh agent id for `provider`, avoiding ids for which
/// `taken` returns true.
///
/// On collision the base name gets a numeric suffix starting at 2; the
/// suffix counter never wraps within a process, so released names are
/// not reused.
pub fn generate_agent_id<R, F>(provider: &str, rng: &mut R, taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let base = format!("{}-{}-{}", provider, adjective, noun);
    if !taken(&base) {
        return base;
    }
    let mut k: u64 = 2;
    loop {
        let candidate = format!("{}-{}", base, k);
        if !taken(&candidate) {
            return candidate;
        }
        k += 1;
    }
}

#[cfg(test)]
#[path = "ident_tests.rs"]
mod tests;
