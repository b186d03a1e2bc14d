//! Built-in word table used when no provider answers.
//!
//! Only English <-> Finnish is covered. The reverse direction is derived from
//! the forward table on every lookup; when two English words share a Finnish
//! word the later entry wins (`hei` maps back to `bye`).

use std::collections::HashMap;

const SOURCE_LANG: &str = "en";
const TARGET_LANG: &str = "fi";

const FORWARD: &[(&str, &str)] = &[
    ("hello", "hei"),
    ("welcome", "tervetuloa"),
    ("world", "maailma"),
    ("good", "hyvä"),
    ("morning", "aamu"),
    ("thanks", "kiitos"),
    ("bye", "hei"),
    ("yes", "kyllä"),
    ("no", "ei"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Lexicon;

impl Lexicon {
    pub fn supports(&self, source: &str, target: &str) -> bool {
        direction(source, target).is_some()
    }

    /// Word-by-word substitution. Never fails; unsupported pairs get the input back.
    pub fn lookup(&self, text: &str, source: &str, target: &str) -> String {
        let table: HashMap<&str, &str> = match direction(source, target) {
            Some(Direction::Forward) => FORWARD.iter().copied().collect(),
            Some(Direction::Reverse) => FORWARD.iter().map(|&(en, fi)| (fi, en)).collect(),
            None => return text.to_owned(),
        };

        // Attached punctuation stays on the word, so "hello," is not matched.
        let normalized = text.trim().to_lowercase();
        normalized
            .split_whitespace()
            .map(|word| table.get(word).copied().unwrap_or(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn lookup(text: &str, source: &str, target: &str) -> String {
    Lexicon.lookup(text, source, target)
}

fn direction(source: &str, target: &str) -> Option<Direction> {
    match (source, target) {
        (SOURCE_LANG, TARGET_LANG) => Some(Direction::Forward),
        (TARGET_LANG, SOURCE_LANG) => Some(Direction::Reverse),
        _ => None,
    }
}
