//! Correct-answer detection for raw option strings.
//!
//! The model marks correct options inline (`"Paris (correct)"`). Everything else in the
//! pipeline goes through `parse_option` / `mark_correct`, so swapping the convention only
//! touches this file.

use regex::Regex;
use std::sync::OnceLock;

pub const CORRECT_MARKER: &str = "(correct)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedOption {
    pub text: String,
    pub is_correct: bool,
}

/// Split a raw option into its display text and correctness flag.
pub fn parse_option(raw: &str) -> MarkedOption {
    let re = marker_regex();
    MarkedOption {
        text: collapse_spaces(&re.replace_all(raw, "")),
        is_correct: re.is_match(raw),
    }
}

pub fn is_marked_correct(raw: &str) -> bool {
    marker_regex().is_match(raw)
}

/// Render an option in the wire convention the model is asked to follow.
pub fn mark_correct(text: &str) -> String {
    format!("{} {}", text.trim(), CORRECT_MARKER)
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)\(correct\)").expect("static marker pattern"))
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
