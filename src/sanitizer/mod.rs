//! Output sanitizer for conversational replies.
//!
//! The conversational model embeds control directives and occasionally leaks its
//! instructions. Before a reply is shown, everything from an internal marker to the
//! end of its line is cut, along with bracket-only lines, horizontal rules and
//! `**INSTRUCTIONS ...**` spans. Reports are never sanitized.
//!
//! `sanitize` is idempotent: passes are repeated until the text stops changing.

use regex::Regex;
use std::sync::LazyLock;

/// Markers that start internal content; the rest of the line is dropped.
const LINE_MARKERS: &[&str] = &[
    "METADATA:",
    "DIRECTIVES:",
    "INSTRUCTIONS FOR",
    "SYSTEM STATUS:",
    "thought_process:",
    "User's Hiden Intent:",
    "User's Hidden Intent:",
];

static INSTRUCTION_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*INSTRUCTIONS.*?\*\*").expect("valid regex"));

static BRACKET_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[.*\]\s*$").expect("valid regex"));

static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("valid regex"));

pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(text: &str) -> String {
    let without_spans = INSTRUCTION_SPAN.replace_all(text, "");

    without_spans
        .lines()
        .filter_map(clean_line)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `None` drops the line entirely.
fn clean_line(line: &str) -> Option<&str> {
    let line = match LINE_MARKERS.iter().filter_map(|m| line.find(m)).min() {
        Some(pos) => {
            let prefix = &line[..pos];
            // Only decoration before the marker: drop the whole line
            if prefix
                .chars()
                .all(|c| c.is_whitespace() || matches!(c, '[' | '*' | '(' | '>' | '-'))
            {
                return None;
            }
            prefix.trim_end()
        }
        None => line,
    };

    if BRACKET_ONLY.is_match(line) || HORIZONTAL_RULE.is_match(line) {
        return None;
    }

    Some(line)
}
