//! Small text helpers shared by the profiler, pipeline and directive parser.

/// Remove markdown code-fence markers (```` ```json ```` and ```` ``` ````) and trim.
///
/// Model output that wraps JSON in a fenced block is the common case; the fences are
/// removed wherever they appear, not only at the edges.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Number of characters (not bytes) after trimming surrounding whitespace.
pub fn trimmed_char_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `Some(trimmed)` when the value has visible content.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
