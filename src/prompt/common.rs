use crate::normalize::truncate_chars;

pub const TITLE_MAX_CHARS: usize = 200;
pub const URL_MAX_CHARS: usize = 500;
pub const TEXT_MAX_CHARS: usize = 8000;

// Voice shared by every prompt that produces training material.
pub const TRADE_VOICE: &str = r#"
You are helping experienced tradespeople pass their knowledge on to new journeymen.
What you write is a TRAINING AID: practical, short, and safety-first.
Write the way a calm senior tradesperson talks a new hand through a quick job card. No corporate tone.
"#;

pub const JSON_ONLY: &str = r#"
Return ONLY valid JSON. No markdown, no code fences, no text before or after the JSON.
"#;

/// Trims `value` and keeps at most `max_chars` characters of it. A missing
/// value becomes the empty string.
pub fn safe_slice(value: Option<&str>, max_chars: usize) -> String {
    truncate_chars(value.unwrap_or_default().trim(), max_chars)
}
