//! Turns whatever text the model produced into a complete [`JobCard`].
//!
//! Nothing in here fails. Fields the model got wrong are replaced one at a time
//! with the caller's fallback, so a reply that only gets a few fields right
//! still yields a usable card.

use serde_json::{Map, Value};
use tracing::debug;

use crate::job_card::{
    JobCard, SOURCE_TITLE_MAX_CHARS, SOURCE_URL_MAX_CHARS, TASK_NAME_MAX_CHARS,
};
use crate::TARGET_NORMALIZE;

/// Parses the model reply, falling back to the outermost `{...}` span when the
/// reply has prose or markup around the JSON. Returns `None` when neither
/// attempt yields JSON.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        debug!(target: TARGET_NORMALIZE, "Model reply parsed as JSON directly");
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        debug!(target: TARGET_NORMALIZE, "No braced span found in model reply");
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value) => {
            debug!(
                target: TARGET_NORMALIZE,
                "Recovered JSON from braced span at {}..={}", start, end
            );
            Some(value)
        }
        Err(e) => {
            debug!(target: TARGET_NORMALIZE, "Braced span is not valid JSON: {}", e);
            None
        }
    }
}

/// Merges an extraction result onto `fallback`, field by field.
pub fn validate_job_card(extracted: Option<Value>, fallback: &JobCard) -> JobCard {
    let obj = match extracted {
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            debug!(
                target: TARGET_NORMALIZE,
                "Extracted JSON is not an object ({}), using fallback",
                json_type_name(&other)
            );
            return fallback.clone();
        }
        None => {
            debug!(target: TARGET_NORMALIZE, "No structured data, using fallback");
            return fallback.clone();
        }
    };

    let task_name = string_field(&obj, "task_name", &fallback.task_name);
    let source_title = string_field(&obj, "source_title", &fallback.source_title);
    let source_url = string_field(&obj, "source_url", &fallback.source_url);

    JobCard {
        task_name: truncate_chars(&task_name, TASK_NAME_MAX_CHARS),
        source_title: truncate_chars(&source_title, SOURCE_TITLE_MAX_CHARS),
        source_url: truncate_chars(&source_url, SOURCE_URL_MAX_CHARS),
        when_to_use: string_field(&obj, "when_to_use", &fallback.when_to_use),
        tools_ppe: list_field(&obj, "tools_ppe", &fallback.tools_ppe),
        steps: list_field(&obj, "steps", &fallback.steps),
        safety_notes: list_field(&obj, "safety_notes", &fallback.safety_notes),
        common_mistakes: list_field(&obj, "common_mistakes", &fallback.common_mistakes),
        acceptance_checks: list_field(&obj, "acceptance_checks", &fallback.acceptance_checks),
        youtube_link: string_field(&obj, "youtube_link", &fallback.youtube_link),
        needs_review: match obj.get("needs_review") {
            Some(Value::Bool(flag)) => *flag,
            _ => fallback.needs_review,
        },
    }
}

/// Extracts and validates in one go.
pub fn normalize_response(text: &str, fallback: &JobCard) -> JobCard {
    validate_job_card(extract_json(text), fallback)
}

fn string_field(obj: &Map<String, Value>, key: &str, fallback: &str) -> String {
    let value = obj.get(key).map(stringify_value).unwrap_or_default();
    if value.is_empty() {
        if obj.contains_key(key) {
            debug!(target: TARGET_NORMALIZE, "Field '{}' is empty, using fallback", key);
        }
        fallback.to_string()
    } else {
        value
    }
}

fn list_field(obj: &Map<String, Value>, key: &str, fallback: &[String]) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(stringify_value)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(other) => {
            debug!(
                target: TARGET_NORMALIZE,
                "Field '{}' is {} rather than a list, using fallback",
                key,
                json_type_name(other)
            );
            clean_list(fallback)
        }
        None => clean_list(fallback),
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items.iter().filter(|s| !s.is_empty()).cloned().collect()
}

/// Text form of a JSON value. `null`, `false`, `0` and `""` all become the
/// empty string so callers can treat them as missing.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => String::new(),
            // Whole floats print without a fraction or exponent up to 1e21.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Keeps at most `max_chars` characters. Counts `char`s, so the cut never
/// splits a UTF-8 sequence, but it can land mid-word.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
