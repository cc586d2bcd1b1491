//! Best-effort repair of free-form classifier output into one JSON object.
//!
//! The service is asked for a bare JSON object but regularly wraps it in
//! prose or markdown fences, nests it, or leaves trailing commas behind.
//! [`repair_json`] applies a fixed sequence of heuristics:
//!
//! 1. Slice from the first `{` to the last `}`
//! 2. Failing that, look inside a fenced code block
//! 3. If several objects remain, keep the innermost `{ ... }` pair
//! 4. Drop trailing commas and collapse repeated commas
//! 5. Parse with `serde_json`
//!
//! This is not a general JSON parser; it assumes the service meant to emit a
//! single flat object.

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum characters of cleaned text kept on a parse error.
const ERROR_PREVIEW_CHARS: usize = 500;

/// Failure to recover a JSON object from a response.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("No JSON object found in response")]
    NoJson,

    #[error("Invalid JSON after repair ({message}): {cleaned}")]
    Parse { cleaned: String, message: String },
}

impl RepairError {
    /// The cleaned text that failed to parse, if repair got that far.
    pub fn cleaned_text(&self) -> Option<&str> {
        match self {
            RepairError::Parse { cleaned, .. } => Some(cleaned),
            RepairError::NoJson => None,
        }
    }
}

/// Recover a JSON object from raw service output.
pub fn repair_json(raw: &str) -> Result<Map<String, Value>, RepairError> {
    let sliced = locate_object(raw).ok_or(RepairError::NoJson)?;
    let isolated = isolate_innermost(sliced);
    let cleaned = strip_stray_commas(isolated);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RepairError::Parse {
            cleaned: preview(&cleaned),
            message: format!("expected an object, found {}", json_kind(&other)),
        }),
        Err(e) => Err(RepairError::Parse {
            cleaned: preview(&cleaned),
            message: e.to_string(),
        }),
    }
}

/// Steps 1 and 2: brace span of the whole text, else of a fenced block.
fn locate_object(text: &str) -> Option<&str> {
    brace_span(text).or_else(|| extract_from_code_block(text).and_then(brace_span))
}

/// Slice from the first `{` to the last `}` inclusive.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Contents of the first fenced code block (```` ```json ```` or bare).
fn extract_from_code_block(text: &str) -> Option<&str> {
    let patterns = ["```json\n", "```json\r\n", "```json", "```\n", "```\r\n"];

    for pattern in patterns {
        if let Some(start) = text.find(pattern) {
            let body_start = start + pattern.len();
            let body = &text[body_start..];
            return Some(match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            });
        }
    }
    None
}

/// Step 3: with more than one `{`, keep the last `{` and its nearest `}`.
fn isolate_innermost(text: &str) -> &str {
    if text.matches('{').count() <= 1 {
        return text;
    }

    let Some(inner_start) = text.rfind('{') else {
        return text;
    };
    match text[inner_start..].find('}') {
        Some(offset) => &text[inner_start..=inner_start + offset],
        None => text,
    }
}

/// Step 4: remove commas directly before `}`/`]` and collapse `,,`.
///
/// Commas inside string literals are preserved.
fn strip_stray_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => match next_significant(&chars, i + 1) {
                Some('}') | Some(']') | Some(',') => {}
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

/// Next non-whitespace character at or after `from`.
fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= ERROR_PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
        format!("{}...", head)
    }
}
