//! Pull a JSON object out of free-form model text.
//!
//! Models asked for "JSON only" still wrap answers in prose or code fences
//! now and then. Three strategies are tried in order:
//!
//! 1. the whole (trimmed) text is a JSON object, the normal case when the
//!    provider honoured the JSON response format;
//! 2. the first *balanced* `{ … }` span that parses as an object, scanning
//!    with string/escape awareness so braces inside values do not count;
//! 3. the greedy span from the first `{` to the last `}`, which tolerates a
//!    model that forgets a closing brace inside prose but ends the object.
//!
//! Failures keep the raw text so a misbehaving prompt can be diagnosed.

use crate::error::InvoiceError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static RE_GREEDY_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\{[\s\S]*\})").expect("static regex"));

/// Extract and parse the first JSON object embedded in `raw`.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, InvoiceError> {
    let text = raw.trim();

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) {
        return Ok(obj);
    }

    for span in balanced_spans(text) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(span) {
            debug!("Parsed balanced JSON span of {} bytes", span.len());
            return Ok(obj);
        }
    }

    let greedy = RE_GREEDY_OBJECT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| InvoiceError::NoJsonFound {
            raw: raw.to_string(),
        })?;

    match serde_json::from_str::<Value>(greedy) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(InvoiceError::InvalidJson {
            detail: format!("expected an object, found {}", json_type(&other)),
            raw: raw.to_string(),
        }),
        Err(e) => Err(InvoiceError::InvalidJson {
            detail: e.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Every top-level balanced `{ … }` span in `text`, left to right.
fn balanced_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut from = 0usize;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        match closing_brace(&text[start..]) {
            Some(end) => {
                spans.push(&text[start..=start + end]);
                from = start + end + 1;
            }
            // Unclosed: the brace was prose, retry from the next one.
            None => from = start + 1,
        }
    }
    spans
}

/// Byte offset of the `}` closing the `{` that starts `text`.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ignores_surrounding_prose() {
        let raw = r#"Here is the result: {"Invoice": {"InvoiceData": {"InvoiceNumber": "abc123"}}} Thanks"#;
        let obj = extract_json_object(raw).unwrap();
        assert_eq!(
            Value::Object(obj),
            json!({"Invoice": {"InvoiceData": {"InvoiceNumber": "abc123"}}})
        );
    }

    #[test]
    fn plain_json_response() {
        let obj = extract_json_object("  {\"quantity\": \"True\"}\n").unwrap();
        assert_eq!(obj["quantity"], "True");
    }

    #[test]
    fn code_fenced_response() {
        let raw = "```json\n{\n  \"purchase_date\": \"False\"\n}\n```";
        let obj = extract_json_object(raw).unwrap();
        assert_eq!(obj["purchase_date"], "False");
    }

    #[test]
    fn braces_inside_strings_do_not_split_spans() {
        let raw = r#"Result {"ProductDescription": "TIRE {SET} 4x }", "Quantity": "4"} done {x}"#;
        let obj = extract_json_object(raw).unwrap();
        assert_eq!(obj["ProductDescription"], "TIRE {SET} 4x }");
    }

    #[test]
    fn first_valid_object_wins_over_later_ones() {
        let raw = r#"{"a": 1} and then {"b": 2}"#;
        let obj = extract_json_object(raw).unwrap();
        assert!(obj.contains_key("a"));
        assert!(!obj.contains_key("b"));
    }

    #[test]
    fn stray_open_brace_in_prose_is_skipped() {
        let obj = extract_json_object(r#"say "{" then {"q":"True"}"#).unwrap();
        assert_eq!(obj["q"], "True");

        let obj = extract_json_object(r#"use { to open, result: {"quantity": "False"}"#).unwrap();
        assert_eq!(obj["quantity"], "False");
    }

    #[test]
    fn no_braces_is_no_json_found() {
        let err = extract_json_object("I could not read the invoice.").unwrap_err();
        match err {
            InvoiceError::NoJsonFound { raw } => assert!(raw.contains("could not read")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn broken_object_is_invalid_json_with_raw_text() {
        let raw = r#"Sure! {"Invoice": {"InvoiceData": "abc",}}"#;
        let err = extract_json_object(raw).unwrap_err();
        match err {
            InvoiceError::InvalidJson { raw: r, .. } => assert_eq!(r, raw),
            other => panic!("unexpected error: {other}"),
        }
    }
}
