//! Recovery of a JSON object from free-form agent text.
//!
//! The parsing agent is asked for bare JSON but occasionally wraps it in
//! prose or a markdown fence. The scan takes the first balanced `{...}`
//! span (counting braces, not string-aware) and parses it; if that fails,
//! the whole trimmed string is parsed as a last resort.

use serde_json::{Map, Value};

/// Extract the first JSON object embedded in `text`, if any.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(start) = text.find('{') {
        let mut depth = 0i32;
        for (offset, c) in text[start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let span = &text[start..start + offset + 1];
                        match serde_json::from_str::<Value>(span) {
                            Ok(Value::Object(map)) => return Some(map),
                            _ => break,
                        }
                    }
                }
                _ => {}
            }
        }
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
