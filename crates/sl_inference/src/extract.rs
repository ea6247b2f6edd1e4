//! Pulling JSON out of free-form model output.
//!
//! Models wrap their answer in markdown fences or add a sentence before and
//! after it. Both extractors first try the whole text, then fall back to the
//! widest bracketed span (first opening bracket to last closing one).

use serde_json::{Map, Value};

pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(items);
    }
    match serde_json::from_str::<Value>(bracketed(text, '[', ']')?) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(map);
    }
    match serde_json::from_str::<Value>(bracketed(text, '{', '}')?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn bracketed(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
