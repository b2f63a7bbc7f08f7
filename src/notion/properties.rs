//! Notion property value shapes.
use crate::util::chunk_chars;
use serde_json::{json, Value};

/// Notion rejects rich-text items longer than this.
pub const RICH_TEXT_LIMIT: usize = 2000;

/// Rich-text segments, split so every item fits the API limit.
pub fn text_segments(content: &str) -> Vec<Value> {
    chunk_chars(content, RICH_TEXT_LIMIT)
        .into_iter()
        .map(|chunk| json!({"type": "text", "text": {"content": chunk}}))
        .collect()
}

pub fn rich_text(content: &str) -> Value {
    json!({"rich_text": text_segments(content)})
}

pub fn title(content: &str) -> Value {
    json!({"title": text_segments(content)})
}

pub fn status(name: &str) -> Value {
    json!({"status": {"name": name}})
}

pub fn select(name: &str) -> Value {
    json!({"select": {"name": name}})
}

pub fn number(value: f64) -> Value {
    json!({"number": value})
}
