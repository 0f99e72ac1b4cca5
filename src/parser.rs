//! Extraction of fenced payloads from free oracle text.
//!
//! Two conventions are supported:
//!
//! - Plain fences: the payload sits strictly between the *first* and the
//!   *last* occurrence of a triple backtick. Used for segmentation.
//! - JSON fences: a triple backtick immediately followed by `json`, a JSON
//!   object, and a closing triple backtick. When a response carries several
//!   such blocks the *last* one is authoritative.
//!
//! Numbered keys (`"rule 1"`, `"rule 2"`, ...) are read contiguously from 1
//! and stop at the first gap.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ParseError;

/// The fence delimiter.
pub const FENCE: &str = "```";

static JSON_FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// A `json` fence up to the very next fence.
fn json_fence_pattern() -> &'static Regex {
    JSON_FENCE_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```json(.*?)```").expect("JSON fence pattern is valid")
    })
}

/// A decoded JSON object.
pub type JsonObject = Map<String, Value>;

/// Return the trimmed text between the first and last fence.
///
/// # Errors
///
/// [`ParseError::MissingDelimiter`] when there are fewer than two
/// non-overlapping fences.
pub fn extract_delimited(text: &str) -> Result<&str, ParseError> {
    let start = text.find(FENCE).ok_or(ParseError::MissingDelimiter)?;
    let end = text.rfind(FENCE).ok_or(ParseError::MissingDelimiter)?;
    if end < start + FENCE.len() {
        return Err(ParseError::MissingDelimiter);
    }
    Ok(text[start + FENCE.len()..end].trim())
}

/// Split a block into trimmed, non-empty lines.
#[must_use]
pub fn split_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// All fenced JSON object blocks, in order of appearance.
///
/// Each block ends at the first fence after its opening, so a truncated
/// draft never swallows a later block. Only payloads shaped `{...}` count.
#[must_use]
pub fn json_blocks(text: &str) -> Vec<&str> {
    json_fence_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|payload| payload.starts_with('{') && payload.ends_with('}'))
        .collect()
}

/// The last fenced JSON object block.
///
/// # Errors
///
/// [`ParseError::MissingJsonBlock`] when the text has none.
pub fn last_json_block(text: &str) -> Result<&str, ParseError> {
    json_blocks(text)
        .pop()
        .ok_or(ParseError::MissingJsonBlock)
}

/// Decode a block that must be a JSON object.
///
/// # Errors
///
/// [`ParseError::InvalidJson`] on decode failure and
/// [`ParseError::NotAnObject`] for any other JSON value.
pub fn parse_object(block: &str) -> Result<JsonObject, ParseError> {
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ParseError::NotAnObject),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

/// Decode the last fenced JSON object, returning the raw block as well.
///
/// # Errors
///
/// Propagates [`last_json_block`] and [`parse_object`] failures.
pub fn last_json_object(text: &str) -> Result<(&str, JsonObject), ParseError> {
    let block = last_json_block(text)?;
    let object = parse_object(block)?;
    Ok((block, object))
}

/// Values for `"{prefix} 1"`, `"{prefix} 2"`, ... until the first missing
/// index. For each index the prefixes are tried in order.
#[must_use]
pub fn numbered<'a>(object: &'a JsonObject, prefixes: &[&str]) -> Vec<&'a Value> {
    let mut values = Vec::new();
    for index in 1.. {
        let found = prefixes
            .iter()
            .find_map(|prefix| object.get(&format!("{prefix} {index}")));
        match found {
            Some(value) => values.push(value),
            None => break,
        }
    }
    values
}

/// Read a string field, returning `None` when absent or not a string.
#[must_use]
pub fn str_field<'a>(object: &'a JsonObject, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Read a list of indices. Accepts numbers and numeric strings; anything
/// else is dropped.
#[must_use]
pub fn index_list(value: Option<&Value>) -> Vec<usize> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}
