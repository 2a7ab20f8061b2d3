//! Lenient parsing of free-form backend responses.
//!
//! Backends are asked for JSON but nothing enforces it. Parsing is a chain
//! of stages tried left to right: the whole text as JSON, then the first
//! balanced `{...}` substring that parses, then the catch-all default.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use tabcatalog_shared::CategorizationResult;

/// Separator between a parent category and a nested subcategory.
pub const SUBCATEGORY_SEPARATOR: &str = " > ";

/// Which stage of the chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Strict,
    Extracted,
    Fallback,
}

impl ParseStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Extracted => "extracted",
            Self::Fallback => "fallback",
        }
    }
}

/// Outcome of [`parse_categories`].
#[derive(Debug, Clone)]
pub struct ParsedCategories {
    pub result: CategorizationResult,
    pub stage: ParseStage,
    /// Indices dropped because they were out of range.
    pub dropped: usize,
}

/// Interpret `text` as a category → indices mapping over `tab_count` tabs.
///
/// Never fails: when neither JSON stage yields a usable object the result
/// is a single fallback category spanning `0..tab_count`.
pub fn parse_categories(text: &str, tab_count: usize) -> ParsedCategories {
    if let Some((result, dropped)) = parse_strict(text, tab_count) {
        return ParsedCategories {
            result,
            stage: ParseStage::Strict,
            dropped,
        };
    }

    if let Some((result, dropped)) = parse_extracted(text, tab_count) {
        debug!("categories recovered from embedded JSON");
        return ParsedCategories {
            result,
            stage: ParseStage::Extracted,
            dropped,
        };
    }

    warn!(
        response_len = text.len(),
        "backend response had no usable JSON object, using fallback category"
    );
    ParsedCategories {
        result: CategorizationResult::fallback(tab_count),
        stage: ParseStage::Fallback,
        dropped: 0,
    }
}

fn parse_strict(text: &str, tab_count: usize) -> Option<(CategorizationResult, usize)> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    categories_from_value(&value, tab_count)
}

fn parse_extracted(text: &str, tab_count: usize) -> Option<(CategorizationResult, usize)> {
    balanced_spans(text, '{', '}').find_map(|candidate| {
        let value: Value = serde_json::from_str(candidate).ok()?;
        categories_from_value(&value, tab_count)
    })
}

/// Build a result from a JSON object. Returns `None` for non-objects and
/// for objects that assign no in-range index at all.
fn categories_from_value(value: &Value, tab_count: usize) -> Option<(CategorizationResult, usize)> {
    let object = value.as_object()?;
    let mut result = CategorizationResult::new(tab_count);
    let dropped = flatten_into(&mut result, object, None);

    if result.is_empty() {
        return None;
    }
    if dropped > 0 {
        debug!(dropped, "out-of-range indices dropped");
    }
    Some((result, dropped))
}

fn flatten_into(
    result: &mut CategorizationResult,
    object: &Map<String, Value>,
    parent: Option<&str>,
) -> usize {
    let mut dropped = 0;
    for (key, value) in object {
        let label = match parent {
            Some(parent) => format!("{parent}{SUBCATEGORY_SEPARATOR}{}", key.trim()),
            None => key.trim().to_string(),
        };
        match value {
            Value::Array(items) => {
                let indices = items
                    .iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|i| usize::try_from(i).ok());
                dropped += result.add(label, indices);
            }
            Value::Object(children) => {
                dropped += flatten_into(result, children, Some(&label));
            }
            // A bare index is as good as a one-element list.
            Value::Number(n) => {
                if let Some(i) = n.as_u64().and_then(|i| usize::try_from(i).ok()) {
                    dropped += result.add(label, [i]);
                }
            }
            _ => {}
        }
    }
    dropped
}

/// Parse a JSON array of tags: the whole text, then the first balanced
/// `[...]` that parses, then nothing.
pub fn parse_tags(text: &str) -> Vec<String> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text.trim()) {
        return strings_of(&items);
    }

    balanced_spans(text, '[', ']')
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Array(items)) => Some(strings_of(&items)),
            _ => None,
        })
        .unwrap_or_default()
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Balanced-span scanning
// ---------------------------------------------------------------------------

/// Every substring starting at an `open` delimiter and ending at its
/// balanced `close`, in order of the opening position. Delimiters inside
/// JSON string literals are ignored.
fn balanced_spans(text: &str, open: char, close: char) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(move |&(_, c)| c == open)
        .filter_map(move |(start, _)| {
            balanced_end(&text[start..], open, close).map(|end| &text[start..start + end])
        })
}

/// Byte length of the balanced span at the start of `text`, if it closes.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
