//! Input normalization
//!
//! Converts raw collections (plain values or structured records) into the
//! uniform record shape the index consumes, and owns the text folding rules
//! shared by indexing and query handling.

use crate::error::TypeaheadError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A uniform record: an opaque mapping of field name to JSON value
pub type Record = Map<String, Value>;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Normalize a sequence of raw items into uniform records.
///
/// Structured items are validated to already carry the identifier field and
/// passed through unchanged. Plain values are wrapped into a record holding
/// the value (or its JSON serialization, for non-strings) under the
/// identifier field.
pub fn normalize(items: &[Value], identifier: &str) -> Result<Vec<Record>, TypeaheadError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    if items[0].is_object() {
        // pre-structured input: every record must carry the identifier
        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item.as_object() {
                Some(map) if map.contains_key(identifier) => records.push(map.clone()),
                _ => {
                    return Err(TypeaheadError::MissingIdentifier {
                        field: identifier.to_string(),
                        index,
                    })
                }
            }
        }
        return Ok(records);
    }

    Ok(items
        .iter()
        .map(|item| {
            let mut record = Map::new();
            record.insert(
                identifier.to_string(),
                Value::String(scalar_to_string(item)),
            );
            record
        })
        .collect())
}

/// Deterministic string form of a scalar value
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Display string of a record under `field` (empty if the field is absent)
pub fn display_string(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Collapse internal whitespace runs to single spaces and trim
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RUNS.replace_all(input, " ").trim().to_string()
}

/// Strip diacritics: NFD decomposition with combining marks removed
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Fold a token or query for index matching
pub fn fold(input: &str, fold_diacritics: bool) -> String {
    let lowered = input.to_lowercase();
    if fold_diacritics {
        strip_diacritics(&lowered)
    } else {
        lowered
    }
}
