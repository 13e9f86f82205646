//! Structured-data parsing of structure documents.
//! Turns preprocessed text into a generic YAML tree and maps parser failures
//! to line-numbered errors. No file/folder semantics live here.

use log::debug;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::preprocess::preprocess;

/// Parses a raw structure document.
///
/// The text is run through [`preprocess`] first. An empty document parses to
/// `Value::Null`.
///
/// # Errors
/// * `Error::ParseError` carrying the 1-based line of the failure when the
///   YAML parser reports one
pub fn parse_document(text: &str) -> Result<Value> {
    let processed = preprocess(text);
    if processed.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_yaml::from_str(&processed).map_err(|e| {
        let line = e.location().map(|location| location.line());
        debug!("YAML parse failure at {:?}: {}", line, e);
        Error::ParseError {
            line,
            message: e.to_string(),
        }
    })
}

/// Extracts the top-level item list of a parsed document.
///
/// A sequence is the item list itself. A mapping holds it under `files` (or
/// `items`). Anything else has no item list.
pub fn item_list(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Sequence(items) => Some(items),
        Value::Mapping(map) => {
            let key = crate::constants::ITEM_LIST_KEYS
                .iter()
                .find(|key| map.contains_key(**key))?;
            map.get(*key).and_then(Value::as_sequence)
        }
        _ => None,
    }
}

/// Text form of a YAML value as used in names, contents and token values.
///
/// Null becomes the empty string, scalars their natural form, and
/// collections are re-serialized as block YAML.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Tagged(tagged) => value_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(value)
            .map(|text| text.trim_end_matches('\n').to_string())
            .unwrap_or_default(),
    }
}
