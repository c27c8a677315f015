//! Parsing of the `--vars` string into template variables.
//!
//! Two syntaxes are accepted and the choice is made by looking at the first
//! character only, without trimming:
//! - starts with `{`: a JSON object; values keep their JSON type
//! - anything else: comma-separated `key=value` pairs; values are strings
//!
//! In the pair form each pair is split on its first `=`, key and value are
//! trimmed, and pairs without `=` are dropped without error. Later keys
//! overwrite earlier ones in both forms.

use promptvault_core::{AppError, AppResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// Template variables, ordered by name.
pub type Variables = BTreeMap<String, Value>;

/// Parse a raw variable string.
///
/// # Example
/// ```
/// use promptvault_prompt::parse_vars;
///
/// let vars = parse_vars("name=World, lang = en").unwrap();
/// assert_eq!(vars["name"], "World");
/// assert_eq!(vars["lang"], "en");
/// ```
pub fn parse_vars(raw: &str) -> AppResult<Variables> {
    if raw.is_empty() {
        return Ok(Variables::new());
    }

    if raw.starts_with('{') {
        return parse_json(raw);
    }

    Ok(parse_pairs(raw))
}

fn parse_json(raw: &str) -> AppResult<Variables> {
    let object: serde_json::Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| AppError::MalformedVariables(e.to_string()))?;

    Ok(object.into_iter().collect())
}

fn parse_pairs(raw: &str) -> Variables {
    let mut vars = Variables::new();

    for pair in raw.split(',') {
        match pair.split_once('=') {
            Some((key, value)) => {
                vars.insert(
                    key.trim().to_string(),
                    Value::String(value.trim().to_string()),
                );
            }
            None => {
                if !pair.trim().is_empty() {
                    tracing::debug!("Ignoring variable without '=': {:?}", pair.trim());
                }
            }
        }
    }

    vars
}
