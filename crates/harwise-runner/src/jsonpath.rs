use crate::{Error, Result};
use jsonpath_rust::JsonPathFinder;
use serde_json::Value;

/// Evaluate a JSONPath query and return its result set.
///
/// A query that matches nothing yields an empty set; a malformed query is
/// an error.
pub fn query(data: &Value, path: &str) -> Result<Vec<Value>> {
    let finder = JsonPathFinder::from_str(&data.to_string(), path)
        .map_err(|e| Error::Assertion(format!("Invalid JSONPath '{}': {}", path, e)))?;

    Ok(match finder.find() {
        Value::Array(items) => items,
        Value::Null => vec![],
        other => vec![other],
    })
}
