//! The lookup capability contract.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use multilookup_shared::{Attributes, Result};

/// Lookup inputs keyed by coordinate name. A coordinate whose source path
/// selected no field is `Value::Null`.
pub type Coordinates = BTreeMap<String, Value>;

/// A pluggable key-based lookup backend.
///
/// Implementations are shared across concurrently running batches, so they
/// must be safe to call from several threads at once. Calls block the
/// calling batch until they return; any timeout or retry policy belongs to
/// the implementation.
pub trait LookupService: Send + Sync {
    /// Coordinate names every operation bound to this service must supply.
    fn required_keys(&self) -> BTreeSet<String>;

    /// Resolve `coordinates` to a value.
    ///
    /// `context` carries the attributes of the batch being processed.
    /// Returns `Ok(None)` when the backend has no value to offer and
    /// [`MultiLookupError::Lookup`] when it cannot resolve the coordinates.
    ///
    /// [`MultiLookupError::Lookup`]: multilookup_shared::MultiLookupError::Lookup
    fn lookup(&self, coordinates: &Coordinates, context: &Attributes) -> Result<Option<Value>>;
}

/// String form of a coordinate value, or `None` for null.
pub fn coordinate_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coordinate_text_forms() {
        assert_eq!(coordinate_text(&json!("John")), Some("John".to_string()));
        assert_eq!(coordinate_text(&json!(42)), Some("42".to_string()));
        assert_eq!(coordinate_text(&json!(true)), Some("true".to_string()));
        assert_eq!(coordinate_text(&Value::Null), None);
    }
}
