//! Built-in lookup backends.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use multilookup_shared::{Attributes, MultiLookupError, Result};

use crate::service::{Coordinates, LookupService, coordinate_text};

// ---------------------------------------------------------------------------
// ConstantLookup
// ---------------------------------------------------------------------------

/// Returns the same value for every lookup. Requires no coordinates.
#[derive(Debug, Clone)]
pub struct ConstantLookup {
    value: Value,
}

impl ConstantLookup {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl LookupService for ConstantLookup {
    fn required_keys(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn lookup(&self, _coordinates: &Coordinates, _context: &Attributes) -> Result<Option<Value>> {
        Ok(Some(self.value.clone()))
    }
}

// ---------------------------------------------------------------------------
// KeyValueLookup
// ---------------------------------------------------------------------------

/// Coordinate name used by [`KeyValueLookup`].
const KEY_COORDINATE: &str = "key";

/// Looks up the `key` coordinate in a fixed string table.
#[derive(Debug, Clone, Default)]
pub struct KeyValueLookup {
    entries: BTreeMap<String, String>,
}

impl KeyValueLookup {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl LookupService for KeyValueLookup {
    fn required_keys(&self) -> BTreeSet<String> {
        BTreeSet::from([KEY_COORDINATE.to_string()])
    }

    fn lookup(&self, coordinates: &Coordinates, _context: &Attributes) -> Result<Option<Value>> {
        let key = coordinates
            .get(KEY_COORDINATE)
            .and_then(coordinate_text)
            .ok_or_else(|| MultiLookupError::lookup("coordinate \"key\" is missing"))?;

        match self.entries.get(&key) {
            Some(value) => Ok(Some(Value::String(value.clone()))),
            None => Err(MultiLookupError::lookup(format!("no entry for key \"{key}\""))),
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateLookup
// ---------------------------------------------------------------------------

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid regex"));

/// Renders a `{placeholder}` template from the coordinates.
///
/// Every placeholder is a required key; a null coordinate fails the lookup.
#[derive(Debug, Clone)]
pub struct TemplateLookup {
    template: String,
    keys: BTreeSet<String>,
}

impl TemplateLookup {
    /// Build a template lookup. A template without placeholders is rejected.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let keys: BTreeSet<String> = PLACEHOLDER_RE
            .captures_iter(&template)
            .map(|caps| caps[1].to_string())
            .collect();
        if keys.is_empty() {
            return Err(MultiLookupError::config(format!(
                "template \"{template}\" has no {{placeholder}} names"
            )));
        }
        Ok(Self { template, keys })
    }
}

impl LookupService for TemplateLookup {
    fn required_keys(&self) -> BTreeSet<String> {
        self.keys.clone()
    }

    fn lookup(&self, coordinates: &Coordinates, _context: &Attributes) -> Result<Option<Value>> {
        let mut values = BTreeMap::new();
        for key in &self.keys {
            let text = coordinates
                .get(key)
                .and_then(coordinate_text)
                .ok_or_else(|| MultiLookupError::lookup(format!("coordinate \"{key}\" is null")))?;
            values.insert(key.as_str(), text);
        }

        let rendered = PLACEHOLDER_RE.replace_all(&self.template, |caps: &regex::Captures<'_>| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(Some(Value::String(rendered.into_owned())))
    }
}
