//! Core domain types: records, flow units, and their attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded structured record. Field presence defines the record's schema.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// String attributes carried alongside a flow unit's content.
pub type Attributes = BTreeMap<String, String>;

/// Attribute holding the number of records in an output unit.
pub const RECORD_COUNT_ATTRIBUTE: &str = "record.count";

/// Attribute holding the content type written by the record writer.
pub const MIME_TYPE_ATTRIBUTE: &str = "mime.type";

// ---------------------------------------------------------------------------
// FlowId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for flow unit identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub Uuid);

impl FlowId {
    /// Generate a new time-sortable flow unit identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FlowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// FlowUnit
// ---------------------------------------------------------------------------

/// One unit of work: a batch of encoded records plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowUnit {
    /// Unique identifier for this unit.
    pub id: FlowId,
    /// Attributes describing the content.
    pub attributes: Attributes,
    /// Encoded record content.
    pub content: Vec<u8>,
}

impl FlowUnit {
    /// Create a new unit with a fresh identifier.
    pub fn new(attributes: Attributes, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: FlowId::new(),
            attributes,
            content: content.into(),
        }
    }

    /// Create a child unit that inherits this unit's attributes.
    pub fn child(&self, content: impl Into<Vec<u8>>) -> Self {
        Self::new(self.attributes.clone(), content)
    }

    /// Set an attribute, returning the updated unit.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Number of records as recorded in [`RECORD_COUNT_ATTRIBUTE`], if set.
    pub fn record_count(&self) -> Option<u64> {
        self.attributes
            .get(RECORD_COUNT_ATTRIBUTE)
            .and_then(|v| v.parse().ok())
    }
}
