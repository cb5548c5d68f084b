//! Record path compilation and evaluation.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use multilookup_shared::{MultiLookupError, Record, Result};

/// One compiled step of a record path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Field(String),
    Index(usize),
}

/// A compiled record path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    text: String,
    steps: Vec<Step>,
}

impl RecordPath {
    /// Compile a path expression such as `/order/lines[0]/sku`.
    pub fn compile(text: &str) -> Result<Self> {
        static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([A-Za-z0-9_$@-]+)((?:\[[0-9]+\])*)$").expect("valid regex")
        });
        static INDEX_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\[([0-9]+)\]").expect("valid regex"));

        let body = text
            .strip_prefix('/')
            .ok_or_else(|| MultiLookupError::path_syntax(text, "path must start with '/'"))?;
        if body.is_empty() {
            return Err(MultiLookupError::path_syntax(text, "path selects no field"));
        }

        let mut steps = Vec::new();
        for segment in body.split('/') {
            let caps = SEGMENT_RE.captures(segment).ok_or_else(|| {
                MultiLookupError::path_syntax(text, format!("invalid segment \"{segment}\""))
            })?;
            steps.push(Step::Field(caps[1].to_string()));
            for index in INDEX_RE.captures_iter(&caps[2]) {
                let i = index[1].parse::<usize>().map_err(|e| {
                    MultiLookupError::path_syntax(text, format!("invalid index \"{}\": {e}", &index[1]))
                })?;
                steps.push(Step::Index(i));
            }
        }

        Ok(Self {
            text: text.to_string(),
            steps,
        })
    }

    /// The expression text this path was compiled from.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Select the field's current value, if the field exists.
    pub fn select<'r>(&self, record: &'r Record) -> Option<&'r Value> {
        let (first, rest) = self.steps.split_first()?;
        let Step::Field(name) = first else {
            return None;
        };
        let mut slot = record.get(name)?;
        for step in rest {
            slot = match step {
                Step::Field(name) => slot.as_object()?.get(name)?,
                Step::Index(i) => slot.as_array()?.get(*i)?,
            };
        }
        Some(slot)
    }

    /// Locate the field for reading and writing, if it exists.
    ///
    /// A field whose key is present but whose value is null still counts as
    /// present.
    pub fn evaluate<'r>(&self, record: &'r mut Record) -> Option<FieldHandle<'r>> {
        let (first, rest) = self.steps.split_first()?;
        let Step::Field(name) = first else {
            return None;
        };
        let mut slot = record.get_mut(name)?;
        for step in rest {
            let current = slot;
            slot = match step {
                Step::Field(name) => current.as_object_mut()?.get_mut(name)?,
                Step::Index(i) => current.as_array_mut()?.get_mut(*i)?,
            };
        }
        Some(FieldHandle { slot })
    }
}

impl std::fmt::Display for RecordPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A located field within a record.
#[derive(Debug)]
pub struct FieldHandle<'r> {
    slot: &'r mut Value,
}

impl FieldHandle<'_> {
    /// Current value of the field.
    pub fn value(&self) -> &Value {
        &*self.slot
    }

    /// Replace the field's value.
    pub fn update(&mut self, value: Value) {
        *self.slot = value;
    }
}
