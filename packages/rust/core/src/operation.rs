//! Operation parsing: grouping flat `<operation>.<attribute>` properties
//! into named operations, and resolving groups against lookup services.

use std::collections::BTreeMap;
use std::sync::Arc;

use multilookup_lookup::{LookupRegistry, LookupService};
use multilookup_shared::{MultiLookupError, Result};

/// Attribute binding the operation's lookup service.
pub const LOOKUP_SERVICE: &str = "lookup_service";
/// Attribute controlling whether the operation must succeed.
pub const MUST_PASS: &str = "must_pass";
/// Attribute holding the target record path.
pub const RECORD_PATH: &str = "record_path";

/// Split a dynamic property name into `(operation, attribute)`.
///
/// Exactly two non-empty, dot-separated segments are accepted.
pub fn split_property_name(name: &str) -> Result<(&str, &str)> {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(op), Some(attr), None) if !op.is_empty() && !attr.is_empty() => Ok((op, attr)),
        _ => Err(MultiLookupError::PropertyName {
            name: name.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// OperationGroups
// ---------------------------------------------------------------------------

/// Dynamic properties grouped by operation name.
///
/// Groups keep the order in which each operation name first appears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationGroups {
    groups: Vec<(String, BTreeMap<String, String>)>,
}

impl OperationGroups {
    /// Group properties, failing on the first malformed name.
    pub fn parse<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let (groups, malformed) = Self::parse_lenient(properties);
        match malformed.into_iter().next() {
            Some(name) => Err(MultiLookupError::PropertyName { name }),
            None => Ok(groups),
        }
    }

    /// Group the well-formed properties and return the malformed names.
    pub fn parse_lenient<I, K, V>(properties: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut groups = Self::default();
        let mut malformed = Vec::new();

        for (name, value) in properties {
            let name = name.as_ref();
            match split_property_name(name) {
                Ok((op, attr)) => groups.insert(op, attr, value.into()),
                Err(_) => malformed.push(name.to_string()),
            }
        }

        (groups, malformed)
    }

    fn insert(&mut self, op: &str, attr: &str, value: String) {
        let attrs = match self.groups.iter().position(|(name, _)| name == op) {
            Some(i) => &mut self.groups[i].1,
            None => {
                self.groups.push((op.to_string(), BTreeMap::new()));
                let last = self.groups.len() - 1;
                &mut self.groups[last].1
            }
        };
        attrs.insert(attr.to_string(), value);
    }

    /// Attribute map of the named operation.
    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.groups
            .iter()
            .find(|(op, _)| op == name)
            .map(|(_, attrs)| attrs)
    }

    /// Operations in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, String>)> {
        self.groups.iter().map(|(name, attrs)| (name.as_str(), attrs))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A resolved, immutable enrichment step.
#[derive(Clone)]
pub struct Operation {
    /// Operation name (the dynamic property prefix).
    pub name: String,
    /// Whether a failure marks the record as not enriched.
    pub required: bool,
    /// Coordinate name to source record path.
    pub keys: BTreeMap<String, String>,
    /// Bound lookup capability.
    pub service: Arc<dyn LookupService>,
    /// Path of the field the lookup result is written into.
    pub record_path: String,
}

impl Operation {
    /// Resolve one operation group against the registry.
    pub fn resolve(
        name: &str,
        attrs: &BTreeMap<String, String>,
        registry: &LookupRegistry,
    ) -> Result<Self> {
        let service_name = attrs.get(LOOKUP_SERVICE).ok_or_else(|| {
            MultiLookupError::config(format!("operation \"{name}\": no lookup service configured"))
        })?;
        let service = registry.get(service_name).ok_or_else(|| {
            MultiLookupError::config(format!(
                "operation \"{name}\": lookup service \"{service_name}\" is not registered"
            ))
        })?;
        let record_path = attrs.get(RECORD_PATH).cloned().ok_or_else(|| {
            MultiLookupError::config(format!(
                "operation \"{name}\": missing property \"{RECORD_PATH}\""
            ))
        })?;
        let required = match attrs.get(MUST_PASS) {
            Some(value) => parse_must_pass(value).ok_or_else(|| {
                MultiLookupError::config(format!(
                    "operation \"{name}\": \"{MUST_PASS}\" must be true or false, got \"{value}\""
                ))
            })?,
            None => true,
        };
        let keys = attrs
            .iter()
            .filter(|(attr, _)| !is_reserved_attribute(attr))
            .map(|(attr, path)| (attr.clone(), path.clone()))
            .collect();

        Ok(Self {
            name: name.to_string(),
            required,
            keys,
            service,
            record_path,
        })
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("keys", &self.keys)
            .field("record_path", &self.record_path)
            .finish_non_exhaustive()
    }
}

/// Resolve every group, in group order.
pub fn resolve_operations(
    groups: &OperationGroups,
    registry: &LookupRegistry,
) -> Result<Vec<Operation>> {
    groups
        .iter()
        .map(|(name, attrs)| Operation::resolve(name, attrs, registry))
        .collect()
}

/// Whether `attr` is one of the fixed operation attributes rather than a
/// coordinate binding.
pub fn is_reserved_attribute(attr: &str) -> bool {
    matches!(attr, LOOKUP_SERVICE | MUST_PASS | RECORD_PATH)
}

/// Parse a `must_pass` value.
pub fn parse_must_pass(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multilookup_lookup::{ConstantLookup, TemplateLookup};

    fn example_properties() -> Vec<(&'static str, &'static str)> {
        vec![
            ("simple.lookup_service", "noKeyService"),
            ("simple.record_path", "/message"),
            ("complex.lookup_service", "multiKeyService"),
            ("complex.record_path", "/full_name"),
            ("complex.first", "/first_name"),
            ("complex.middle", "/middle_name"),
            ("complex.last", "/last_name"),
        ]
    }

    fn registry() -> LookupRegistry {
        let mut registry = LookupRegistry::new();
        registry.register("noKeyService", Arc::new(ConstantLookup::new("Hello, world")));
        registry.register(
            "multiKeyService",
            Arc::new(TemplateLookup::new("{first} {middle} {last}").expect("template")),
        );
        registry
    }

    #[test]
    fn split_accepts_two_segments_only() {
        assert_eq!(
            split_property_name("simple.record_path").expect("valid"),
            ("simple", "record_path")
        );
        for bad in ["simple", "a.b.c", ".record_path", "simple.", ""] {
            assert!(
                matches!(
                    split_property_name(bad),
                    Err(MultiLookupError::PropertyName { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn groups_by_operation_in_first_appearance_order() {
        let groups = OperationGroups::parse(example_properties()).expect("parse");
        let names: Vec<_> = groups.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["simple", "complex"]);

        let complex = groups.get("complex").expect("complex group");
        assert_eq!(complex.len(), 5);
        assert_eq!(complex.get("middle").map(String::as_str), Some("/middle_name"));
    }

    #[test]
    fn parsing_is_idempotent() {
        let first = OperationGroups::parse(example_properties()).expect("parse");
        let second = OperationGroups::parse(example_properties()).expect("parse");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_name_is_an_error() {
        let err = OperationGroups::parse([("a.b.c", "/x")]).unwrap_err();
        assert!(err.to_string().contains("a.b.c"));
    }

    #[test]
    fn lenient_parse_collects_every_malformed_name() {
        let (groups, malformed) =
            OperationGroups::parse_lenient([("good.record_path", "/x"), ("bad", "1"), ("a.b.c", "2")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(malformed, vec!["bad".to_string(), "a.b.c".to_string()]);
    }

    #[test]
    fn resolve_builds_typed_operations() {
        let groups = OperationGroups::parse(example_properties()).expect("parse");
        let ops = resolve_operations(&groups, &registry()).expect("resolve");
        assert_eq!(ops.len(), 2);

        let simple = &ops[0];
        assert_eq!(simple.name, "simple");
        assert!(simple.required, "must_pass defaults to true");
        assert!(simple.keys.is_empty());
        assert_eq!(simple.record_path, "/message");

        let complex = &ops[1];
        let keys: Vec<_> = complex.keys.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["first", "last", "middle"]);
    }

    #[test]
    fn must_pass_false_is_honoured() {
        let groups = OperationGroups::parse([
            ("simple.lookup_service", "noKeyService"),
            ("simple.record_path", "/message"),
            ("simple.must_pass", "false"),
        ])
        .expect("parse");
        let ops = resolve_operations(&groups, &registry()).expect("resolve");
        assert!(!ops[0].required);
        assert!(ops[0].keys.is_empty());
    }

    #[test]
    fn resolve_rejects_unknown_service() {
        let groups = OperationGroups::parse([
            ("simple.lookup_service", "absent"),
            ("simple.record_path", "/message"),
        ])
        .expect("parse");
        let err = resolve_operations(&groups, &registry()).unwrap_err();
        assert!(err.to_string().contains("\"absent\""));
    }
}
