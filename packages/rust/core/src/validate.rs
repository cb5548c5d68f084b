//! Design-time configuration validation.
//!
//! Every check runs and every failure is reported; nothing short-circuits.
//! Required-key checks are late-bound: they ask the resolved lookup service
//! which coordinates it needs.

use multilookup_lookup::LookupRegistry;
use multilookup_path::RecordPath;
use multilookup_shared::ProcessorConfig;

use crate::codec;
use crate::operation::{
    LOOKUP_SERVICE, MUST_PASS, OperationGroups, RECORD_PATH, is_reserved_attribute,
    parse_must_pass,
};

/// One reason a configuration is not ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Operation name, property name, or fixed option the failure is about.
    pub subject: String,
    /// Human-readable explanation.
    pub explanation: String,
}

impl ValidationFailure {
    pub fn new(subject: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            explanation: explanation.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.explanation)
    }
}

/// Validate a full processor config: fixed options plus dynamic properties.
pub fn validate_config(config: &ProcessorConfig, registry: &LookupRegistry) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    if codec::reader_by_name(&config.record_reader).is_err() {
        failures.push(ValidationFailure::new(
            "record_reader",
            format!("unknown record reader \"{}\"", config.record_reader),
        ));
    }
    if codec::writer_by_name(&config.record_writer).is_err() {
        failures.push(ValidationFailure::new(
            "record_writer",
            format!("unknown record writer \"{}\"", config.record_writer),
        ));
    }
    if config.path_cache_size == 0 {
        failures.push(ValidationFailure::new(
            "path_cache_size",
            "path cache size must be greater than zero",
        ));
    }

    match config.dynamic_properties() {
        Ok(properties) => failures.extend(validate_properties(properties, registry)),
        Err(e) => failures.push(ValidationFailure::new("properties", e.to_string())),
    }

    failures
}

/// Validate dynamic `<operation>.<attribute>` properties.
pub fn validate_properties<I, K, V>(properties: I, registry: &LookupRegistry) -> Vec<ValidationFailure>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let (groups, malformed) = OperationGroups::parse_lenient(properties);
    let mut failures: Vec<_> = malformed
        .into_iter()
        .map(|name| {
            ValidationFailure::new(
                name,
                "Name must be in format \"<operation_name>.<property>\"",
            )
        })
        .collect();
    failures.extend(validate_operations(&groups, registry));
    failures
}

/// Validate grouped operations against the registered lookup services.
pub fn validate_operations(
    groups: &OperationGroups,
    registry: &LookupRegistry,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    for (name, attrs) in groups.iter() {
        match attrs.get(LOOKUP_SERVICE) {
            Some(service_name) => match registry.get(service_name) {
                Some(service) => {
                    for key in service.required_keys() {
                        if !attrs.contains_key(&key) {
                            failures.push(ValidationFailure::new(
                                name,
                                format!("Configured lookup service is missing required key \"{key}\""),
                            ));
                        }
                    }
                }
                None => failures.push(ValidationFailure::new(
                    name,
                    format!("Lookup service \"{service_name}\" is not registered."),
                )),
            },
            None => failures.push(ValidationFailure::new(name, "No lookup service configured.")),
        }

        match attrs.get(RECORD_PATH) {
            Some(path) => check_path(name, RECORD_PATH, path, &mut failures),
            None => failures.push(ValidationFailure::new(
                name,
                format!("Missing property \"{RECORD_PATH}\""),
            )),
        }

        if let Some(value) = attrs.get(MUST_PASS) {
            if parse_must_pass(value).is_none() {
                failures.push(ValidationFailure::new(
                    name,
                    format!("\"{MUST_PASS}\" must be \"true\" or \"false\", got \"{value}\""),
                ));
            }
        }

        for (attr, path) in attrs.iter().filter(|(attr, _)| !is_reserved_attribute(attr)) {
            check_path(name, attr, path, &mut failures);
        }
    }

    failures
}

fn check_path(operation: &str, attr: &str, path: &str, failures: &mut Vec<ValidationFailure>) {
    if path.trim().is_empty() {
        failures.push(ValidationFailure::new(
            operation,
            format!("Property \"{attr}\" must not be empty"),
        ));
    } else if let Err(e) = RecordPath::compile(path) {
        failures.push(ValidationFailure::new(
            operation,
            format!("Property \"{attr}\": {e}"),
        ));
    }
}
