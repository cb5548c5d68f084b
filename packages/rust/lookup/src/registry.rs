//! Named lookup service instances.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use multilookup_shared::{Result, ServiceConfig};

use crate::builtin::{ConstantLookup, KeyValueLookup, TemplateLookup};
use crate::service::LookupService;

/// Lookup services addressable by the name operations bind to.
#[derive(Clone, Default)]
pub struct LookupRegistry {
    services: HashMap<String, Arc<dyn LookupService>>,
}

impl LookupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate the built-in services declared in `[services.*]`.
    pub fn from_config(configs: &BTreeMap<String, ServiceConfig>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, config) in configs {
            let service: Arc<dyn LookupService> = match config {
                ServiceConfig::Constant { value } => Arc::new(ConstantLookup::new(value.as_str())),
                ServiceConfig::KeyValue { entries } => {
                    Arc::new(KeyValueLookup::new(entries.clone()))
                }
                ServiceConfig::Template { template } => {
                    Arc::new(TemplateLookup::new(template.as_str())?)
                }
            };
            debug!(service = %name, "registered lookup service");
            registry.register(name.clone(), service);
        }
        Ok(registry)
    }

    /// Register (or replace) a service under `name`.
    pub fn register(&mut self, name: impl Into<String>, service: Arc<dyn LookupService>) {
        self.services.insert(name.into(), service);
    }

    /// Resolve a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LookupService>> {
        self.services.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for LookupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.services.keys().collect();
        names.sort();
        f.debug_struct("LookupRegistry")
            .field("services", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multilookup_shared::Attributes;
    use serde_json::json;

    #[test]
    fn builds_services_from_config() {
        let configs = BTreeMap::from([
            (
                "greeting".to_string(),
                ServiceConfig::Constant {
                    value: "Hello, world".into(),
                },
            ),
            (
                "full_name".to_string(),
                ServiceConfig::Template {
                    template: "{first} {last}".into(),
                },
            ),
        ]);
        let registry = LookupRegistry::from_config(&configs).expect("registry");
        assert_eq!(registry.len(), 2);

        let greeting = registry.get("greeting").expect("greeting registered");
        let value = greeting
            .lookup(&Default::default(), &Attributes::new())
            .expect("lookup");
        assert_eq!(value, Some(json!("Hello, world")));

        let full_name = registry.get("full_name").expect("full_name registered");
        assert_eq!(full_name.required_keys().len(), 2);
        assert!(registry.get("absent").is_none());
    }

    #[test]
    fn invalid_template_fails_registry() {
        let configs = BTreeMap::from([(
            "broken".to_string(),
            ServiceConfig::Template {
                template: "no placeholders".into(),
            },
        )]);
        assert!(LookupRegistry::from_config(&configs).is_err());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = LookupRegistry::new();
        assert!(registry.is_empty());
        registry.register("svc", Arc::new(ConstantLookup::new("a")));
        registry.register("svc", Arc::new(ConstantLookup::new("b")));
        assert_eq!(registry.len(), 1);
        let value = registry
            .get("svc")
            .expect("registered")
            .lookup(&Default::default(), &Attributes::new())
            .expect("lookup");
        assert_eq!(value, Some(json!("b")));
    }
}
