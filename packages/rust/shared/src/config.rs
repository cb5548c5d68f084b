//! Processor configuration for MultiLookup.
//!
//! The default config lives at `~/.multilookup/multilookup.toml`.
//! It holds the fixed processor options, the lookup service instances, and
//! the open-ended set of dynamic `<operation>.<attribute>` properties.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MultiLookupError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "multilookup.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".multilookup";

// ---------------------------------------------------------------------------
// Config structs (matching multilookup.toml schema)
// ---------------------------------------------------------------------------

/// How a failing operation affects the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorStrategy {
    /// Failed records don't cause the batch to be routed to failure.
    #[default]
    #[serde(rename = "any")]
    AnyCanPass,
    /// On any failure, the entire batch is failed.
    #[serde(rename = "all")]
    AllMustPass,
}

impl ErrorStrategy {
    /// Configuration value for this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnyCanPass => "any",
            Self::AllMustPass => "all",
        }
    }
}

/// A lookup service instance declared under `[services.<name>]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceConfig {
    /// Always returns the same value; needs no coordinates.
    Constant { value: String },
    /// Looks up the `key` coordinate in a fixed table.
    KeyValue {
        #[serde(default)]
        entries: BTreeMap<String, String>,
    },
    /// Fills `{placeholder}` names in a template from the coordinates.
    Template { template: String },
}

/// Top-level processor config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Record reader binding (`json` or `ndjson`).
    #[serde(default = "default_format")]
    pub record_reader: String,

    /// Record writer binding (`json` or `ndjson`).
    #[serde(default = "default_format")]
    pub record_writer: String,

    /// Global enrichment error strategy.
    #[serde(default)]
    pub enrichment_error_strategy: ErrorStrategy,

    /// Skip enriched / not-enriched outputs that contain no records.
    #[serde(default)]
    pub suppress_empty_outputs: bool,

    /// Capacity of the compiled record path cache.
    #[serde(default = "default_path_cache_size")]
    pub path_cache_size: usize,

    /// Lookup service instances keyed by name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,

    /// Dynamic operation properties, as quoted dotted keys or sub-tables.
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            record_reader: default_format(),
            record_writer: default_format(),
            enrichment_error_strategy: ErrorStrategy::default(),
            suppress_empty_outputs: false,
            path_cache_size: default_path_cache_size(),
            services: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

fn default_format() -> String {
    "ndjson".into()
}
fn default_path_cache_size() -> usize {
    100
}

impl ProcessorConfig {
    /// A small working configuration used by `config init`.
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.services.insert(
            "greeting".into(),
            ServiceConfig::Constant {
                value: "Hello, world".into(),
            },
        );
        config.services.insert(
            "full_name".into(),
            ServiceConfig::Template {
                template: "{first} {middle} {last}".into(),
            },
        );
        let props = [
            ("simple.lookup_service", "greeting"),
            ("simple.record_path", "/message"),
            ("complex.lookup_service", "full_name"),
            ("complex.record_path", "/full_name"),
            ("complex.first", "/first_name"),
            ("complex.middle", "/middle_name"),
            ("complex.last", "/last_name"),
        ];
        for (name, value) in props {
            config
                .properties
                .insert(name.into(), toml::Value::String(value.into()));
        }
        config
    }

    /// Flatten the dynamic properties into `<operation>.<attribute>` pairs.
    ///
    /// Sub-tables contribute one name segment per level, so nesting deeper
    /// than one level yields names that the operation parser rejects.
    pub fn dynamic_properties(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for (name, value) in &self.properties {
            flatten_property(name, value, &mut out)?;
        }
        Ok(out)
    }
}

fn flatten_property(name: &str, value: &toml::Value, out: &mut Vec<(String, String)>) -> Result<()> {
    match value {
        toml::Value::String(s) => out.push((name.to_string(), s.clone())),
        toml::Value::Boolean(b) => out.push((name.to_string(), b.to_string())),
        toml::Value::Integer(i) => out.push((name.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((name.to_string(), f.to_string())),
        toml::Value::Datetime(d) => out.push((name.to_string(), d.to_string())),
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten_property(&format!("{name}.{key}"), nested, out)?;
            }
        }
        toml::Value::Array(_) => {
            return Err(MultiLookupError::config(format!(
                "property \"{name}\" must be a scalar value, not an array"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.multilookup/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MultiLookupError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.multilookup/multilookup.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the processor config from the default location. Returns defaults if the file does not exist.
pub fn load_config() -> Result<ProcessorConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(ProcessorConfig::default());
    }

    load_config_from(&path)
}

/// Load the processor config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<ProcessorConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MultiLookupError::io(path, e))?;
    parse_config(&content)
        .map_err(|e| MultiLookupError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Parse a processor config from TOML text.
pub fn parse_config(content: &str) -> std::result::Result<ProcessorConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Create the config directory and write the sample config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MultiLookupError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&ProcessorConfig::sample())
        .map_err(|e| MultiLookupError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MultiLookupError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
