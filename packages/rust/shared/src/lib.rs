//! Shared types, error model, and configuration for MultiLookup.
//!
//! This crate is the foundation depended on by all other MultiLookup crates.
//! It provides:
//! - [`MultiLookupError`] - the unified error type
//! - Domain types ([`Record`], [`FlowUnit`], [`FlowId`])
//! - Configuration ([`ProcessorConfig`], [`ServiceConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ErrorStrategy, ProcessorConfig, ServiceConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, parse_config,
};
pub use error::{MultiLookupError, Result};
pub use types::{
    Attributes, FlowId, FlowUnit, MIME_TYPE_ATTRIBUTE, RECORD_COUNT_ATTRIBUTE, Record,
};
