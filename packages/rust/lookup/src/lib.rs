//! Lookup capabilities for MultiLookup.
//!
//! Operations never depend on concrete backends, only on [`LookupService`]:
//! - [`LookupService`] - the capability contract (required keys + lookup)
//! - [`LookupRegistry`] - named service instances, built from config or by hand
//! - Built-in backends: [`ConstantLookup`], [`KeyValueLookup`], [`TemplateLookup`]

mod builtin;
mod registry;
mod service;

pub use builtin::{ConstantLookup, KeyValueLookup, TemplateLookup};
pub use registry::LookupRegistry;
pub use service::{Coordinates, LookupService, coordinate_text};
