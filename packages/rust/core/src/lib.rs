//! Record enrichment engine for MultiLookup.
//!
//! Ties together the operation parser, configuration validator, enrichment
//! executor, record codecs, and the routing processor.

pub mod codec;
pub mod executor;
pub mod operation;
pub mod processor;
pub mod validate;

pub use executor::{EnrichmentExecutor, EnrichmentOutcome, PartitionedRecords};
pub use operation::{Operation, OperationGroups, resolve_operations, split_property_name};
pub use processor::{BatchSummary, Processor, Route, Transfer, TriggerResult};
pub use validate::{ValidationFailure, validate_config, validate_operations, validate_properties};
