//! The enrichment processor: turns one input flow unit into routed outputs.
//!
//! A successful batch transfers an `enriched` unit, a `not-enriched` unit,
//! and the untouched input to `original`. Any fatal error (decode, encode,
//! or an all-must-pass abort) discards the partial outputs and transfers
//! only the untouched input to `failure`.

use std::sync::Arc;

use tracing::{error, info, instrument};

use multilookup_lookup::LookupRegistry;
use multilookup_path::PathCache;
use multilookup_shared::{
    ErrorStrategy, FlowUnit, MIME_TYPE_ATTRIBUTE, MultiLookupError, ProcessorConfig,
    RECORD_COUNT_ATTRIBUTE, Record, Result,
};

use crate::codec::{self, RecordReader, RecordSetWriter};
use crate::executor::EnrichmentExecutor;
use crate::operation::{OperationGroups, resolve_operations};
use crate::validate::validate_config;

/// Output relationship of a transferred unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Enriched,
    NotEnriched,
    Original,
    Failure,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enriched => "enriched",
            Self::NotEnriched => "not-enriched",
            Self::Original => "original",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit sent to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub route: Route,
    pub unit: FlowUnit,
}

/// Record counts of a completed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub enriched: u64,
    pub not_enriched: u64,
}

impl BatchSummary {
    pub fn total(&self) -> u64 {
        self.enriched + self.not_enriched
    }
}

/// Everything one trigger produced.
#[derive(Debug, Clone)]
pub struct TriggerResult {
    pub transfers: Vec<Transfer>,
    /// `None` when the batch failed.
    pub summary: Option<BatchSummary>,
}

impl TriggerResult {
    /// Units transferred to `route`.
    pub fn routed(&self, route: Route) -> impl Iterator<Item = &FlowUnit> {
        self.transfers
            .iter()
            .filter(move |t| t.route == route)
            .map(|t| &t.unit)
    }

    pub fn failed(&self) -> bool {
        self.summary.is_none()
    }
}

/// A scheduled processor: validated configuration, resolved operations,
/// and the codecs, ready to handle flow units from any number of threads.
pub struct Processor {
    reader: Arc<dyn RecordReader>,
    writer: Arc<dyn RecordSetWriter>,
    executor: EnrichmentExecutor,
    suppress_empty_outputs: bool,
}

impl Processor {
    /// Validate `config` and build the processor.
    ///
    /// Refuses to build while any validation failure remains; the error
    /// lists every failure.
    pub fn from_config(config: &ProcessorConfig, registry: &LookupRegistry) -> Result<Self> {
        let failures = validate_config(config, registry);
        if !failures.is_empty() {
            let listed: Vec<String> = failures.iter().map(ToString::to_string).collect();
            return Err(MultiLookupError::config(format!(
                "{} validation failure(s): {}",
                failures.len(),
                listed.join("; ")
            )));
        }

        let groups = OperationGroups::parse(config.dynamic_properties()?)?;
        let operations = resolve_operations(&groups, registry)?;
        let cache = Arc::new(PathCache::new(config.path_cache_size));
        info!(
            operations = operations.len(),
            strategy = config.enrichment_error_strategy.as_str(),
            "processor scheduled"
        );

        Ok(Self {
            reader: codec::reader_by_name(&config.record_reader)?,
            writer: codec::writer_by_name(&config.record_writer)?,
            executor: EnrichmentExecutor::new(
                operations,
                config.enrichment_error_strategy,
                cache,
            ),
            suppress_empty_outputs: config.suppress_empty_outputs,
        })
    }

    pub fn strategy(&self) -> ErrorStrategy {
        self.executor.strategy()
    }

    pub fn executor(&self) -> &EnrichmentExecutor {
        &self.executor
    }

    /// Process one input unit and route the results.
    #[instrument(skip_all, fields(unit = %input.id))]
    pub fn on_trigger(&self, input: FlowUnit) -> TriggerResult {
        match self.enrich_unit(&input) {
            Ok((enriched, not_enriched, summary)) => {
                info!(
                    enriched = summary.enriched,
                    not_enriched = summary.not_enriched,
                    "batch enriched"
                );
                let mut transfers = Vec::with_capacity(3);
                for (route, unit, count) in [
                    (Route::Enriched, enriched, summary.enriched),
                    (Route::NotEnriched, not_enriched, summary.not_enriched),
                ] {
                    if count > 0 || !self.suppress_empty_outputs {
                        transfers.push(Transfer { route, unit });
                    }
                }
                transfers.push(Transfer {
                    route: Route::Original,
                    unit: input,
                });
                TriggerResult {
                    transfers,
                    summary: Some(summary),
                }
            }
            Err(e) => {
                error!(error = %e, "error handling enrichment");
                TriggerResult {
                    transfers: vec![Transfer {
                        route: Route::Failure,
                        unit: input,
                    }],
                    summary: None,
                }
            }
        }
    }

    fn enrich_unit(&self, input: &FlowUnit) -> Result<(FlowUnit, FlowUnit, BatchSummary)> {
        let records = self.reader.read_records(&input.content)?;
        let partitioned = self.executor.partition(records, &input.attributes)?;

        let summary = BatchSummary {
            enriched: partitioned.enriched.len() as u64,
            not_enriched: partitioned.not_enriched.len() as u64,
        };
        let enriched = self.output_unit(input, &partitioned.enriched)?;
        let not_enriched = self.output_unit(input, &partitioned.not_enriched)?;
        Ok((enriched, not_enriched, summary))
    }

    fn output_unit(&self, input: &FlowUnit, records: &[Record]) -> Result<FlowUnit> {
        let content = self.writer.write_records(records)?;
        Ok(input
            .child(content)
            .with_attribute(RECORD_COUNT_ATTRIBUTE, records.len().to_string())
            .with_attribute(MIME_TYPE_ATTRIBUTE, self.writer.mime_type()))
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("executor", &self.executor)
            .field("suppress_empty_outputs", &self.suppress_empty_outputs)
            .finish_non_exhaustive()
    }
}
