//! Per-record execution of the configured operations.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use multilookup_lookup::Coordinates;
use multilookup_path::PathCache;
use multilookup_shared::{Attributes, ErrorStrategy, MultiLookupError, Record, Result};

use crate::operation::Operation;

/// Classification of one processed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Every required operation succeeded.
    Enriched,
    /// A required operation failed.
    NotEnriched,
}

/// Records of one batch, split by outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedRecords {
    pub enriched: Vec<Record>,
    pub not_enriched: Vec<Record>,
}

/// Applies an ordered operation list to records.
#[derive(Debug, Clone)]
pub struct EnrichmentExecutor {
    operations: Vec<Operation>,
    strategy: ErrorStrategy,
    cache: Arc<PathCache>,
}

impl EnrichmentExecutor {
    pub fn new(operations: Vec<Operation>, strategy: ErrorStrategy, cache: Arc<PathCache>) -> Self {
        Self {
            operations,
            strategy,
            cache,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn strategy(&self) -> ErrorStrategy {
        self.strategy
    }

    /// Run every operation against `record`, in order.
    ///
    /// A failing operation stops the record when it is required and is
    /// skipped otherwise. Under [`ErrorStrategy::AllMustPass`] any failure
    /// is returned as [`MultiLookupError::AllMustPass`] and the caller must
    /// abandon the whole batch.
    pub fn execute_operations(
        &self,
        record: &mut Record,
        attributes: &Attributes,
    ) -> Result<EnrichmentOutcome> {
        for operation in &self.operations {
            let Err(e) = self.apply(operation, record, attributes) else {
                continue;
            };

            if self.strategy == ErrorStrategy::AllMustPass {
                return Err(MultiLookupError::AllMustPass {
                    operation: operation.name.clone(),
                    source: Box::new(e),
                });
            }
            if operation.required {
                warn!(operation = %operation.name, error = %e, "required operation failed");
                return Ok(EnrichmentOutcome::NotEnriched);
            }
            debug!(operation = %operation.name, error = %e, "optional operation failed, continuing");
        }

        Ok(EnrichmentOutcome::Enriched)
    }

    /// Process a stream of records, splitting them by outcome.
    ///
    /// Any decode error or all-must-pass abort discards everything
    /// partitioned so far.
    pub fn partition<I>(&self, records: I, attributes: &Attributes) -> Result<PartitionedRecords>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let mut out = PartitionedRecords::default();
        for record in records {
            let mut record = record?;
            match self.execute_operations(&mut record, attributes)? {
                EnrichmentOutcome::Enriched => out.enriched.push(record),
                EnrichmentOutcome::NotEnriched => out.not_enriched.push(record),
            }
        }
        Ok(out)
    }

    fn apply(&self, operation: &Operation, record: &mut Record, attributes: &Attributes) -> Result<()> {
        let coordinates = self.coordinates(record, operation)?;
        let result = operation
            .service
            .lookup(&coordinates, attributes)?
            .ok_or_else(|| MultiLookupError::lookup("lookup service returned no value"))?;

        let path = self.cache.get_compiled(&operation.record_path)?;
        let mut field = path
            .evaluate(record)
            .ok_or_else(|| MultiLookupError::PathNotInSchema {
                path: operation.record_path.clone(),
            })?;
        field.update(result);
        Ok(())
    }

    fn coordinates(&self, record: &Record, operation: &Operation) -> Result<Coordinates> {
        let mut coordinates = Coordinates::new();
        for (key, path_text) in &operation.keys {
            let path = self.cache.get_compiled(path_text)?;
            let value = path.select(record).cloned().unwrap_or(Value::Null);
            coordinates.insert(key.clone(), value);
        }
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use multilookup_lookup::{ConstantLookup, LookupService, TemplateLookup};
    use serde_json::json;

    /// Always fails.
    struct FailingService;

    impl LookupService for FailingService {
        fn required_keys(&self) -> BTreeSet<String> {
            BTreeSet::new()
        }

        fn lookup(&self, _: &Coordinates, _: &Attributes) -> Result<Option<Value>> {
            Err(MultiLookupError::lookup("forced failure"))
        }
    }

    /// Records every coordinate set it receives and returns nothing.
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<(Coordinates, Attributes)>>,
    }

    impl LookupService for RecordingService {
        fn required_keys(&self) -> BTreeSet<String> {
            BTreeSet::from(["id".to_string()])
        }

        fn lookup(&self, coordinates: &Coordinates, context: &Attributes) -> Result<Option<Value>> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((coordinates.clone(), context.clone()));
            Ok(None)
        }
    }

    fn op(name: &str, service: Arc<dyn LookupService>, path: &str, keys: &[(&str, &str)]) -> Operation {
        Operation {
            name: name.into(),
            required: true,
            keys: keys
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            service,
            record_path: path.into(),
        }
    }

    fn simple() -> Operation {
        op("simple", Arc::new(ConstantLookup::new("Hello, world")), "/message", &[])
    }

    fn complex() -> Operation {
        op(
            "complex",
            Arc::new(TemplateLookup::new("{first} {middle} {last}").expect("template")),
            "/full_name",
            &[
                ("first", "/first_name"),
                ("middle", "/middle_name"),
                ("last", "/last_name"),
            ],
        )
    }

    fn failing(required: bool) -> Operation {
        Operation {
            required,
            ..op("simple", Arc::new(FailingService), "/message", &[])
        }
    }

    fn person() -> Record {
        match json!({
            "first_name": "John",
            "middle_name": "Q.",
            "last_name": "Public",
            "full_name": null,
            "message": null
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn executor(operations: Vec<Operation>, strategy: ErrorStrategy) -> EnrichmentExecutor {
        EnrichmentExecutor::new(operations, strategy, Arc::new(PathCache::new(100)))
    }

    #[test]
    fn all_operations_succeed() {
        let exec = executor(vec![simple(), complex()], ErrorStrategy::AnyCanPass);
        let mut record = person();
        let outcome = exec
            .execute_operations(&mut record, &Attributes::new())
            .expect("execute");
        assert_eq!(outcome, EnrichmentOutcome::Enriched);
        assert_eq!(record["full_name"], json!("John Q. Public"));
        assert_eq!(record["message"], json!("Hello, world"));
    }

    #[test]
    fn required_failure_marks_record_not_enriched() {
        let exec = executor(vec![complex(), failing(true)], ErrorStrategy::AnyCanPass);
        let mut record = person();
        let outcome = exec
            .execute_operations(&mut record, &Attributes::new())
            .expect("execute");
        assert_eq!(outcome, EnrichmentOutcome::NotEnriched);
        assert_eq!(record.len(), 5);
        assert!(record["message"].is_null());
        assert_eq!(record["full_name"], json!("John Q. Public"));
    }

    #[test]
    fn required_failure_stops_later_operations() {
        let exec = executor(vec![failing(true), simple()], ErrorStrategy::AnyCanPass);
        let mut record = person();
        exec.execute_operations(&mut record, &Attributes::new())
            .expect("execute");
        assert!(record["message"].is_null());
    }

    #[test]
    fn optional_failure_is_ignored() {
        let exec = executor(vec![failing(false), complex()], ErrorStrategy::AnyCanPass);
        let mut record = person();
        let outcome = exec
            .execute_operations(&mut record, &Attributes::new())
            .expect("execute");
        assert_eq!(outcome, EnrichmentOutcome::Enriched);
        assert!(record["message"].is_null());
        assert_eq!(record["full_name"], json!("John Q. Public"));
    }

    #[test]
    fn all_must_pass_aborts_even_for_optional_operations() {
        let exec = executor(vec![failing(false)], ErrorStrategy::AllMustPass);
        let err = exec
            .execute_operations(&mut person(), &Attributes::new())
            .unwrap_err();
        match err {
            MultiLookupError::AllMustPass { operation, source } => {
                assert_eq!(operation, "simple");
                assert!(matches!(*source, MultiLookupError::Lookup(_)));
            }
            other => panic!("expected AllMustPass, got {other}"),
        }
    }

    #[test]
    fn missing_target_field_is_a_failure() {
        let exec = executor(
            vec![op("ghost", Arc::new(ConstantLookup::new("x")), "/not_there", &[])],
            ErrorStrategy::AnyCanPass,
        );
        let mut record = person();
        let outcome = exec
            .execute_operations(&mut record, &Attributes::new())
            .expect("execute");
        assert_eq!(outcome, EnrichmentOutcome::NotEnriched);
        assert!(!record.contains_key("not_there"));
    }

    #[test]
    fn missing_source_path_becomes_null_coordinate() {
        let service = Arc::new(RecordingService::default());
        let exec = executor(
            vec![op("rec", service.clone(), "/message", &[("id", "/absent")])],
            ErrorStrategy::AnyCanPass,
        );
        let mut attrs = Attributes::new();
        attrs.insert("filename".into(), "people.ndjson".into());

        // A lookup without a value fails the required operation.
        let outcome = exec.execute_operations(&mut person(), &attrs).expect("execute");
        assert_eq!(outcome, EnrichmentOutcome::NotEnriched);

        let calls = service.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.get("id"), Some(&Value::Null));
        assert_eq!(calls[0].1.get("filename").map(String::as_str), Some("people.ndjson"));
    }

    #[test]
    fn partition_counts_cover_every_record() {
        let exec = executor(vec![complex()], ErrorStrategy::AnyCanPass);
        let mut incomplete = person();
        incomplete.remove("middle_name");
        let records = vec![Ok(person()), Ok(incomplete), Ok(person())];

        let out = exec.partition(records, &Attributes::new()).expect("partition");
        assert_eq!(out.enriched.len(), 2);
        assert_eq!(out.not_enriched.len(), 1);
    }

    #[test]
    fn partition_aborts_on_decode_error() {
        let exec = executor(vec![simple()], ErrorStrategy::AnyCanPass);
        let records = vec![Ok(person()), Err(MultiLookupError::Decode("bad line".into()))];
        assert!(exec.partition(records, &Attributes::new()).is_err());
    }
}
