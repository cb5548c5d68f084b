//! Record readers and writers for flow unit content.

use std::sync::Arc;

use serde_json::Value;

use multilookup_shared::{MultiLookupError, Record, Result};

/// Iterator over decoded records; a decode error ends the batch.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// Decodes flow unit content into records.
pub trait RecordReader: Send + Sync {
    fn read_records<'a>(&self, content: &'a [u8]) -> Result<RecordIter<'a>>;
}

/// Encodes a record set into flow unit content.
pub trait RecordSetWriter: Send + Sync {
    /// Value for the `mime.type` attribute of produced units.
    fn mime_type(&self) -> &'static str;

    fn write_records(&self, records: &[Record]) -> Result<Vec<u8>>;
}

/// Resolve a reader binding name.
pub fn reader_by_name(name: &str) -> Result<Arc<dyn RecordReader>> {
    match name {
        "json" => Ok(Arc::new(JsonReader)),
        "ndjson" => Ok(Arc::new(NdjsonReader)),
        other => Err(MultiLookupError::config(format!(
            "unknown record reader \"{other}\""
        ))),
    }
}

/// Resolve a writer binding name.
pub fn writer_by_name(name: &str) -> Result<Arc<dyn RecordSetWriter>> {
    match name {
        "json" => Ok(Arc::new(JsonWriter)),
        "ndjson" => Ok(Arc::new(NdjsonWriter)),
        other => Err(MultiLookupError::config(format!(
            "unknown record writer \"{other}\""
        ))),
    }
}

fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(MultiLookupError::Decode(format!(
            "expected a record object, got: {}",
            truncate(&other.to_string(), 80)
        ))),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Reads a top-level array of records, or a single record object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl RecordReader for JsonReader {
    fn read_records<'a>(&self, content: &'a [u8]) -> Result<RecordIter<'a>> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Box::new(std::iter::empty()));
        }
        let value: Value = serde_json::from_slice(content)
            .map_err(|e| MultiLookupError::Decode(format!("invalid JSON: {e}")))?;
        match value {
            Value::Array(items) => Ok(Box::new(items.into_iter().map(into_record))),
            other => Ok(Box::new(std::iter::once(into_record(other)))),
        }
    }
}

/// Writes records as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter;

impl RecordSetWriter for JsonWriter {
    fn mime_type(&self) -> &'static str {
        "application/json"
    }

    fn write_records(&self, records: &[Record]) -> Result<Vec<u8>> {
        serde_json::to_vec(records).map_err(|e| MultiLookupError::Encode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// NDJSON
// ---------------------------------------------------------------------------

/// Reads one record object per line; blank lines are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonReader;

impl RecordReader for NdjsonReader {
    fn read_records<'a>(&self, content: &'a [u8]) -> Result<RecordIter<'a>> {
        let stream = serde_json::Deserializer::from_slice(content).into_iter::<Value>();
        Ok(Box::new(stream.map(|item| {
            let value = item.map_err(|e| MultiLookupError::Decode(format!("invalid NDJSON: {e}")))?;
            into_record(value)
        })))
    }
}

/// Writes one record per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonWriter;

impl RecordSetWriter for NdjsonWriter {
    fn mime_type(&self) -> &'static str {
        "application/x-ndjson"
    }

    fn write_records(&self, records: &[Record]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for record in records {
            serde_json::to_writer(&mut out, record)
                .map_err(|e| MultiLookupError::Encode(e.to_string()))?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(reader: &dyn RecordReader, content: &str) -> Result<Vec<Record>> {
        reader.read_records(content.as_bytes())?.collect()
    }

    #[test]
    fn ndjson_reads_lines_and_skips_blanks() {
        let content = "{\"a\":1}\n\n{\"a\":2}\n";
        let records = collect(&NdjsonReader, content).expect("read");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("a"), Some(&json!(2)));
    }

    #[test]
    fn ndjson_rejects_non_objects_and_garbage() {
        let err = collect(&NdjsonReader, "{\"a\":1}\n[1,2]\n").unwrap_err();
        assert!(matches!(err, MultiLookupError::Decode(_)));

        let err = collect(&NdjsonReader, "{\"a\":").unwrap_err();
        assert!(err.to_string().contains("invalid NDJSON"));
    }

    #[test]
    fn json_reads_array_single_object_and_empty() {
        let records = collect(&JsonReader, r#"[{"a":1},{"a":2}]"#).expect("read");
        assert_eq!(records.len(), 2);

        let records = collect(&JsonReader, r#"{"a":1}"#).expect("read");
        assert_eq!(records.len(), 1);

        let records = collect(&JsonReader, "  \n").expect("read");
        assert!(records.is_empty());

        assert!(collect(&JsonReader, "[1]").is_err());
    }

    #[test]
    fn writers_encode_records() {
        let record = match json!({"name": "John"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let records = vec![record.clone(), record];

        let ndjson = NdjsonWriter.write_records(&records).expect("write");
        assert_eq!(
            String::from_utf8(ndjson).expect("utf8"),
            "{\"name\":\"John\"}\n{\"name\":\"John\"}\n"
        );

        let json = JsonWriter.write_records(&records).expect("write");
        assert_eq!(
            String::from_utf8(json).expect("utf8"),
            "[{\"name\":\"John\"},{\"name\":\"John\"}]"
        );
        assert!(NdjsonWriter.write_records(&[]).expect("write").is_empty());
    }

    #[test]
    fn bindings_resolve_by_name() {
        assert_eq!(writer_by_name("json").expect("json").mime_type(), "application/json");
        assert_eq!(
            writer_by_name("ndjson").expect("ndjson").mime_type(),
            "application/x-ndjson"
        );
        assert!(reader_by_name("ndjson").is_ok());
        assert!(reader_by_name("avro").is_err());
        assert!(writer_by_name("csv").is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
