// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JSON-lines record output.
//!
//! Each emitted record becomes one line:
//!
//! ```text
//! {"name":"opcua","fields":{"name":42.0,"name2":"abc"},"timestamp":"2025-01-01T00:00:00Z"}
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use uapoll_opcua::{MetricRecord, MetricSink};

/// Sink writing one JSON object per record.
///
/// Output is flushed after every tick so lines show up as soon as they are
/// collected.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<Box<dyn Write + Send>> {
    /// Opens the output target. `-` means stdout; anything else is created
    /// or truncated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let writer: Box<dyn Write + Send> = if path.as_os_str() == "-" {
            Box::new(io::stdout())
        } else {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write + Send> MetricSink for JsonLinesSink<W> {
    fn emit(&mut self, records: &[MetricRecord]) -> io::Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use uapoll_opcua::OpcUaValue;

    fn record(name: &str, fields: &[(&str, OpcUaValue)]) -> MetricRecord {
        MetricRecord {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&[
            record("opcua", &[("name", OpcUaValue::Double(42.0))]),
            record("foo", &[("name3", OpcUaValue::String("abc".into()))]),
        ])
        .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "opcua");
        assert_eq!(first["fields"]["name"], 42.0);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["name"], "foo");
        assert_eq!(second["fields"]["name3"], "abc");
        assert!(second["timestamp"].as_str().unwrap().starts_with("2025-01-01T00:00:00"));
    }

    #[test]
    fn test_open_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut sink = JsonLinesSink::open(&path).unwrap();
        sink.emit(&[record("opcua", &[("ok", OpcUaValue::Boolean(true))])])
            .unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"ok\":true"));
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("records.jsonl");

        let err = JsonLinesSink::open(&path).err().unwrap();
        assert!(err.to_string().contains("failed to create output file"));
    }
}
