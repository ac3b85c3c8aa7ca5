// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Metric mapping.
//!
//! After each tick the node list is folded into one [`MetricRecord`] per
//! distinct metric name, in the order metric names first appear. Nodes that
//! have never produced a usable value are left out.

use std::collections::BTreeMap;
use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::OpcUaValue;
use crate::node::ResolvedNode;

// =============================================================================
// MetricRecord
// =============================================================================

/// One metric emitted for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    /// Metric name.
    pub name: String,

    /// Field values keyed by field name.
    pub fields: BTreeMap<String, OpcUaValue>,

    /// Tick timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// Returns a field value.
    pub fn field(&self, name: &str) -> Option<&OpcUaValue> {
        self.fields.get(name)
    }
}

/// Builds the records for one tick.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uapoll_opcua::client::{OpcUaValue, ReadResult};
/// use uapoll_opcua::metric::to_metrics;
/// use uapoll_opcua::node::ResolvedNode;
/// use uapoll_opcua::types::NodeId;
///
/// let mut node = ResolvedNode::new("product_name", "opcua", NodeId::numeric(0, 2261), None);
/// node.apply(ReadResult::success(OpcUaValue::String("open62541".into())));
///
/// let records = to_metrics(&[node], Utc::now());
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].name, "opcua");
/// ```
pub fn to_metrics(nodes: &[ResolvedNode], tick_timestamp: DateTime<Utc>) -> Vec<MetricRecord> {
    let mut records: Vec<MetricRecord> = Vec::new();

    for node in nodes {
        let Some(value) = &node.value else {
            continue;
        };

        let index = match records.iter().position(|r| r.name == node.metric_name) {
            Some(index) => index,
            None => {
                records.push(MetricRecord {
                    name: node.metric_name.clone(),
                    fields: BTreeMap::new(),
                    timestamp: tick_timestamp,
                });
                records.len() - 1
            }
        };

        records[index]
            .fields
            .insert(node.field_name.clone(), value.clone());
    }

    records
}

// =============================================================================
// MetricSink
// =============================================================================

/// Destination for emitted records.
pub trait MetricSink: Send {
    /// Emits the records of one tick.
    fn emit(&mut self, records: &[MetricRecord]) -> io::Result<()>;

    /// Flushes buffered output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<MetricRecord>,
    batches: usize,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record emitted so far.
    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Returns the number of `emit` calls.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Takes the collected records, leaving the sink empty.
    pub fn take(&mut self) -> Vec<MetricRecord> {
        std::mem::take(&mut self.records)
    }
}

impl MetricSink for MemorySink {
    fn emit(&mut self, records: &[MetricRecord]) -> io::Result<()> {
        self.batches += 1;
        self.records.extend_from_slice(records);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ReadResult;
    use crate::types::NodeId;

    fn node(field: &str, metric: &str, value: Option<OpcUaValue>) -> ResolvedNode {
        let mut node = ResolvedNode::new(field, metric, NodeId::numeric(1, 1), None);
        if let Some(value) = value {
            node.apply(ReadResult::success(value));
        }
        node
    }

    #[test]
    fn test_groups_by_metric_in_first_appearance_order() {
        let nodes = vec![
            node("name", "opcua", Some(OpcUaValue::Int32(1))),
            node("name3", "foo", Some(OpcUaValue::Int32(3))),
            node("name2", "opcua", Some(OpcUaValue::Int32(2))),
        ];
        let now = Utc::now();
        let records = to_metrics(&nodes, now);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "opcua");
        assert_eq!(records[0].fields.len(), 2);
        assert_eq!(records[0].field("name2"), Some(&OpcUaValue::Int32(2)));
        assert_eq!(records[1].name, "foo");
        assert_eq!(records[1].timestamp, now);
    }

    #[test]
    fn test_omits_nodes_without_value() {
        let nodes = vec![
            node("a", "opcua", Some(OpcUaValue::Boolean(true))),
            node("b", "opcua", None),
            node("c", "empty", None),
        ];
        let records = to_metrics(&nodes, Utc::now());

        assert_eq!(records.len(), 1);
        assert!(records[0].field("b").is_none());
    }

    #[test]
    fn test_record_serializes_plain_values() {
        let nodes = vec![node("temp", "opcua", Some(OpcUaValue::Double(21.5)))];
        let records = to_metrics(&nodes, Utc::now());
        let json = serde_json::to_value(&records[0]).unwrap();

        assert_eq!(json["name"], "opcua");
        assert_eq!(json["fields"]["temp"], 21.5);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        let records = to_metrics(&[node("a", "m", Some(OpcUaValue::Int32(1)))], Utc::now());
        sink.emit(&records).unwrap();
        sink.emit(&[]).unwrap();

        assert_eq!(sink.batches(), 2);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.records().is_empty());
    }
}
