// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch reading.
//!
//! One tick reads every node in a single request. Results come back
//! positionally: result `i` belongs to node `i` of the flattened list. A
//! request-level failure leaves every node untouched; per-node bad statuses
//! are recorded on the node and listed in the [`ReadSummary`].

use std::time::Duration;

use serde::Serialize;

use crate::client::session::SessionManager;
use crate::client::transport::{OpcUaTransport, OpcUaValue, Quality};
use crate::error::{FailureReason, OpcUaError, OpcUaResult, OperationError};
use crate::node::ResolvedNode;
use crate::types::NodeId;

// =============================================================================
// BatchReader
// =============================================================================

/// Issues one bounded multi-node read per tick.
#[derive(Debug, Clone, Copy)]
pub struct BatchReader {
    request_timeout: Duration,
}

impl BatchReader {
    /// Creates a reader with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Returns the request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Reads all nodes and applies the results in place.
    ///
    /// # Errors
    ///
    /// `BatchReadFailed` on timeout, transport failure, or when the server
    /// returns a different number of results than requested. No node is
    /// modified in that case.
    pub async fn read_all<T: OpcUaTransport>(
        &self,
        session: &mut SessionManager<T>,
        nodes: &mut [ResolvedNode],
    ) -> OpcUaResult<ReadSummary> {
        if nodes.is_empty() {
            return Ok(ReadSummary::default());
        }

        let node_ids: Vec<NodeId> = nodes.iter().map(|n| n.node_id.clone()).collect();
        let results = session.read_values(&node_ids, self.request_timeout).await?;

        if results.len() != nodes.len() {
            return Err(OpcUaError::operation(OperationError::batch_read_failed(
                nodes.len(),
                FailureReason::ResultCountMismatch {
                    expected: nodes.len(),
                    actual: results.len(),
                },
            )));
        }

        let mut summary = ReadSummary::default();
        for (node, result) in nodes.iter_mut().zip(results) {
            let quality = node.apply(result);
            summary.record(node, quality);
            tracing::trace!(
                field = %node.field_name,
                node_id = %node.node_id,
                quality = ?quality,
                value_type = node.value.as_ref().map_or("none", OpcUaValue::type_name),
                "Node read"
            );
        }

        tracing::debug!(
            good = summary.good,
            uncertain = summary.uncertain,
            bad = summary.bad,
            "Batch read complete"
        );

        Ok(summary)
    }
}

// =============================================================================
// ReadSummary
// =============================================================================

/// Per-tick counts of node qualities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadSummary {
    /// Nodes with good status.
    pub good: usize,

    /// Nodes with uncertain status.
    pub uncertain: usize,

    /// Nodes with bad status.
    pub bad: usize,

    /// Details for every bad node, in read order.
    pub failures: Vec<NodeFailure>,
}

impl ReadSummary {
    fn record(&mut self, node: &ResolvedNode, quality: Quality) {
        match quality {
            Quality::Good => self.good += 1,
            Quality::Uncertain => self.uncertain += 1,
            Quality::Bad => {
                self.bad += 1;
                self.failures.push(NodeFailure {
                    field_name: node.field_name.clone(),
                    status_code: node.status_code,
                    status_name: OperationError::status_code_name(node.status_code),
                });
            }
        }
    }

    /// Total number of nodes read.
    pub fn total(&self) -> usize {
        self.good + self.uncertain + self.bad
    }

    /// Returns `true` if every node read good.
    pub fn all_good(&self) -> bool {
        self.uncertain == 0 && self.bad == 0
    }

    /// Fraction of nodes with good status, `1.0` for an empty read.
    pub fn good_ratio(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => self.good as f64 / total as f64,
        }
    }
}

/// A node that read with a bad status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    /// Field name of the node.
    pub field_name: String,

    /// Status code returned by the server.
    pub status_code: u32,

    /// Symbolic status name.
    pub status_name: &'static str,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::{OpcUaValue, ReadResult};
    use async_trait::async_trait;

    struct ScriptedTransport {
        connected: bool,
        results: Vec<ReadResult>,
    }

    #[async_trait]
    impl OpcUaTransport for ScriptedTransport {
        async fn connect(&mut self) -> OpcUaResult<()> {
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> OpcUaResult<()> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn read_values(&self, _node_ids: &[NodeId]) -> OpcUaResult<Vec<ReadResult>> {
            Ok(self.results.clone())
        }

        fn endpoint(&self) -> &str {
            "opc.tcp://scripted:4840"
        }
    }

    fn nodes() -> Vec<ResolvedNode> {
        vec![
            ResolvedNode::new("a", "m", NodeId::numeric(0, 2261), None),
            ResolvedNode::new("b", "m", NodeId::numeric(0, 2262), None),
            ResolvedNode::new("c", "m", NodeId::numeric(0, 2263), None),
        ]
    }

    async fn session(results: Vec<ReadResult>) -> SessionManager<ScriptedTransport> {
        let mut session = SessionManager::new(
            ScriptedTransport {
                connected: false,
                results,
            },
            Duration::from_secs(1),
        );
        session.connect().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_positional_application() {
        let mut session = session(vec![
            ReadResult::success(OpcUaValue::String("open62541 OPC UA Server".into())),
            ReadResult::with_status(Some(OpcUaValue::Int32(7)), 0x4090_0000),
            ReadResult::failure(0x8034_0000),
        ])
        .await;
        let mut nodes = nodes();

        let summary = BatchReader::new(Duration::from_secs(1))
            .read_all(&mut session, &mut nodes)
            .await
            .unwrap();

        assert_eq!(summary.good, 1);
        assert_eq!(summary.uncertain, 1);
        assert_eq!(summary.bad, 1);
        assert_eq!(
            summary.failures,
            vec![NodeFailure {
                field_name: "c".into(),
                status_code: 0x8034_0000,
                status_name: "BadNodeIdUnknown",
            }]
        );
        assert_eq!(
            nodes[0].value,
            Some(OpcUaValue::String("open62541 OPC UA Server".into()))
        );
        assert_eq!(nodes[1].quality, Some(Quality::Uncertain));
        assert_eq!(nodes[2].quality, Some(Quality::Bad));
        assert_eq!(nodes[2].value, None);
    }

    #[tokio::test]
    async fn test_length_mismatch_touches_nothing() {
        let mut session = session(vec![ReadResult::success(OpcUaValue::Int32(1))]).await;
        let mut nodes = nodes();
        let before = nodes.clone();

        let err = BatchReader::new(Duration::from_secs(1))
            .read_all(&mut session, &mut nodes)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpcUaError::Operation(OperationError::BatchReadFailed {
                node_count: 3,
                reason: FailureReason::ResultCountMismatch {
                    expected: 3,
                    actual: 1
                },
            })
        ));
        assert_eq!(nodes, before);
    }

    #[tokio::test]
    async fn test_empty_node_list() {
        let mut session = session(Vec::new()).await;
        let summary = BatchReader::new(Duration::from_secs(1))
            .read_all(&mut session, &mut [])
            .await
            .unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.all_good());
        assert_eq!(summary.good_ratio(), 1.0);
    }

    #[test]
    fn test_good_ratio() {
        let summary = ReadSummary {
            good: 3,
            uncertain: 0,
            bad: 1,
            failures: Vec::new(),
        };
        assert_eq!(summary.good_ratio(), 0.75);
        assert!(!summary.all_good());
    }
}
