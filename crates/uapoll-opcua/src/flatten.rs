// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group/root flattening.
//!
//! Root nodes and grouped nodes are flattened into one ordered list: root
//! nodes first, then each group in declaration order, each keeping its own
//! declaration order. That list is the single positional source of truth for
//! every read, so flattening the same configuration twice yields the same
//! order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::node::{resolve, NodeDefaults, NodeSetting, ResolvedNode};
use crate::types::NodeId;

// =============================================================================
// GroupSettings
// =============================================================================

/// A group of nodes sharing a metric name and optional defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSettings {
    /// Metric name for the group's nodes. Empty means the plugin's name.
    #[serde(default, alias = "name")]
    pub metric_name: String,

    /// Namespace inherited by the group's nodes.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Identifier type inherited by the group's nodes.
    #[serde(default)]
    pub identifier_type: Option<String>,

    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeSetting>,
}

impl GroupSettings {
    /// Creates an empty group.
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            ..Default::default()
        }
    }

    /// Sets the inherited namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the inherited identifier type.
    pub fn with_identifier_type(mut self, identifier_type: impl Into<String>) -> Self {
        self.identifier_type = Some(identifier_type.into());
        self
    }

    /// Appends a node.
    pub fn with_node(mut self, node: NodeSetting) -> Self {
        self.nodes.push(node);
        self
    }

    fn defaults(&self, plugin_metric_name: &str) -> NodeDefaults {
        let metric_name = if self.metric_name.is_empty() {
            plugin_metric_name
        } else {
            &self.metric_name
        };
        NodeDefaults::group(metric_name, self.namespace.clone(), self.identifier_type.clone())
    }
}

// =============================================================================
// flatten
// =============================================================================

/// Flattens root nodes and groups into the ordered read list.
///
/// # Errors
///
/// The first node that fails to resolve, or `DuplicateFieldName` when two
/// nodes anywhere in the list share a field name.
///
/// # Examples
///
/// ```
/// use uapoll_opcua::flatten::{flatten, GroupSettings};
/// use uapoll_opcua::node::NodeSetting;
///
/// let root = vec![NodeSetting::new("name", "one")
///     .with_namespace("1")
///     .with_identifier_type("s")];
/// let groups = vec![GroupSettings::new("foo")
///     .with_namespace("3")
///     .with_identifier_type("i")
///     .with_node(NodeSetting::new("name3", "3000"))];
///
/// let nodes = flatten(&root, &groups, "opcua").unwrap();
/// let fields: Vec<_> = nodes.iter().map(|n| n.field_name.as_str()).collect();
/// assert_eq!(fields, ["name", "name3"]);
/// ```
pub fn flatten(
    root_nodes: &[NodeSetting],
    groups: &[GroupSettings],
    plugin_metric_name: &str,
) -> OpcUaResult<Vec<ResolvedNode>> {
    let total = root_nodes.len() + groups.iter().map(|g| g.nodes.len()).sum::<usize>();
    let mut nodes = Vec::with_capacity(total);

    let root_defaults = NodeDefaults::root(plugin_metric_name);
    for setting in root_nodes {
        nodes.push(resolve(setting, &root_defaults)?);
    }

    for group in groups {
        let defaults = group.defaults(plugin_metric_name);
        for setting in &group.nodes {
            nodes.push(resolve(setting, &defaults)?);
        }
    }

    check_unique_field_names(&nodes)?;

    tracing::debug!(
        root_nodes = root_nodes.len(),
        groups = groups.len(),
        total = nodes.len(),
        "Flattened node configuration"
    );

    Ok(nodes)
}

fn check_unique_field_names(nodes: &[ResolvedNode]) -> OpcUaResult<()> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        if let Some(first_metric) = seen.insert(&node.field_name, &node.metric_name) {
            return Err(OpcUaError::configuration(
                ConfigurationError::duplicate_field_name(
                    &node.field_name,
                    first_metric,
                    &node.metric_name,
                ),
            ));
        }
    }

    Ok(())
}

// =============================================================================
// ReadPlan
// =============================================================================

/// The flattened node list together with its address list.
#[derive(Debug, Clone)]
pub struct ReadPlan {
    nodes: Vec<ResolvedNode>,
    node_ids: Vec<NodeId>,
}

impl ReadPlan {
    /// Flattens the configuration into a plan.
    pub fn build(
        root_nodes: &[NodeSetting],
        groups: &[GroupSettings],
        plugin_metric_name: &str,
    ) -> OpcUaResult<Self> {
        flatten(root_nodes, groups, plugin_metric_name).map(Self::from_nodes)
    }

    /// Wraps an already flattened list.
    pub fn from_nodes(nodes: Vec<ResolvedNode>) -> Self {
        let node_ids = nodes.iter().map(|n| n.node_id.clone()).collect();
        Self { nodes, node_ids }
    }

    /// Returns the nodes in read order.
    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    /// Returns the addresses in read order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Returns the distinct metric names in first-appearance order.
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if !names.contains(&node.metric_name.as_str()) {
                names.push(&node.metric_name);
            }
        }
        names
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the plan has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consumes the plan, returning the nodes.
    pub fn into_nodes(self) -> Vec<ResolvedNode> {
        self.nodes
    }
}

// =============================================================================
// Tests
// =============================================================================
