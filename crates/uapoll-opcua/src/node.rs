// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node configuration model.
//!
//! A configured node is resolved in two explicit levels: its own settings,
//! then the [`NodeDefaults`] of the level it was declared in (the plugin root
//! or a group). [`NodeSetting::merge`] is pure, so the same setting can be
//! resolved against different defaults without either side changing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{OpcUaValue, Quality, ReadResult};
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::types::NodeId;

// =============================================================================
// NodeSetting
// =============================================================================

/// One node as written in configuration.
///
/// Empty strings count as absent, so `namespace = ""` inherits like an
/// omitted key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSetting {
    /// Field name in the emitted metric. Unique across the whole plugin.
    #[serde(default, alias = "name")]
    pub field_name: String,

    /// Namespace index, as text.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Identifier type code (`i`, `s`, `g`, `b`).
    #[serde(default)]
    pub identifier_type: Option<String>,

    /// Raw identifier.
    #[serde(default)]
    pub identifier: String,
}

impl NodeSetting {
    /// Creates a setting that inherits namespace and identifier type.
    pub fn new(field_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            namespace: None,
            identifier_type: None,
            identifier: identifier.into(),
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the identifier type code.
    pub fn with_identifier_type(mut self, identifier_type: impl Into<String>) -> Self {
        self.identifier_type = Some(identifier_type.into());
        self
    }

    /// Combines this setting with inherited defaults. Own values win.
    pub fn merge<'a>(&'a self, defaults: &'a NodeDefaults) -> EffectiveSetting<'a> {
        EffectiveSetting {
            field_name: &self.field_name,
            metric_name: &defaults.metric_name,
            namespace: present(self.namespace.as_deref())
                .or_else(|| present(defaults.namespace.as_deref())),
            identifier_type: present(self.identifier_type.as_deref())
                .or_else(|| present(defaults.identifier_type.as_deref())),
            identifier: &self.identifier,
            group_name: defaults.group_name.as_deref(),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// NodeDefaults
// =============================================================================

/// Values a node inherits from the level it was declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDefaults {
    /// Metric name every node at this level reports under.
    pub metric_name: String,

    /// Inherited namespace.
    pub namespace: Option<String>,

    /// Inherited identifier type code.
    pub identifier_type: Option<String>,

    /// Group the node belongs to, `None` at the root.
    pub group_name: Option<String>,
}

impl NodeDefaults {
    /// Defaults for root-level nodes: no inherited namespace or type.
    pub fn root(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            ..Default::default()
        }
    }

    /// Defaults for nodes declared inside a group.
    pub fn group(
        metric_name: impl Into<String>,
        namespace: Option<String>,
        identifier_type: Option<String>,
    ) -> Self {
        let metric_name = metric_name.into();
        Self {
            group_name: Some(metric_name.clone()),
            metric_name,
            namespace,
            identifier_type,
        }
    }
}

/// A node setting after inheritance, borrowed from its two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSetting<'a> {
    /// Field name.
    pub field_name: &'a str,
    /// Metric name.
    pub metric_name: &'a str,
    /// Effective namespace, if any level provides one.
    pub namespace: Option<&'a str>,
    /// Effective identifier type, if any level provides one.
    pub identifier_type: Option<&'a str>,
    /// Raw identifier.
    pub identifier: &'a str,
    /// Group name.
    pub group_name: Option<&'a str>,
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves one configured node against its inherited defaults.
///
/// # Errors
///
/// Checked in this order:
/// - `MissingFieldName` for an empty field name
/// - `MissingIdentifierType` when no level provides a namespace or type
/// - `InvalidNamespace` / `InvalidIdentifier` from the identifier resolver
///
/// # Examples
///
/// ```
/// use uapoll_opcua::node::{resolve, NodeDefaults, NodeSetting};
/// use uapoll_opcua::types::NodeId;
///
/// let defaults = NodeDefaults::group("foo", Some("3".into()), Some("i".into()));
/// let node = resolve(&NodeSetting::new("name3", "3000"), &defaults).unwrap();
///
/// assert_eq!(node.node_id, NodeId::numeric(3, 3000));
/// assert_eq!(node.metric_name, "foo");
/// ```
pub fn resolve(setting: &NodeSetting, defaults: &NodeDefaults) -> OpcUaResult<ResolvedNode> {
    let effective = setting.merge(defaults);

    if effective.field_name.is_empty() {
        return Err(OpcUaError::configuration(ConfigurationError::missing_field_name(
            effective.identifier,
        )));
    }

    let namespace = effective.namespace.ok_or_else(|| {
        OpcUaError::configuration(ConfigurationError::missing_identifier_type(
            effective.field_name,
            "namespace",
        ))
    })?;
    let identifier_type = effective.identifier_type.ok_or_else(|| {
        OpcUaError::configuration(ConfigurationError::missing_identifier_type(
            effective.field_name,
            "identifier_type",
        ))
    })?;

    let node_id = NodeId::resolve(namespace, identifier_type, effective.identifier)?;

    Ok(ResolvedNode::new(
        effective.field_name,
        effective.metric_name,
        node_id,
        effective.group_name.map(str::to_string),
    ))
}

// =============================================================================
// ResolvedNode
// =============================================================================

/// A fully addressed node plus the outcome of its latest read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNode {
    /// Field name in the emitted metric.
    pub field_name: String,

    /// Metric the field belongs to.
    pub metric_name: String,

    /// Resolved address.
    pub node_id: NodeId,

    /// Group the node was declared in, `None` for root nodes.
    pub group_name: Option<String>,

    /// Last usable value. Kept across bad reads.
    pub value: Option<OpcUaValue>,

    /// Quality of the latest read, `None` until the node is first read.
    pub quality: Option<Quality>,

    /// Status code of the latest read. Only meaningful once `quality` is set.
    pub status_code: u32,

    /// Timestamp of the last usable value.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ResolvedNode {
    /// Creates a node that has not been read yet.
    pub fn new(
        field_name: impl Into<String>,
        metric_name: impl Into<String>,
        node_id: NodeId,
        group_name: Option<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            metric_name: metric_name.into(),
            node_id,
            group_name,
            value: None,
            quality: None,
            status_code: 0,
            timestamp: None,
        }
    }

    /// Applies one read result to this node.
    ///
    /// Good and uncertain results replace the value and timestamp. Bad
    /// results only record the status; the previous value is retained, as
    /// it is when a usable status arrives without a value.
    pub fn apply(&mut self, result: ReadResult) -> Quality {
        let quality = result.quality();
        self.status_code = result.status_code;
        self.quality = Some(quality);

        if quality.is_bad() {
            return quality;
        }

        let timestamp = result.timestamp();
        if let Some(value) = result.value {
            self.timestamp = timestamp;
            self.value = Some(value);
        }
        quality
    }

    /// Returns `true` once the node has been read at least once.
    #[inline]
    pub fn is_read(&self) -> bool {
        self.quality.is_some()
    }

    /// Returns `true` once a usable value has been read.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeIdentifier;

    #[test]
    fn test_merge_prefers_own_values() {
        let defaults = NodeDefaults::group("foo", Some("3".into()), Some("i".into()));
        let setting = NodeSetting::new("n", "x")
            .with_namespace("5")
            .with_identifier_type("s");

        let effective = setting.merge(&defaults);
        assert_eq!(effective.namespace, Some("5"));
        assert_eq!(effective.identifier_type, Some("s"));
        assert_eq!(effective.metric_name, "foo");
        assert_eq!(effective.group_name, Some("foo"));

        // Inputs are untouched.
        assert_eq!(setting.namespace.as_deref(), Some("5"));
        assert_eq!(defaults.namespace.as_deref(), Some("3"));
    }

    #[test]
    fn test_merge_treats_empty_as_absent() {
        let defaults = NodeDefaults::group("foo", Some("3".into()), Some("i".into()));
        let setting = NodeSetting::new("n", "3000")
            .with_namespace("")
            .with_identifier_type("");

        let effective = setting.merge(&defaults);
        assert_eq!(effective.namespace, Some("3"));
        assert_eq!(effective.identifier_type, Some("i"));
    }

    #[test]
    fn test_resolve_root_node() {
        let setting = NodeSetting::new("name", "one")
            .with_namespace("1")
            .with_identifier_type("s");
        let node = resolve(&setting, &NodeDefaults::root("opcua")).unwrap();

        assert_eq!(node.field_name, "name");
        assert_eq!(node.metric_name, "opcua");
        assert_eq!(node.node_id, NodeId::string(1, "one"));
        assert_eq!(node.group_name, None);
        assert!(!node.has_value());
    }

    #[test]
    fn test_resolve_root_without_namespace_fails() {
        let setting = NodeSetting::new("name", "one").with_identifier_type("s");
        let err = resolve(&setting, &NodeDefaults::root("opcua")).unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::MissingIdentifierType {
                missing: "namespace",
                ..
            })
        ));

        let setting = NodeSetting::new("name", "one").with_namespace("1");
        let err = resolve(&setting, &NodeDefaults::root("opcua")).unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::MissingIdentifierType {
                missing: "identifier_type",
                ..
            })
        ));
    }

    #[test]
    fn test_field_name_checked_first() {
        // Also missing namespace and type, but the field name wins.
        let setting = NodeSetting::new("", "one");
        let err = resolve(&setting, &NodeDefaults::root("opcua")).unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::MissingFieldName { .. })
        ));
    }

    #[test]
    fn test_resolve_invalid_identifier() {
        let defaults = NodeDefaults::group("foo", Some("3".into()), Some("i".into()));
        let err = resolve(&NodeSetting::new("bad", "abc"), &defaults).unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Configuration(ConfigurationError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_apply_good_then_bad_keeps_value() {
        let mut node = ResolvedNode::new("t", "m", NodeId::numeric(0, 2261), None);

        assert!(!node.is_read());
        assert_eq!(node.quality, None);

        node.apply(ReadResult::success(OpcUaValue::String("open62541".into())));
        assert!(node.is_read());
        assert_eq!(node.quality, Some(Quality::Good));
        assert_eq!(node.value, Some(OpcUaValue::String("open62541".into())));
        let first_timestamp = node.timestamp;
        assert!(first_timestamp.is_some());

        node.apply(ReadResult::failure(0x8034_0000));
        assert_eq!(node.quality, Some(Quality::Bad));
        assert_eq!(node.status_code, 0x8034_0000);
        assert_eq!(node.value, Some(OpcUaValue::String("open62541".into())));
        assert_eq!(node.timestamp, first_timestamp);
    }

    #[test]
    fn test_apply_uncertain_replaces_value() {
        let mut node = ResolvedNode::new("t", "m", NodeId::numeric(0, 1), None);
        node.apply(ReadResult::success(OpcUaValue::Double(1.0)));
        node.apply(ReadResult::with_status(Some(OpcUaValue::Double(2.0)), 0x4090_0000));

        assert_eq!(node.quality, Some(Quality::Uncertain));
        assert_eq!(node.value, Some(OpcUaValue::Double(2.0)));
    }

    #[test]
    fn test_apply_good_without_value_keeps_previous() {
        let mut node = ResolvedNode::new("t", "m", NodeId::numeric(0, 1), None);
        node.apply(ReadResult::success(OpcUaValue::Int32(7)));
        let first_timestamp = node.timestamp;

        let quality = node.apply(ReadResult::with_status(None, 0));
        assert_eq!(quality, Quality::Good);
        assert_eq!(node.quality, Some(Quality::Good));
        assert_eq!(node.value, Some(OpcUaValue::Int32(7)));
        assert_eq!(node.timestamp, first_timestamp);
    }

    #[test]
    fn test_node_setting_deserializes_from_toml() {
        let setting: NodeSetting = toml::from_str(
            r#"
            field_name = "name3"
            namespace = ""
            identifier = "3000"
            "#,
        )
        .unwrap();
        assert_eq!(setting.namespace.as_deref(), Some(""));
        assert_eq!(setting.identifier_type, None);

        let defaults = NodeDefaults::group("foo", Some("3".into()), Some("i".into()));
        let merged = setting.merge(&defaults);
        assert_eq!(merged.namespace, Some("3"));
        assert!(matches!(
            NodeId::resolve("3", "i", merged.identifier).unwrap().identifier,
            NodeIdentifier::Numeric(3000)
        ));
    }
}
