// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loads complete configuration files from disk and checks what the
//! collector would be built from: the client settings and the read plan.
//!
//! ## Test Categories
//!
//! - `test_file_*`: Whole-file loading in each format
//! - `test_reject_*`: Files that must fail to load

use std::io::Write;
use std::time::Duration;

use uapoll_config::{ConfigError, ConfigLoader, UapollConfig};
use uapoll_opcua::{
    ConfigurationError, NodeId, OpcUaError, SecurityMode, SecurityPolicy, TickHealthPolicy,
    UserIdentity,
};

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn load(suffix: &str, content: &str) -> Result<UapollConfig, ConfigError> {
    let file = write_file(suffix, content);
    ConfigLoader::new()
        .with_env_prefix("UAPOLL_INTEGRATION_TEST")
        .load(file.path())
}

fn configuration_error(err: &ConfigError) -> &ConfigurationError {
    match err.as_opcua() {
        Some(OpcUaError::Configuration(inner)) => inner,
        other => panic!("Expected configuration error, got {:?}", other),
    }
}

// =============================================================================
// Whole-File Loading
// =============================================================================

#[test]
fn test_file_yaml_with_groups() {
    let config = load(
        ".yaml",
        r#"
agent:
  interval: 30s
opcua:
  name: plant
  endpoint: opc.tcp://plc.local:4840
  security_policy: Basic256Sha256
  security_mode: SignAndEncrypt
  auth_method: UserName
  username: operator
  password: hunter2
  nodes:
    - name: uptime
      namespace: "0"
      identifier_type: i
      identifier: "2256"
  group:
    - name: line1
      namespace: "2"
      identifier_type: s
      nodes:
        - name: speed
          identifier: Line1.Speed
        - name: count
          identifier: Line1.Count
"#,
    )
    .unwrap();

    assert_eq!(config.agent.interval, Duration::from_secs(30));

    let client = config.opcua.client_config().unwrap();
    assert_eq!(client.endpoint, "opc.tcp://plc.local:4840");
    assert_eq!(client.security_mode, SecurityMode::SignAndEncrypt);
    assert_eq!(client.security_policy, SecurityPolicy::Basic256Sha256);
    match client.identity {
        UserIdentity::UserName { username, password } => {
            assert_eq!(username, "operator");
            assert_eq!(password, "hunter2");
        }
        other => panic!("Expected UserName identity, got {:?}", other),
    }

    let plan = config.opcua.read_plan().unwrap();
    assert_eq!(plan.metric_names(), ["plant", "line1"]);
    assert_eq!(
        plan.node_ids(),
        [
            NodeId::numeric(0, 2256),
            NodeId::string(2, "Line1.Speed"),
            NodeId::string(2, "Line1.Count"),
        ]
    );
}

#[test]
fn test_file_json_min_good_ratio() {
    let config = load(
        ".json",
        r#"{
  "agent": { "interval": "1m", "tick_health": { "min_good_ratio": 0.75 } },
  "opcua": {
    "endpoint": "opc.tcp://localhost:4840",
    "nodes": [
      { "name": "a", "namespace": "1", "identifier_type": "g", "identifier": "72962b91-fa75-4ae6-8d28-b404dc7daf63" },
      { "name": "b", "namespace": "1", "identifier_type": "b", "identifier": "00010203" }
    ]
  }
}"#,
    )
    .unwrap();

    assert_eq!(config.agent.interval, Duration::from_secs(60));
    assert_eq!(config.agent.tick_health, TickHealthPolicy::MinGoodRatio(0.75));

    let plan = config.opcua.read_plan().unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.metric_names(), ["opcua"]);
}

#[test]
fn test_file_placeholder_default_used() {
    let config = load(
        ".toml",
        r#"
[agent]
tick_health = "all_nodes_good"

[opcua]
endpoint = "${UAPOLL_INTEGRATION_UNSET_ENDPOINT:opc.tcp://fallback:4840}"
"#,
    )
    .unwrap();

    assert_eq!(config.opcua.endpoint, "opc.tcp://fallback:4840");
    assert_eq!(config.agent.tick_health, TickHealthPolicy::AllNodesGood);
}

// =============================================================================
// Rejected Files
// =============================================================================

#[test]
fn test_reject_invalid_endpoint() {
    let err = load(".toml", "[opcua]\nendpoint = \"http://localhost:4840\"\n").unwrap_err();
    assert!(matches!(
        configuration_error(&err),
        ConfigurationError::InvalidEndpoint { .. }
    ));
}

#[test]
fn test_reject_mode_without_policy() {
    let err = load(
        ".toml",
        r#"
[opcua]
security_policy = "None"
security_mode = "Sign"
"#,
    )
    .unwrap_err();
    assert!(matches!(
        configuration_error(&err),
        ConfigurationError::InvalidSecurity { .. }
    ));
}

#[test]
fn test_reject_ratio_out_of_range() {
    let err = load(
        ".toml",
        r#"
[agent]
tick_health = { min_good_ratio = 1.5 }
"#,
    )
    .unwrap_err();
    assert!(matches!(
        configuration_error(&err),
        ConfigurationError::InvalidHealthPolicy { .. }
    ));
}

#[test]
fn test_reject_missing_identifier_type() {
    let err = load(
        ".toml",
        r#"
[opcua]
nodes = [{ name = "x", namespace = "1", identifier = "42" }]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        configuration_error(&err),
        ConfigurationError::MissingIdentifierType { .. }
    ));
}

#[test]
fn test_reject_unknown_key() {
    let err = load(".toml", "[opcua]\nendpont = \"opc.tcp://x:4840\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
