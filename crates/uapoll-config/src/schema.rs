// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for uapoll.
//!
//! # Schema Structure
//!
//! ```text
//! UapollConfig
//! ├── agent: AgentConfig        (tick interval, tick health policy)
//! ├── logging: LoggingConfig
//! └── opcua: OpcUaInputConfig   (endpoint, security, auth, nodes, groups)
//! ```
//!
//! Node-level settings are kept as written and handed to the flattener, so a
//! bad identifier is reported with the same error code whether it came from a
//! file or from code.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uapoll_opcua::{
    ClientConfig, ConfigurationError, GroupSettings, NodeSetting, OpcUaError, ReadPlan,
    SecurityMode, SecurityPolicy, TickHealthPolicy, UserIdentity,
};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default collection interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default metric name for root-level nodes.
pub const DEFAULT_METRIC_NAME: &str = "opcua";

/// Default endpoint.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840";

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for uapoll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UapollConfig {
    /// Collection loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// OPC UA input configuration.
    #[serde(default)]
    pub opcua: OpcUaInputConfig,
}

impl UapollConfig {
    /// Validates the entire configuration.
    ///
    /// This resolves every node, so a configuration that passes here will
    /// flatten without errors.
    pub fn validate(&self) -> ConfigResult<()> {
        self.agent.validate()?;
        self.logging.validate()?;
        self.opcua.client_config()?;
        self.opcua.read_plan()?;
        Ok(())
    }
}

// =============================================================================
// Agent Configuration
// =============================================================================

/// Collection loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Time between ticks.
    #[serde(default = "default_interval", with = "uapoll_opcua::types::humantime_serde")]
    pub interval: Duration,

    /// How a tick with failed nodes is judged.
    #[serde(default)]
    pub tick_health: TickHealthPolicy,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

impl AgentConfig {
    /// Validates the agent configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval.is_zero() {
            return Err(ConfigError::validation(
                "agent.interval",
                "must be greater than zero",
            ));
        }
        self.tick_health.validate()?;
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            tick_health: TickHealthPolicy::default(),
        }
    }
}

// =============================================================================
// OPC UA Input Configuration
// =============================================================================

/// Everything needed to poll one OPC UA endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpcUaInputConfig {
    /// Metric name for root-level nodes and unnamed groups.
    #[serde(default = "default_metric_name", alias = "name")]
    pub metric_name: String,

    /// Server endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upper bound for one connect attempt.
    #[serde(default = "default_connect_timeout", with = "uapoll_opcua::types::humantime_serde")]
    pub connect_timeout: Duration,

    /// Upper bound for one batch read.
    #[serde(default = "default_request_timeout", with = "uapoll_opcua::types::humantime_serde")]
    pub request_timeout: Duration,

    /// Security policy name, or `auto`.
    #[serde(default = "default_auto")]
    pub security_policy: String,

    /// Security mode name, or `auto`.
    #[serde(default = "default_auto")]
    pub security_mode: String,

    /// Client certificate.
    #[serde(default)]
    pub certificate: Option<PathBuf>,

    /// Client private key.
    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// PKI directory for server certificates.
    #[serde(default = "default_pki_dir")]
    pub pki_dir: PathBuf,

    /// Trust every server certificate.
    #[serde(default)]
    pub trust_all_certificates: bool,

    /// `Anonymous`, `UserName` or `Certificate`.
    #[serde(default = "default_auth_method")]
    pub auth_method: String,

    /// Username for `UserName` auth.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for `UserName` auth.
    #[serde(default)]
    pub password: Option<SecretValue>,

    /// Root-level nodes.
    #[serde(default)]
    pub nodes: Vec<NodeSetting>,

    /// Node groups.
    #[serde(default, rename = "group", alias = "groups")]
    pub groups: Vec<GroupSettings>,
}

fn default_metric_name() -> String {
    DEFAULT_METRIC_NAME.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_pki_dir() -> PathBuf {
    PathBuf::from("./pki")
}

fn default_auth_method() -> String {
    "Anonymous".to_string()
}

impl OpcUaInputConfig {
    /// Builds the validated client settings.
    pub fn client_config(&self) -> ConfigResult<ClientConfig> {
        let security_mode: SecurityMode = self.security_mode.parse()?;
        let security_policy: SecurityPolicy = self.security_policy.parse()?;

        let mut builder = ClientConfig::builder()
            .endpoint(&self.endpoint)
            .security_mode(security_mode)
            .security_policy(security_policy)
            .identity(self.identity()?)
            .connect_timeout(self.connect_timeout)
            .request_timeout(self.request_timeout)
            .pki_dir(self.pki_dir.to_string_lossy())
            .trust_all_certificates(self.trust_all_certificates);

        if let Some(cert) = &self.certificate {
            builder = builder.certificate_path(cert.to_string_lossy());
        }
        if let Some(key) = &self.private_key {
            builder = builder.private_key_path(key.to_string_lossy());
        }

        Ok(builder.build()?)
    }

    /// Flattens the configured nodes into the read plan.
    pub fn read_plan(&self) -> ConfigResult<ReadPlan> {
        Ok(ReadPlan::build(&self.nodes, &self.groups, &self.metric_name)?)
    }

    /// Total number of configured nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() + self.groups.iter().map(|g| g.nodes.len()).sum::<usize>()
    }

    fn identity(&self) -> ConfigResult<UserIdentity> {
        let identity = match parse_auth_method(&self.auth_method)? {
            AuthMethod::Anonymous => UserIdentity::Anonymous,
            AuthMethod::UserName => UserIdentity::UserName {
                username: self.username.clone().unwrap_or_default(),
                password: self
                    .password
                    .as_ref()
                    .map(|p| p.expose().to_string())
                    .unwrap_or_default(),
            },
            AuthMethod::Certificate => UserIdentity::Certificate {
                certificate_path: path_or_empty(&self.certificate),
                private_key_path: path_or_empty(&self.private_key),
            },
        };
        Ok(identity)
    }
}

impl Default for OpcUaInputConfig {
    fn default() -> Self {
        Self {
            metric_name: default_metric_name(),
            endpoint: default_endpoint(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            security_policy: default_auto(),
            security_mode: default_auto(),
            certificate: None,
            private_key: None,
            pki_dir: default_pki_dir(),
            trust_all_certificates: false,
            auth_method: default_auth_method(),
            username: None,
            password: None,
            nodes: Vec::new(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMethod {
    Anonymous,
    UserName,
    Certificate,
}

fn parse_auth_method(value: &str) -> ConfigResult<AuthMethod> {
    match value.trim().to_lowercase().as_str() {
        "" | "anonymous" => Ok(AuthMethod::Anonymous),
        "username" => Ok(AuthMethod::UserName),
        "certificate" => Ok(AuthMethod::Certificate),
        _ => Err(OpcUaError::configuration(ConfigurationError::invalid_auth_method(value)).into()),
    }
}

fn path_or_empty(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    #[serde(alias = "warning")]
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Single-line compact text.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }

    /// Parses a format name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Secret Value
// =============================================================================

/// A secret that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plain value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue(***)")
    }
}
