// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA addressing and client configuration types.
//!
//! - **NodeId**: Namespace index plus one of the four identifier kinds
//! - **SecurityMode/Policy**: Message security settings, including `Auto`
//! - **UserIdentity**: How the session authenticates
//! - **ClientConfig**: Everything the transport needs to open a session
//!
//! # Examples
//!
//! ```
//! use uapoll_opcua::types::{ClientConfig, NodeId, SecurityMode};
//!
//! let node_id = NodeId::string(1, "one");
//! assert_eq!(node_id.to_opc_string(), "ns=1;s=one");
//!
//! let config = ClientConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .security_mode(SecurityMode::None)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.endpoint, "opc.tcp://localhost:4840");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::identifier::{parse_namespace, IdentifierType};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// Immutable once resolved. The textual form is `ns=<n>;<t>=<v>`, with the
/// namespace omitted for namespace 0 and opaque bytes rendered as lowercase
/// hex. Parsing the textual form yields an equal `NodeId`.
///
/// # Examples
///
/// ```
/// use uapoll_opcua::types::NodeId;
///
/// let numeric = NodeId::numeric(0, 2261);
/// assert_eq!(numeric.to_opc_string(), "i=2261");
///
/// let parsed: NodeId = "ns=3;i=3000".parse().unwrap();
/// assert_eq!(parsed, NodeId::numeric(3, 3000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Resolves a node ID from its configured string parts.
    ///
    /// # Errors
    ///
    /// `InvalidNamespace` if the namespace does not parse, `InvalidIdentifier`
    /// if the identifier does not match its type code.
    pub fn resolve(namespace: &str, type_code: &str, raw: &str) -> OpcUaResult<Self> {
        let namespace_index = parse_namespace(namespace)?;
        let identifier = crate::identifier::resolve_identifier(type_code, raw)?;
        Ok(Self {
            namespace_index,
            identifier,
        })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the identifier kind.
    pub const fn identifier_type(&self) -> IdentifierType {
        self.identifier.identifier_type()
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts to the OPC UA string format.
    ///
    /// ```
    /// use uapoll_opcua::types::NodeId;
    ///
    /// assert_eq!(NodeId::numeric(2, 1001).to_opc_string(), "ns=2;i=1001");
    /// assert_eq!(NodeId::opaque(1, vec![0xAB, 0x01]).to_opc_string(), "ns=1;b=ab01");
    /// ```
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses `ns=<n>;<t>=<v>` or `<t>=<v>` (namespace 0).
    ///
    /// Whitespace is skipped before the prefix only; everything after the
    /// type code's `=` is the identifier as written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest.split_once(';').ok_or_else(|| {
                    OpcUaError::configuration(ConfigurationError::invalid_identifier(
                        "",
                        s,
                        "missing identifier after namespace",
                    ))
                })?;
                (parse_namespace(ns)?, id)
            }
            None => (0, s),
        };

        let (code, raw) = identifier_part.split_once('=').ok_or_else(|| {
            OpcUaError::configuration(ConfigurationError::invalid_identifier(
                "",
                s,
                "expected <type>=<identifier>",
            ))
        })?;

        let identifier_type: IdentifierType = code.parse()?;
        Ok(Self {
            namespace_index,
            identifier: identifier_type.parse(raw)?,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The identifier part of a node address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier (byte string).
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Returns the identifier kind.
    pub const fn identifier_type(&self) -> IdentifierType {
        match self {
            Self::Numeric(_) => IdentifierType::Numeric,
            Self::String(_) => IdentifierType::String,
            Self::Guid(_) => IdentifierType::Guid,
            Self::Opaque(_) => IdentifierType::Opaque,
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", hex::encode(v)),
        }
    }
}

// =============================================================================
// SecurityMode
// =============================================================================

/// OPC UA message security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Pick the most secure mode the server offers.
    #[default]
    Auto,

    /// Messages are neither signed nor encrypted.
    None,

    /// Messages are signed but not encrypted.
    Sign,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Returns `true` if the mode is chosen from the server's endpoints.
    #[inline]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Returns `true` if this mode provides no security.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityMode {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "auto" | "" => Ok(Self::Auto),
            "none" | "nosecurity" => Ok(Self::None),
            "sign" | "signed" => Ok(Self::Sign),
            "signandencrypt" | "signencrypt" | "encrypted" => Ok(Self::SignAndEncrypt),
            _ => Err(OpcUaError::configuration(
                ConfigurationError::invalid_security_mode(s),
            )),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// OPC UA security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// Pick the most secure policy the server offers.
    #[default]
    Auto,

    /// No security policy.
    None,

    /// Basic128Rsa15 (deprecated).
    Basic128Rsa15,

    /// Basic256 (deprecated).
    Basic256,

    /// Basic256Sha256.
    Basic256Sha256,

    /// Aes128Sha256RsaOaep.
    Aes128Sha256RsaOaep,

    /// Aes256Sha256RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the OPC UA policy URI, or `None` for `Auto`.
    pub const fn uri(&self) -> Option<&'static str> {
        match self {
            Self::Auto => Option::None,
            Self::None => Some("http://opcfoundation.org/UA/SecurityPolicy#None"),
            Self::Basic128Rsa15 => Some("http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15"),
            Self::Basic256 => Some("http://opcfoundation.org/UA/SecurityPolicy#Basic256"),
            Self::Basic256Sha256 => {
                Some("http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256")
            }
            Self::Aes128Sha256RsaOaep => {
                Some("http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep")
            }
            Self::Aes256Sha256RsaPss => {
                Some("http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss")
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Returns `true` if the policy is chosen from the server's endpoints.
    #[inline]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Returns `true` if this policy is deprecated.
    #[inline]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::Basic128Rsa15 | Self::Basic256)
    }

    /// Creates from URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            s if s.ends_with("#None") => Some(Self::None),
            s if s.ends_with("#Basic128Rsa15") => Some(Self::Basic128Rsa15),
            s if s.ends_with("#Basic256") => Some(Self::Basic256),
            s if s.ends_with("#Basic256Sha256") => Some(Self::Basic256Sha256),
            s if s.ends_with("#Aes128_Sha256_RsaOaep") => Some(Self::Aes128Sha256RsaOaep),
            s if s.ends_with("#Aes256_Sha256_RsaPss") => Some(Self::Aes256Sha256RsaPss),
            _ => Option::None,
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(policy) = Self::from_uri(s) {
            return Ok(policy);
        }

        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "auto" | "" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "basic128rsa15" => Ok(Self::Basic128Rsa15),
            "basic256" => Ok(Self::Basic256),
            "basic256sha256" => Ok(Self::Basic256Sha256),
            "aes128sha256rsaoaep" => Ok(Self::Aes128Sha256RsaOaep),
            "aes256sha256rsapss" => Ok(Self::Aes256Sha256RsaPss),
            _ => Err(OpcUaError::configuration(
                ConfigurationError::invalid_security_policy(s),
            )),
        }
    }
}

// =============================================================================
// UserIdentity
// =============================================================================

/// How the client authenticates its session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserIdentity {
    /// Anonymous authentication.
    #[default]
    Anonymous,

    /// Username and password authentication.
    UserName {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },

    /// X.509 certificate authentication.
    Certificate {
        /// Path to the certificate file.
        certificate_path: String,
        /// Path to the private key file.
        private_key_path: String,
    },
}

impl UserIdentity {
    /// Returns `true` if this is anonymous authentication.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the method name as used in configuration.
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::UserName { .. } => "UserName",
            Self::Certificate { .. } => "Certificate",
        }
    }
}

// Keeps passwords out of debug logs.
impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Certificate {
                certificate_path,
                private_key_path,
            } => f
                .debug_struct("Certificate")
                .field("certificate_path", certificate_path)
                .field("private_key_path", private_key_path)
                .finish(),
        }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::UserName { username, .. } => write!(f, "UserName({})", username),
            Self::Certificate {
                certificate_path, ..
            } => write!(f, "Certificate({})", certificate_path),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Connection settings handed to the transport.
///
/// ```
/// use std::time::Duration;
/// use uapoll_opcua::types::{ClientConfig, SecurityMode, SecurityPolicy};
///
/// let config = ClientConfig::builder()
///     .endpoint("opc.tcp://plc:4840")
///     .security_mode(SecurityMode::SignAndEncrypt)
///     .security_policy(SecurityPolicy::Basic256Sha256)
///     .username("operator", "secret")
///     .connect_timeout(Duration::from_secs(3))
///     .build()
///     .unwrap();
/// assert_eq!(config.identity.method_name(), "UserName");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server endpoint URL (e.g., "opc.tcp://localhost:4840").
    pub endpoint: String,

    /// Security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,

    /// Session identity.
    #[serde(default)]
    pub identity: UserIdentity,

    /// Application name announced to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Upper bound for one connect attempt.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Upper bound for one batch read.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Client certificate for secure channels. Generated when absent.
    #[serde(default)]
    pub certificate_path: Option<String>,

    /// Client private key for secure channels.
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// PKI directory for trusted and rejected server certificates.
    #[serde(default = "default_pki_dir")]
    pub pki_dir: String,

    /// Trust every server certificate.
    #[serde(default)]
    pub trust_all_certificates: bool,
}

fn default_application_name() -> String {
    "uapoll".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_pki_dir() -> String {
    "./pki".to_string()
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration with just the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> OpcUaResult<()> {
        if self.endpoint.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                "endpoint",
            )));
        }

        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_endpoint(
                &self.endpoint,
                "Endpoint must start with opc.tcp://",
            )));
        }

        // Auto on either side defers the pairing to endpoint selection.
        let mode = self.security_mode;
        let policy = self.security_policy;
        if !mode.is_auto() && !policy.is_auto() {
            if !mode.is_none() && policy == SecurityPolicy::None {
                return Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                    "Security mode requires a security policy other than None",
                )));
            }
            if mode.is_none() && policy != SecurityPolicy::None {
                return Err(OpcUaError::configuration(ConfigurationError::invalid_security(
                    "Security policy requires a security mode other than None",
                )));
            }
        }

        match &self.identity {
            UserIdentity::Anonymous => {}
            UserIdentity::UserName { username, .. } => {
                if username.is_empty() {
                    return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                        "username",
                    )));
                }
            }
            UserIdentity::Certificate {
                certificate_path,
                private_key_path,
            } => {
                if certificate_path.is_empty() {
                    return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                        "certificate",
                    )));
                }
                if private_key_path.is_empty() {
                    return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                        "private_key",
                    )));
                }
            }
        }

        if self.connect_timeout.is_zero() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                self.connect_timeout,
                "Connect timeout must be greater than 0",
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                self.request_timeout,
                "Request timeout must be greater than 0",
            )));
        }

        Ok(())
    }

    /// Returns the application URI derived from the application name.
    pub fn application_uri(&self) -> String {
        format!("urn:uapoll:{}", self.application_name.replace(' ', ""))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            security_mode: SecurityMode::default(),
            security_policy: SecurityPolicy::default(),
            identity: UserIdentity::default(),
            application_name: default_application_name(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            certificate_path: None,
            private_key_path: None,
            pki_dir: default_pki_dir(),
            trust_all_certificates: false,
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.config.security_mode = mode;
        self
    }

    /// Sets the security policy.
    pub fn security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.config.security_policy = policy;
        self
    }

    /// Sets the session identity.
    pub fn identity(mut self, identity: UserIdentity) -> Self {
        self.config.identity = identity;
        self
    }

    /// Uses username/password authentication.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.identity = UserIdentity::UserName {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Uses anonymous authentication.
    pub fn anonymous(mut self) -> Self {
        self.config.identity = UserIdentity::Anonymous;
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = name.into();
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the client certificate path.
    pub fn certificate_path(mut self, path: impl Into<String>) -> Self {
        self.config.certificate_path = Some(path.into());
        self
    }

    /// Sets the client private key path.
    pub fn private_key_path(mut self, path: impl Into<String>) -> Self {
        self.config.private_key_path = Some(path.into());
        self
    }

    /// Sets the PKI directory.
    pub fn pki_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.pki_dir = dir.into();
        self
    }

    /// Trusts every server certificate.
    pub fn trust_all_certificates(mut self, trust: bool) -> Self {
        self.config.trust_all_certificates = trust;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> OpcUaResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

/// Serde adapter for `Duration` fields written as humantime strings
/// (`"10s"`, `"500ms"`, `"1m 30s"`).
///
/// Use with `#[serde(with = "uapoll_opcua::types::humantime_serde")]`.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_text_form() {
        assert_eq!(NodeId::numeric(0, 2261).to_opc_string(), "i=2261");
        assert_eq!(NodeId::string(1, "one").to_opc_string(), "ns=1;s=one");
        assert_eq!(
            NodeId::opaque(2, vec![0xDE, 0xAD]).to_opc_string(),
            "ns=2;b=dead"
        );
        let guid = Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        assert_eq!(
            NodeId::guid(4, guid).to_string(),
            "ns=4;g=72962b91-fa75-4ae6-8d28-b404dc7daf63"
        );
    }

    #[test]
    fn test_node_id_parse_back() {
        let guid = Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        let ids = [
            NodeId::numeric(0, 2262),
            NodeId::numeric(3, 3000),
            NodeId::string(2, "two"),
            NodeId::string(1, "a=b;c"),
            NodeId::string(1, " Line 1.Temp "),
            NodeId::string(0, "\tpadded\t"),
            NodeId::guid(5, guid),
            NodeId::opaque(1, vec![0x00, 0x7f, 0xff]),
        ];
        for id in ids {
            let parsed: NodeId = id.to_opc_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn test_humantime_serde() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Timeouts {
            #[serde(with = "humantime_serde")]
            connect: Duration,
        }

        let parsed: Timeouts = serde_json::from_str(r#"{"connect":" 1m 30s "}"#).unwrap();
        assert_eq!(parsed.connect, Duration::from_secs(90));
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"connect":"1m 30s"}"#
        );
        assert!(serde_json::from_str::<Timeouts>(r#"{"connect":"soon"}"#).is_err());
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=1".parse::<NodeId>().is_err());
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
        assert!("ns=1;b=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_resolve() {
        assert_eq!(NodeId::resolve("3", "i", "3000").unwrap(), NodeId::numeric(3, 3000));
        assert!(matches!(
            NodeId::resolve("-1", "i", "3000"),
            Err(OpcUaError::Configuration(ConfigurationError::InvalidNamespace { .. }))
        ));
        assert!(matches!(
            NodeId::resolve("1", "i", "x"),
            Err(OpcUaError::Configuration(ConfigurationError::InvalidIdentifier { .. }))
        ));
    }

    #[test]
    fn test_security_mode_from_str() {
        assert_eq!("auto".parse::<SecurityMode>().unwrap(), SecurityMode::Auto);
        assert_eq!("None".parse::<SecurityMode>().unwrap(), SecurityMode::None);
        assert_eq!(
            "Sign_And_Encrypt".parse::<SecurityMode>().unwrap(),
            SecurityMode::SignAndEncrypt
        );
        assert!("bogus".parse::<SecurityMode>().is_err());
    }

    #[test]
    fn test_security_policy_from_str() {
        assert_eq!("auto".parse::<SecurityPolicy>().unwrap(), SecurityPolicy::Auto);
        assert_eq!(
            "Basic256Sha256".parse::<SecurityPolicy>().unwrap(),
            SecurityPolicy::Basic256Sha256
        );
        assert_eq!(
            "http://opcfoundation.org/UA/SecurityPolicy#Basic256"
                .parse::<SecurityPolicy>()
                .unwrap(),
            SecurityPolicy::Basic256
        );
        assert!("rot13".parse::<SecurityPolicy>().is_err());
        assert!(SecurityPolicy::Auto.uri().is_none());
    }

    #[test]
    fn test_client_config_validation() {
        assert!(ClientConfig::new("opc.tcp://localhost:4840").validate().is_ok());
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("http://localhost").validate().is_err());

        let mismatched = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::Sign)
            .security_policy(SecurityPolicy::None)
            .build();
        assert!(mismatched.is_err());

        let auto_mode = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .security_mode(SecurityMode::Auto)
            .security_policy(SecurityPolicy::None)
            .build();
        assert!(auto_mode.is_ok());

        let no_user = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .username("", "pw")
            .build();
        assert!(no_user.is_err());

        let zero_timeout = ClientConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .request_timeout(Duration::ZERO)
            .build();
        assert!(zero_timeout.is_err());
    }

    #[test]
    fn test_identity_debug_masks_password() {
        let identity = UserIdentity::UserName {
            username: "operator".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", identity);
        assert!(debug.contains("operator"));
        assert!(!debug.contains("hunter2"));
    }
}
