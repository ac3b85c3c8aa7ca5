// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA polling error types with diagnostics.
//!
//! Errors fall into three domains that map directly onto how the collector
//! reacts to them:
//!
//! - **Configuration**: rejected at startup, nothing is partially loaded
//! - **Connection**: the current tick is skipped and the session is retried
//! - **Operation**: the whole batch read failed, the tick produces no data
//!
//! Per-node status codes returned inside a successful batch are *not* errors.
//! They are recorded as [`Quality`](crate::client::Quality) on the node.
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Configuration - Identifier, namespace, field and endpoint issues
//! ├── Connection    - Connect failures and session availability
//! └── Operation     - Request-level batch read failures
//! ```
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use uapoll_opcua::error::{ConnectionError, FailureReason, OpcUaError};
//!
//! let error = OpcUaError::connection(ConnectionError::connect_failed(
//!     "opc.tcp://localhost:4840",
//!     FailureReason::TimedOut(Duration::from_secs(10)),
//! ));
//!
//! assert!(error.is_retryable());
//! assert!(!error.is_fatal());
//! assert_eq!(error.error_code().to_string(), "UA-0101");
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for uapoll's OPC UA core.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Configuration errors. Fatal at initialization.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Connection and session availability errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Request-level read errors.
    #[error("{0}")]
    Operation(#[from] OperationError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates a transport-level connect failure.
    pub fn connect_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection(ConnectionError::connect_failed(
            endpoint,
            FailureReason::Transport(message.into()),
        ))
    }

    /// Creates a transport-level batch read failure.
    pub fn batch_read_failed(node_count: usize, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::batch_read_failed(
            node_count,
            FailureReason::Transport(message.into()),
        ))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable on a later tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Connection(e) => e.is_retryable(),
            Self::Operation(_) => true,
        }
    }

    /// Returns `true` if this error must stop the collector from starting.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` if the underlying cause was a bounded wait expiring.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Connection(ConnectionError::ConnectFailed { reason, .. })
            | Self::Operation(OperationError::BatchReadFailed { reason, .. }) => {
                reason.is_timeout()
            }
            _ => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Connection(ConnectionError::SessionClosed) => ErrorSeverity::Error,
            Self::Connection(_) => ErrorSeverity::Warning,
            Self::Operation(_) => ErrorSeverity::Warning,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection(_) => "connection",
            Self::Operation(_) => "operation",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration(e) => e.error_code(),
            Self::Connection(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Configuration(e) => e.recovery_hints(),
            Self::Connection(e) => e.recovery_hints(),
            Self::Operation(e) => e.recovery_hints(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// FailureReason
// =============================================================================

/// Why a connect attempt or a batch read did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The bounded wait expired.
    TimedOut(Duration),

    /// The transport reported an error.
    Transport(String),

    /// The server answered with a different number of results than requested.
    ResultCountMismatch {
        /// Number of nodes requested.
        expected: usize,
        /// Number of results received.
        actual: usize,
    },
}

impl FailureReason {
    /// Returns `true` if this is a timeout.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(d) => write!(f, "timed out after {}", humantime::format_duration(*d)),
            Self::Transport(msg) => write!(f, "{}", msg),
            Self::ResultCountMismatch { expected, actual } => {
                write!(f, "expected {} results, received {}", expected, actual)
            }
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors detected while resolving nodes or client settings.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Identifier does not parse against its identifier type.
    #[error("Invalid identifier '{identifier}' for type '{identifier_type}': {reason}")]
    InvalidIdentifier {
        /// The identifier type code as written.
        identifier_type: String,
        /// The raw identifier.
        identifier: String,
        /// Reason.
        reason: String,
    },

    /// Namespace is not a non-negative integer in range.
    #[error("Invalid namespace '{namespace}': {reason}")]
    InvalidNamespace {
        /// The raw namespace.
        namespace: String,
        /// Reason.
        reason: String,
    },

    /// Neither the node nor its enclosing group provide a namespace or identifier type.
    #[error("Node '{field_name}' has no {missing} and none is inherited")]
    MissingIdentifierType {
        /// The node's field name.
        field_name: String,
        /// Which setting is missing (`namespace` or `identifier_type`).
        missing: &'static str,
    },

    /// A node has an empty field name.
    #[error("Node with identifier '{identifier}' has an empty field_name")]
    MissingFieldName {
        /// The node's raw identifier, to locate it in the configuration.
        identifier: String,
    },

    /// Two nodes share the same field name.
    #[error("Duplicate field_name '{field_name}' (metrics '{first_metric}' and '{second_metric}')")]
    DuplicateFieldName {
        /// The duplicated field name.
        field_name: String,
        /// Metric of the first occurrence.
        first_metric: String,
        /// Metric of the second occurrence.
        second_metric: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Unknown security mode.
    #[error("Invalid security mode: '{value}'")]
    InvalidSecurityMode {
        /// The value as written.
        value: String,
    },

    /// Unknown security policy.
    #[error("Invalid security policy: '{value}'")]
    InvalidSecurityPolicy {
        /// The value as written.
        value: String,
    },

    /// Unknown authentication method.
    #[error("Invalid auth method: '{value}'")]
    InvalidAuthMethod {
        /// The value as written.
        value: String,
    },

    /// Inconsistent security settings.
    #[error("Invalid security settings: {reason}")]
    InvalidSecurity {
        /// Reason.
        reason: String,
    },

    /// Required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// Invalid timeout value.
    #[error("Invalid timeout {duration:?}: {reason}")]
    InvalidTimeout {
        /// The duration.
        duration: Duration,
        /// Reason.
        reason: String,
    },

    /// Tick health policy parameter out of range.
    #[error("Invalid tick health policy: {reason}")]
    InvalidHealthPolicy {
        /// Reason.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(
        identifier_type: impl Into<String>,
        identifier: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidIdentifier {
            identifier_type: identifier_type.into(),
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid namespace error.
    pub fn invalid_namespace(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNamespace {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing identifier type error.
    pub fn missing_identifier_type(field_name: impl Into<String>, missing: &'static str) -> Self {
        Self::MissingIdentifierType {
            field_name: field_name.into(),
            missing,
        }
    }

    /// Creates a missing field name error.
    pub fn missing_field_name(identifier: impl Into<String>) -> Self {
        Self::MissingFieldName {
            identifier: identifier.into(),
        }
    }

    /// Creates a duplicate field name error.
    pub fn duplicate_field_name(
        field_name: impl Into<String>,
        first_metric: impl Into<String>,
        second_metric: impl Into<String>,
    ) -> Self {
        Self::DuplicateFieldName {
            field_name: field_name.into(),
            first_metric: first_metric.into(),
            second_metric: second_metric.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid security mode error.
    pub fn invalid_security_mode(value: impl Into<String>) -> Self {
        Self::InvalidSecurityMode {
            value: value.into(),
        }
    }

    /// Creates an invalid security policy error.
    pub fn invalid_security_policy(value: impl Into<String>) -> Self {
        Self::InvalidSecurityPolicy {
            value: value.into(),
        }
    }

    /// Creates an invalid auth method error.
    pub fn invalid_auth_method(value: impl Into<String>) -> Self {
        Self::InvalidAuthMethod {
            value: value.into(),
        }
    }

    /// Creates an invalid security settings error.
    pub fn invalid_security(reason: impl Into<String>) -> Self {
        Self::InvalidSecurity {
            reason: reason.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid timeout error.
    pub fn invalid_timeout(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            duration,
            reason: reason.into(),
        }
    }

    /// Creates an invalid health policy error.
    pub fn invalid_health_policy(reason: impl Into<String>) -> Self {
        Self::InvalidHealthPolicy {
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        let code = match self {
            Self::InvalidIdentifier { .. } => 1,
            Self::InvalidNamespace { .. } => 2,
            Self::MissingIdentifierType { .. } => 3,
            Self::MissingFieldName { .. } => 4,
            Self::DuplicateFieldName { .. } => 5,
            Self::InvalidEndpoint { .. } => 6,
            Self::InvalidSecurityMode { .. } => 7,
            Self::InvalidSecurityPolicy { .. } => 8,
            Self::InvalidAuthMethod { .. } => 9,
            Self::InvalidSecurity { .. } => 10,
            Self::MissingField { .. } => 11,
            Self::InvalidTimeout { .. } => 12,
            Self::InvalidHealthPolicy { .. } => 13,
        };
        ErrorCode::new(8, code)
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidIdentifier { .. } => vec![
                "Numeric identifiers (i) must be non-negative integers",
                "GUID identifiers (g) use the canonical 8-4-4-4-12 form",
                "Opaque identifiers (b) must be even-length hex",
            ],
            Self::InvalidNamespace { .. } => vec!["Namespace must be an integer between 0 and 65535"],
            Self::MissingIdentifierType { .. } => vec![
                "Root-level nodes must set both namespace and identifier_type",
                "Group nodes may inherit them from the group",
            ],
            Self::MissingFieldName { .. } => vec!["Every node needs a non-empty field_name"],
            Self::DuplicateFieldName { .. } => {
                vec!["Field names must be unique across root nodes and all groups"]
            }
            Self::InvalidEndpoint { .. } => vec!["Endpoint must start with opc.tcp://"],
            Self::InvalidSecurityMode { .. } => {
                vec!["Use one of: auto, None, Sign, SignAndEncrypt"]
            }
            Self::InvalidSecurityPolicy { .. } => vec![
                "Use one of: auto, None, Basic128Rsa15, Basic256, Basic256Sha256, Aes128Sha256RsaOaep, Aes256Sha256RsaPss",
            ],
            Self::InvalidAuthMethod { .. } => vec!["Use one of: Anonymous, UserName, Certificate"],
            Self::InvalidSecurity { .. } => vec!["Security mode None requires security policy None"],
            Self::MissingField { .. } => vec!["Add the missing field to the configuration"],
            Self::InvalidTimeout { .. } => vec!["Timeouts must be greater than zero"],
            Self::InvalidHealthPolicy { .. } => vec!["min_good_ratio must be between 0.0 and 1.0"],
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Connection and session availability errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A single connect attempt did not succeed.
    #[error("Failed to connect to '{endpoint}': {reason}")]
    ConnectFailed {
        /// Target endpoint.
        endpoint: String,
        /// Why the attempt failed.
        reason: FailureReason,
    },

    /// The session is not connected.
    #[error("Not connected to OPC UA server")]
    NotConnected,

    /// The session has been closed and cannot be reused.
    #[error("Session has been closed")]
    SessionClosed,
}

impl ConnectionError {
    /// Creates a connect failed error.
    pub fn connect_failed(endpoint: impl Into<String>, reason: FailureReason) -> Self {
        Self::ConnectFailed {
            endpoint: endpoint.into(),
            reason,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        let code = match self {
            Self::ConnectFailed { .. } => 1,
            Self::NotConnected => 2,
            Self::SessionClosed => 3,
        };
        ErrorCode::new(1, code)
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::ConnectFailed { reason, .. } if reason.is_timeout() => vec![
                "Check that the server is reachable from this host",
                "Increase connect_timeout for slow networks",
            ],
            Self::ConnectFailed { .. } => vec![
                "Verify the endpoint URL and port",
                "Check security policy, mode and credentials",
            ],
            Self::NotConnected => vec!["The session reconnects on the next tick"],
            Self::SessionClosed => vec!["Create a new session manager"],
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Request-level read errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The batch read failed as a whole. No node was updated.
    #[error("Batch read of {node_count} nodes failed: {reason}")]
    BatchReadFailed {
        /// Number of nodes in the request.
        node_count: usize,
        /// Why the read failed.
        reason: FailureReason,
    },
}

impl OperationError {
    /// Creates a batch read failed error.
    pub fn batch_read_failed(node_count: usize, reason: FailureReason) -> Self {
        Self::BatchReadFailed { node_count, reason }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BatchReadFailed { .. } => ErrorCode::new(5, 1),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::BatchReadFailed { reason, .. } if reason.is_timeout() => vec![
                "Increase request_timeout",
                "Split very large node lists across several inputs",
            ],
            Self::BatchReadFailed { .. } => {
                vec!["The session is re-validated before the next tick"]
            }
        }
    }

    /// Returns the human-readable name for an OPC UA status code.
    ///
    /// Only the severity and sub-code bits are considered; the low 16 info
    /// bits are ignored.
    pub fn status_code_name(code: u32) -> &'static str {
        match code & 0xFFFF_0000 {
            0x0000_0000 => "Good",
            0x4000_0000 => "Uncertain",
            0x408F_0000 => "UncertainNoCommunicationLastUsableValue",
            0x4090_0000 => "UncertainLastUsableValue",
            0x4093_0000 => "UncertainSensorNotAccurate",
            0x4094_0000 => "UncertainEngineeringUnitsExceeded",
            0x4095_0000 => "UncertainSubNormal",
            0x8000_0000 => "Bad",
            0x8001_0000 => "BadUnexpectedError",
            0x8002_0000 => "BadInternalError",
            0x8003_0000 => "BadOutOfMemory",
            0x8004_0000 => "BadResourceUnavailable",
            0x8005_0000 => "BadCommunicationError",
            0x8006_0000 => "BadEncodingError",
            0x8007_0000 => "BadDecodingError",
            0x800A_0000 => "BadTimeout",
            0x800B_0000 => "BadServiceUnsupported",
            0x800C_0000 => "BadShutdown",
            0x800D_0000 => "BadServerNotConnected",
            0x8010_0000 => "BadTooManyOperations",
            0x801F_0000 => "BadUserAccessDenied",
            0x8020_0000 => "BadIdentityTokenInvalid",
            0x8021_0000 => "BadIdentityTokenRejected",
            0x8022_0000 => "BadSecureChannelIdInvalid",
            0x8025_0000 => "BadSessionIdInvalid",
            0x8026_0000 => "BadSessionClosed",
            0x8027_0000 => "BadSessionNotActivated",
            0x8031_0000 => "BadNoCommunication",
            0x8032_0000 => "BadWaitingForInitialData",
            0x8033_0000 => "BadNodeIdInvalid",
            0x8034_0000 => "BadNodeIdUnknown",
            0x8035_0000 => "BadAttributeIdInvalid",
            0x803A_0000 => "BadNotReadable",
            0x8074_0000 => "BadTypeMismatch",
            0x808D_0000 => "BadOutOfService",
            c if c & 0x8000_0000 != 0 => "Bad",
            c if c & 0x4000_0000 != 0 => "Uncertain",
            _ => "Good",
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Connection
/// - 5: Operation
/// - 8: Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

/// Result type for OPC UA operations.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Tests
// =============================================================================
