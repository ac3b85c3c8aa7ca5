// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! The protocol client is an external collaborator: the session manager only
//! needs to connect, issue one multi-node read, and disconnect. Everything else
//! (secure channel setup, encoding, endpoint selection) lives behind
//! [`OpcUaTransport`], which keeps the core testable with an in-memory mock.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{OpcUaResult, OperationError};
use crate::types::NodeId;

// =============================================================================
// Quality
// =============================================================================

/// Data quality derived from the severity bits of an OPC UA status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Value is usable.
    #[default]
    Good,

    /// Value may be usable.
    Uncertain,

    /// Value should not be used.
    Bad,
}

impl Quality {
    /// Creates quality from an OPC UA status code.
    ///
    /// The top two bits carry severity: `10` is bad, `01` uncertain, `00` good.
    pub const fn from_status_code(status_code: u32) -> Self {
        if status_code & 0x8000_0000 != 0 {
            Self::Bad
        } else if status_code & 0x4000_0000 != 0 {
            Self::Uncertain
        } else {
            Self::Good
        }
    }

    /// Returns `true` for good quality.
    #[inline]
    pub const fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }

    /// Returns `true` for uncertain quality.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        matches!(self, Self::Uncertain)
    }

    /// Returns `true` for bad quality.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        matches!(self, Self::Bad)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Uncertain => write!(f, "uncertain"),
            Self::Bad => write!(f, "bad"),
        }
    }
}

// =============================================================================
// ReadResult
// =============================================================================

/// Result for one node of a batch read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    /// The value read, absent for bad statuses.
    pub value: Option<OpcUaValue>,

    /// Status code reported for this node.
    pub status_code: u32,

    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,

    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl ReadResult {
    /// Creates a good read result stamped with the current time.
    pub fn success(value: OpcUaValue) -> Self {
        Self {
            value: Some(value),
            status_code: 0,
            server_timestamp: Some(Utc::now()),
            source_timestamp: None,
        }
    }

    /// Creates a result carrying a non-good status and no value.
    pub fn failure(status_code: u32) -> Self {
        Self {
            value: None,
            status_code,
            server_timestamp: Some(Utc::now()),
            source_timestamp: None,
        }
    }

    /// Creates a result with an explicit status and optional value.
    pub fn with_status(value: Option<OpcUaValue>, status_code: u32) -> Self {
        Self {
            value,
            status_code,
            server_timestamp: Some(Utc::now()),
            source_timestamp: None,
        }
    }

    /// Sets the source timestamp.
    pub fn with_source_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.source_timestamp = Some(timestamp);
        self
    }

    /// Returns the quality of this result.
    #[inline]
    pub fn quality(&self) -> Quality {
        Quality::from_status_code(self.status_code)
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.quality().is_good()
    }

    /// Returns `true` if the status is uncertain.
    #[inline]
    pub fn is_uncertain(&self) -> bool {
        self.quality().is_uncertain()
    }

    /// Returns `true` if the status is bad.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.quality().is_bad()
    }

    /// Returns the source timestamp, falling back to the server timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.source_timestamp.or(self.server_timestamp)
    }

    /// Returns the symbolic name of the status code.
    pub fn status_name(&self) -> &'static str {
        OperationError::status_code_name(self.status_code)
    }
}

// =============================================================================
// OpcUaValue
// =============================================================================

/// A scalar or array value read from a node.
///
/// Serializes as a plain JSON value: numbers as numbers, timestamps as
/// RFC 3339 strings, byte strings as lowercase hex.
#[derive(Debug, Clone, PartialEq)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),

    /// Signed byte.
    SByte(i8),

    /// Unsigned byte.
    Byte(u8),

    /// 16-bit signed integer.
    Int16(i16),

    /// 16-bit unsigned integer.
    UInt16(u16),

    /// 32-bit signed integer.
    Int32(i32),

    /// 32-bit unsigned integer.
    UInt32(u32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit unsigned integer.
    UInt64(u64),

    /// 32-bit float.
    Float(f32),

    /// 64-bit double.
    Double(f64),

    /// String value.
    String(String),

    /// Date/time value.
    DateTime(DateTime<Utc>),

    /// GUID value.
    Guid(uuid::Uuid),

    /// Byte string.
    ByteString(Vec<u8>),

    /// Array of values.
    Array(Vec<OpcUaValue>),

    /// Null value.
    Null,
}

impl OpcUaValue {
    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => self.as_i64().map(|v| v != 0),
        }
    }

    /// Attempts to get the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Boolean(v) => Some(i64::from(*v)),
            Self::SByte(v) => Some(i64::from(*v)),
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            Self::Float(v) => Some(*v as i64),
            Self::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::SByte(v) => Some(f64::from(*v)),
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Int16(v) => Some(f64::from(*v)),
            Self::UInt16(v) => Some(f64::from(*v)),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::UInt32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt64(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the type name, as used in logs.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::Array(_) => "Array",
            Self::Null => "Null",
        }
    }
}

impl Default for OpcUaValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for OpcUaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "{}", hex::encode(v)),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Null => write!(f, "null"),
        }
    }
}

impl Serialize for OpcUaValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::SByte(v) => serializer.serialize_i8(*v),
            Self::Byte(v) => serializer.serialize_u8(*v),
            Self::Int16(v) => serializer.serialize_i16(*v),
            Self::UInt16(v) => serializer.serialize_u16(*v),
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::UInt32(v) => serializer.serialize_u32(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::UInt64(v) => serializer.serialize_u64(*v),
            Self::Float(v) => serializer.serialize_f32(*v),
            Self::Double(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::DateTime(v) => serializer.serialize_str(&v.to_rfc3339()),
            Self::Guid(v) => serializer.collect_str(v),
            Self::ByteString(v) => serializer.serialize_str(&hex::encode(v)),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Null => serializer.serialize_unit(),
        }
    }
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Abstract transport for OPC UA communication.
///
/// Implementations must be `Send + Sync`; the session manager holds the
/// transport exclusively, so no two calls are ever in flight at once.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    /// Establishes a session with the server.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the session cannot be established.
    async fn connect(&mut self) -> OpcUaResult<()>;

    /// Closes the session gracefully.
    async fn disconnect(&mut self) -> OpcUaResult<()>;

    /// Returns `true` if the transport currently holds a usable session.
    fn is_connected(&self) -> bool;

    /// Reads the `Value` attribute of every node in one request.
    ///
    /// The returned vector must be positionally aligned with `node_ids`.
    /// An `Err` means the request as a whole failed.
    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<ReadResult>>;

    /// Returns the server endpoint URL.
    fn endpoint(&self) -> &str;

    /// Releases the session synchronously, without waiting on the server.
    ///
    /// Called from `Drop` when the session was never closed gracefully.
    fn abort(&mut self) {}
}

// =============================================================================
// Tests
// =============================================================================
