// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identifier resolution.
//!
//! Turns the `(identifier_type, identifier)` and `namespace` strings written in
//! configuration into a typed [`NodeIdentifier`] and namespace index. All
//! failures are [`ConfigurationError`]s, so a bad node is rejected before any
//! connection is attempted.
//!
//! | Code | Type    | Accepted form                                  |
//! |------|---------|------------------------------------------------|
//! | `i`  | Numeric | non-negative integer fitting in `u32`          |
//! | `s`  | String  | any text, taken verbatim                       |
//! | `g`  | Guid    | `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`         |
//! | `b`  | Opaque  | even-length hexadecimal                        |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::types::NodeIdentifier;

// =============================================================================
// IdentifierType
// =============================================================================

/// The four identifier kinds a node address can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierType {
    /// `i`
    #[serde(rename = "i")]
    Numeric,
    /// `s`
    #[serde(rename = "s")]
    String,
    /// `g`
    #[serde(rename = "g")]
    Guid,
    /// `b`
    #[serde(rename = "b")]
    Opaque,
}

impl IdentifierType {
    /// All identifier types, in code order.
    pub const ALL: [IdentifierType; 4] = [Self::Numeric, Self::String, Self::Guid, Self::Opaque];

    /// Returns the single-letter type code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Numeric => "i",
            Self::String => "s",
            Self::Guid => "g",
            Self::Opaque => "b",
        }
    }

    /// Looks up a type by its code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "i" => Some(Self::Numeric),
            "s" => Some(Self::String),
            "g" => Some(Self::Guid),
            "b" => Some(Self::Opaque),
            _ => None,
        }
    }

    /// Parses a raw identifier of this type.
    pub fn parse(&self, raw: &str) -> OpcUaResult<NodeIdentifier> {
        let invalid = |reason: String| {
            OpcUaError::configuration(ConfigurationError::invalid_identifier(
                self.code(),
                raw,
                reason,
            ))
        };

        match self {
            Self::Numeric => raw
                .trim()
                .parse::<u32>()
                .map(NodeIdentifier::Numeric)
                .map_err(|e| invalid(format!("not a non-negative 32-bit integer ({})", e))),
            Self::String => Ok(NodeIdentifier::String(raw.to_string())),
            Self::Guid => parse_guid(raw.trim())
                .map(NodeIdentifier::Guid)
                .map_err(invalid),
            Self::Opaque => hex::decode(raw.trim())
                .map(NodeIdentifier::Opaque)
                .map_err(|e| invalid(format!("not valid hex ({})", e))),
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for IdentifierType {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| {
            OpcUaError::configuration(ConfigurationError::invalid_identifier(
                s,
                "",
                "unknown identifier type, expected one of i, s, g, b",
            ))
        })
    }
}

// Only the hyphenated 36-character form is accepted.
fn parse_guid(raw: &str) -> Result<Uuid, String> {
    if raw.len() != 36 {
        return Err(format!(
            "GUID must use the 8-4-4-4-12 form, got {} characters",
            raw.len()
        ));
    }
    Uuid::parse_str(raw).map_err(|e| format!("invalid GUID ({})", e))
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves a raw identifier against its type code.
///
/// An unknown type code is reported as an invalid identifier.
///
/// # Examples
///
/// ```
/// use uapoll_opcua::identifier::resolve_identifier;
/// use uapoll_opcua::types::NodeIdentifier;
///
/// assert_eq!(resolve_identifier("i", "2261").unwrap(), NodeIdentifier::Numeric(2261));
/// assert_eq!(
///     resolve_identifier("b", "deadbeef").unwrap(),
///     NodeIdentifier::Opaque(vec![0xde, 0xad, 0xbe, 0xef]),
/// );
/// assert!(resolve_identifier("i", "-1").is_err());
/// ```
pub fn resolve_identifier(type_code: &str, raw: &str) -> OpcUaResult<NodeIdentifier> {
    let identifier_type = IdentifierType::from_code(type_code).ok_or_else(|| {
        OpcUaError::configuration(ConfigurationError::invalid_identifier(
            type_code,
            raw,
            "unknown identifier type, expected one of i, s, g, b",
        ))
    })?;
    identifier_type.parse(raw)
}

/// Parses a namespace index.
///
/// Accepts a decimal integer in `0..=65535`; surrounding whitespace is ignored.
pub fn parse_namespace(raw: &str) -> OpcUaResult<u16> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OpcUaError::configuration(ConfigurationError::invalid_namespace(
            raw,
            "namespace is empty",
        )));
    }
    if trimmed.starts_with('-') {
        return Err(OpcUaError::configuration(ConfigurationError::invalid_namespace(
            raw,
            "namespace must not be negative",
        )));
    }

    trimmed.parse::<u16>().map_err(|e| {
        OpcUaError::configuration(ConfigurationError::invalid_namespace(
            raw,
            format!("expected an integer between 0 and 65535 ({})", e),
        ))
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpcUaError;

    fn assert_invalid_identifier(result: OpcUaResult<NodeIdentifier>) {
        match result {
            Err(OpcUaError::Configuration(ConfigurationError::InvalidIdentifier { .. })) => {}
            other => panic!("expected InvalidIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric() {
        assert_eq!(resolve_identifier("i", "2261").unwrap(), NodeIdentifier::Numeric(2261));
        assert_eq!(resolve_identifier("i", "0").unwrap(), NodeIdentifier::Numeric(0));
        assert_eq!(
            resolve_identifier("i", "4294967295").unwrap(),
            NodeIdentifier::Numeric(u32::MAX)
        );
        assert_invalid_identifier(resolve_identifier("i", "-5"));
        assert_invalid_identifier(resolve_identifier("i", "abc"));
        assert_invalid_identifier(resolve_identifier("i", "4294967296"));
        assert_invalid_identifier(resolve_identifier("i", ""));
    }

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(
            resolve_identifier("s", " Line 1.Temp ").unwrap(),
            NodeIdentifier::String(" Line 1.Temp ".to_string())
        );
        assert_eq!(
            resolve_identifier("s", "").unwrap(),
            NodeIdentifier::String(String::new())
        );
    }

    #[test]
    fn test_guid() {
        let raw = "72962b91-fa75-4ae6-8d28-b404dc7daf63";
        assert_eq!(
            resolve_identifier("g", raw).unwrap(),
            NodeIdentifier::Guid(Uuid::parse_str(raw).unwrap())
        );
        assert_invalid_identifier(resolve_identifier("g", "72962b91fa754ae68d28b404dc7daf63"));
        assert_invalid_identifier(resolve_identifier("g", "not-a-guid"));
        assert_invalid_identifier(resolve_identifier("g", "72962b91-fa75-4ae6-8d28-b404dc7dafzz"));
    }

    #[test]
    fn test_opaque() {
        assert_eq!(
            resolve_identifier("b", "00ff10").unwrap(),
            NodeIdentifier::Opaque(vec![0x00, 0xff, 0x10])
        );
        assert_eq!(
            resolve_identifier("b", "DEADBEEF").unwrap(),
            NodeIdentifier::Opaque(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert_invalid_identifier(resolve_identifier("b", "abc"));
        assert_invalid_identifier(resolve_identifier("b", "zz"));
    }

    #[test]
    fn test_unknown_type_code() {
        assert_invalid_identifier(resolve_identifier("x", "1"));
        assert_invalid_identifier(resolve_identifier("", "1"));
        assert_invalid_identifier(resolve_identifier("I", "1"));
    }

    #[test]
    fn test_identifier_type_codes() {
        for ty in IdentifierType::ALL {
            assert_eq!(IdentifierType::from_code(ty.code()), Some(ty));
            assert_eq!(ty.code().parse::<IdentifierType>().unwrap(), ty);
        }
        assert!("q".parse::<IdentifierType>().is_err());
    }

    #[test]
    fn test_parse_namespace() {
        assert_eq!(parse_namespace("0").unwrap(), 0);
        assert_eq!(parse_namespace(" 3 ").unwrap(), 3);
        assert_eq!(parse_namespace("65535").unwrap(), 65535);

        for bad in ["", "-1", "65536", "one", "1.5"] {
            match parse_namespace(bad) {
                Err(OpcUaError::Configuration(ConfigurationError::InvalidNamespace { .. })) => {}
                other => panic!("expected InvalidNamespace for {:?}, got {:?}", bad, other),
            }
        }
    }
}
