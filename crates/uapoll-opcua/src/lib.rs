// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node addressing and read orchestration for polling OPC UA servers.
//!
//! This crate turns a configured set of nodes into uniformly shaped metric
//! records, one record set per polling tick. The protocol client itself sits
//! behind the [`OpcUaTransport`] trait; a concrete implementation backed by
//! the `opcua` crate is available with the `real-transport` feature.
//!
//! # Pipeline
//!
//! ```text
//! NodeSetting / GroupSettings ──▶ flatten ──▶ ReadPlan (ordered ResolvedNodes)
//!                                                   │
//!        SessionManager ◀── BatchReader ◀── Collector::tick
//!                                                   │
//!                                        to_metrics ──▶ MetricSink
//! ```
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Configuration - Bad identifiers, namespaces, field names, client settings
//! ├── Connection    - Session could not be established or was closed
//! └── Operation     - A batch read failed as a whole
//! ```
//!
//! Configuration errors are fatal at startup. Connection and operation errors
//! skip one tick. Per-node bad statuses are not errors; they show up as
//! [`Quality::Bad`] on the node.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use uapoll_opcua::{BatchReader, Collector, MemorySink, NodeSetting, ReadPlan, SessionManager};
//!
//! let root = vec![NodeSetting::new("product_name", "2261").with_namespace("0").with_identifier_type("i")];
//! let plan = ReadPlan::build(&root, &[], "opcua")?;
//!
//! let session = SessionManager::new(transport, Duration::from_secs(10));
//! let mut collector = Collector::new(session, BatchReader::new(Duration::from_secs(5)), plan);
//!
//! let mut sink = MemorySink::new();
//! collector.run(Duration::from_secs(10), &mut sink, shutdown).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod collector;
pub mod error;
pub mod flatten;
pub mod identifier;
pub mod metric;
pub mod node;
pub mod types;

pub use error::{
    ConfigurationError, ConnectionError, ErrorCode, ErrorSeverity, FailureReason, OpcUaError,
    OpcUaResult, OperationError,
};

pub use identifier::{parse_namespace, resolve_identifier, IdentifierType};

pub use types::{
    ClientConfig, ClientConfigBuilder, NodeId, NodeIdentifier, SecurityMode, SecurityPolicy,
    UserIdentity,
};

pub use node::{resolve, EffectiveSetting, NodeDefaults, NodeSetting, ResolvedNode};

pub use flatten::{flatten, GroupSettings, ReadPlan};

pub use client::{
    BatchReader, NodeFailure, OpcUaTransport, OpcUaValue, Quality, ReadResult, ReadSummary,
    SessionManager, SessionState, SessionStats,
};

#[cfg(feature = "real-transport")]
pub use client::RealOpcUaTransport;

pub use metric::{to_metrics, MemorySink, MetricRecord, MetricSink};

pub use collector::{Collector, CollectorStats, TickHealthPolicy, TickOutcome, TickStage};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
