// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapoll-bin
//!
//! CLI binary for the uapoll OPC UA polling collector.
//!
//! - CLI argument parsing with clap
//! - Collector runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//! - JSON-lines record output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                              │
//! │                    (Entry Point)                             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │    cli.rs   │
//!                    │ (Argument   │
//!                    │  Parsing)   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        │          │ │          │ │          │
//!        └──────────┘ └────┬─────┘ └──────────┘
//!                          │
//!               ┌──────────┼──────────┐
//!               ▼                     ▼
//!        ┌─────────────┐       ┌─────────────┐
//!        │  shutdown   │       │   output    │
//!        │ (Graceful)  │       │(JSON lines) │
//!        └─────────────┘       └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start polling (default command), records on stdout
//! uapoll
//!
//! # Custom config, records to a file
//! uapoll -c /etc/uapoll/uapoll.toml run -o /var/lib/uapoll/records.jsonl
//!
//! # One tick, then exit
//! uapoll run --once
//!
//! # Validate configuration and print the read plan
//! uapoll validate --show-plan
//!
//! # Show version
//! uapoll version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use output::JsonLinesSink;
pub use runtime::{CollectorRuntime, RuntimeBuilder};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
