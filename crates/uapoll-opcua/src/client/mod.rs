// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client layers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Collector                               │
//! │                 (one tick per interval)                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BatchReader                              │
//! │          (positional multi-node read per tick)                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SessionManager                             │
//! │        (connect / reconnect / close, bounded waits)             │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OpcUaTransport                             │
//! │                 (abstract protocol client)                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod reader;
mod session;
mod transport;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use reader::{BatchReader, NodeFailure, ReadSummary};
pub use session::{SessionManager, SessionState, SessionStats};
pub use transport::{OpcUaTransport, OpcUaValue, Quality, ReadResult};

#[cfg(feature = "real-transport")]
pub use real_transport::RealOpcUaTransport;
