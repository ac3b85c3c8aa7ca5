// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapoll-config
//!
//! Configuration management for uapoll.
//!
//! ## Features
//!
//! - **Schema Definition**: agent, logging and OPC UA input sections with validation
//! - **Multi-Format Support**: TOML, YAML and JSON configuration files
//! - **Environment Overrides**: override endpoint, interval, credentials and logging
//! - **Placeholders**: `${VAR}` and `${VAR:default}` inside configuration files
//!
//! ## Quick Start
//!
//! ```no_run
//! use uapoll_config::loader::load_config;
//!
//! let config = load_config("uapoll.toml").unwrap();
//!
//! println!("Endpoint: {}", config.opcua.endpoint);
//! println!("Nodes: {}", config.opcua.node_count());
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [agent]
//! interval = "10s"
//!
//! [opcua]
//! name = "opcua"
//! endpoint = "opc.tcp://localhost:4840"
//! nodes = [
//!   { name = "name", namespace = "1", identifier_type = "s", identifier = "one" },
//! ]
//!
//! [[opcua.group]]
//! name = "foo"
//! namespace = "3"
//! identifier_type = "i"
//! nodes = [{ name = "name3", identifier = "3000" }]
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder,
    DEFAULT_ENV_PREFIX,
};
pub use schema::{
    AgentConfig, LogFormat, LogLevel, LoggingConfig, OpcUaInputConfig, SecretValue, UapollConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "uapoll-config");
    }

    #[test]
    fn test_load_config_str() {
        let config = load_config_str(
            "[opcua]\nendpoint = \"opc.tcp://127.0.0.1:4840\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.opcua.endpoint, "opc.tcp://127.0.0.1:4840");
    }
}
