// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing for uapoll.
//!
//! # Loading Pipeline
//!
//! 1. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 2. Parse TOML, YAML or JSON into [`UapollConfig`]
//! 3. Apply environment variable overrides
//! 4. Resolve relative certificate and PKI paths against the file's directory
//! 5. Validate, including node resolution
//!
//! # Environment Variable Override
//!
//! ```text
//! UAPOLL_ENDPOINT=opc.tcp://plc-02:4840
//! UAPOLL_INTERVAL=30s
//! UAPOLL_USERNAME=operator
//! UAPOLL_PASSWORD=secret
//! UAPOLL_LOG_LEVEL=debug
//! UAPOLL_LOG_FORMAT=json
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, SecretValue, UapollConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAPOLL";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for uapoll.
///
/// # Examples
///
/// ```no_run
/// use uapoll_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("uapoll.toml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply env overrides.
    resolve_env_vars: bool,

    /// Whether to resolve relative paths.
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads and validates configuration from a file.
    ///
    /// The format is determined by the file extension: `.toml`, `.yaml` /
    /// `.yml`, or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UapollConfig> {
        let config = self.load_unvalidated(path)?;
        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            endpoint = %config.opcua.endpoint,
            nodes = config.opcua.node_count(),
            groups = config.opcua.groups.len(),
            "Loaded OPC UA input"
        );

        Ok(config)
    }

    /// Loads configuration from a file without validating it.
    ///
    /// Useful for reporting every problem at once instead of stopping at the
    /// first one.
    pub fn load_unvalidated(&self, path: impl AsRef<Path>) -> ConfigResult<UapollConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            resolve_relative_paths(&mut config, &base_path);
        }

        Ok(config)
    }

    /// Loads and validates configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UapollConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config = parse_str(&content, format).map_err(|e| e.into_error("<string>"))?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if let Some(base_path) = &self.base_path {
            if self.resolve_paths {
                resolve_relative_paths(&mut config, base_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<UapollConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| e.into_error(path))
    }

    /// Resolves environment variable placeholders in content.
    ///
    /// Supports `${VAR_NAME}` and `${VAR_NAME:default}`. An unset variable
    /// without a default is left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                // Unterminated, keep the remainder verbatim.
                result.push_str(&rest[start..]);
                return result;
            };

            let inner = &after[..end];
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }

            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut UapollConfig) -> ConfigResult<()> {
        if let Some(value) = self.env("ENDPOINT") {
            config.opcua.endpoint = value;
        }

        if let Some(value) = self.env("INTERVAL") {
            config.agent.interval = humantime::parse_duration(value.trim()).map_err(|e| {
                ConfigError::invalid_env_var(self.env_name("INTERVAL"), e.to_string())
            })?;
        }

        if let Some(value) = self.env("USERNAME") {
            config.opcua.username = Some(value);
        }
        if let Some(value) = self.env("PASSWORD") {
            config.opcua.password = Some(SecretValue::new(value));
        }

        if let Some(value) = self.env("LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(
                    self.env_name("LOG_LEVEL"),
                    "expected one of trace, debug, info, warn, error",
                )
            })?;
        }
        if let Some(value) = self.env("LOG_FORMAT") {
            config.logging.format = LogFormat::parse(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(
                    self.env_name("LOG_FORMAT"),
                    "expected one of text, compact, json",
                )
            })?;
        }

        Ok(())
    }

    fn env_name(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }

    fn env(&self, key: &str) -> Option<String> {
        let name = self.env_name(key);
        let value = env::var(&name).ok()?;
        debug!(variable = %name, "Applying environment override");
        Some(value)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves relative certificate and PKI paths.
fn resolve_relative_paths(config: &mut UapollConfig, base_path: &Path) {
    let opcua = &mut config.opcua;

    for path in [&mut opcua.certificate, &mut opcua.private_key]
        .into_iter()
        .flatten()
    {
        if path.is_relative() {
            *path = base_path.join(&*path);
        }
    }

    if opcua.pki_dir.is_relative() {
        opcua.pki_dir = base_path.join(&opcua.pki_dir);
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for ConfigLoader.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the ConfigLoader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();

        if let Some(base_path) = self.base_path {
            loader.base_path = Some(base_path);
        }
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        if let Some(resolve_paths) = self.resolve_paths {
            loader.resolve_paths = resolve_paths;
        }

        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// YAML format.
    Yaml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// A syntax or shape error before the file path is known.
struct ParseFailure {
    message: String,
    line: Option<usize>,
}

impl ParseFailure {
    fn into_error(self, path: impl Into<PathBuf>) -> ConfigError {
        match self.line {
            Some(line) => ConfigError::parse_at_line(path, self.message, line),
            None => ConfigError::parse(path, self.message),
        }
    }
}

fn parse_str(content: &str, format: ConfigFormat) -> Result<UapollConfig, ParseFailure> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ParseFailure {
            line: e.span().map(|span| line_of(content, span.start)),
            message: e.message().to_string(),
        }),
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ParseFailure {
            line: Some(e.line()).filter(|l| *l > 0),
            message: e.to_string(),
        }),
    }
}

/// 1-based line number of a byte offset.
fn line_of(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// YAML parsing through the config crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> Result<T, ParseFailure> {
    let failure = |e: config::ConfigError| ParseFailure {
        message: e.to_string(),
        line: None,
    };

    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(failure)?
        .try_deserialize()
        .map_err(failure)
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// # Examples
///
/// ```no_run
/// use uapoll_config::loader::load_config;
///
/// let config = load_config("uapoll.toml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UapollConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<UapollConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
