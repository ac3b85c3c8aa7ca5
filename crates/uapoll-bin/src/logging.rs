// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Logs always go to stderr so that records written to stdout stay clean
//! JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uapoll_config::{LogFormat, LogLevel};

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns `false` if a
/// global subscriber was already installed.
///
/// # Example
///
/// ```ignore
/// use uapoll_bin::logging::init_logging;
/// use uapoll_config::{LogFormat, LogLevel};
///
/// init_logging(LogLevel::Info, LogFormat::Text);
/// ```
pub fn init_logging(level: LogLevel, format: LogFormat) -> bool {
    let filter = build_filter(level);

    match format {
        LogFormat::Text => init_text_logging(filter),
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Compact => init_compact_logging(filter),
    }
}

/// Builds the filter from `RUST_LOG` or the given level.
///
/// The protocol stack is capped at `warn` unless `RUST_LOG` says otherwise.
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let filter = EnvFilter::new(level.as_str());
        match "opcua=warn".parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    })
}

fn init_text_logging(filter: EnvFilter) -> bool {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(is_terminal),
        )
        .try_init()
        .is_ok()
}

fn init_json_logging(filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init()
        .is_ok()
}

fn init_compact_logging(filter: EnvFilter) -> bool {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(is_terminal),
        )
        .try_init()
        .is_ok()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_uses_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = build_filter(LogLevel::Debug).to_string();
            assert!(filter.contains("debug"));
            assert!(filter.contains("opcua=warn"));
        }
    }

    #[test]
    fn test_second_init_is_rejected() {
        init_logging(LogLevel::Info, LogFormat::Compact);
        assert!(!init_logging(LogLevel::Info, LogFormat::Json));
    }
}
