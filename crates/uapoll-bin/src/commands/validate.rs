// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::path::Path;

use serde::Serialize;
use uapoll_config::{load_config, LogFormat, LogLevel, UapollConfig};
use uapoll_opcua::SecurityPolicy;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Outcome of validating one configuration file.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// Always `true`; invalid files are reported as errors.
    pub valid: bool,
    /// The validated file.
    pub config_path: String,
    /// Key settings.
    pub summary: ValidationSummary,
    /// Settings that load fine but are probably not intended.
    pub warnings: Vec<String>,
    /// Every node in read order, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanEntry>>,
}

/// Key settings of a validated configuration.
#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    /// Server endpoint.
    pub endpoint: String,
    /// Polling interval.
    pub interval: String,
    /// Distinct metric names in emit order.
    pub metrics: Vec<String>,
    /// Number of nodes read per tick.
    pub node_count: usize,
    /// Configured security policy.
    pub security_policy: String,
    /// Configured security mode.
    pub security_mode: String,
    /// Configured authentication method.
    pub auth_method: String,
    /// Tick health policy.
    pub tick_health: String,
}

/// One node of the read plan.
#[derive(Debug, Serialize)]
pub struct PlanEntry {
    /// Metric the node reports under.
    pub metric: String,
    /// Field name.
    pub field: String,
    /// Node id in textual form.
    pub node_id: String,
}

/// Executes the `validate` command.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    init_logging(
        cli.effective_log_level(LogLevel::Warn),
        cli.effective_log_format(LogFormat::Text),
    );

    let report = build_report(&cli.config, args.show_plan)?;

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| BinError::runtime(format!("failed to render report: {}", e)))?;
            println!("{}", json);
        }
    }

    if args.strict && !report.warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            report.warnings.len()
        )));
    }

    Ok(())
}

/// Loads and validates `path`, then summarizes it.
pub fn build_report(path: &Path, show_plan: bool) -> BinResult<ValidationReport> {
    let config = load_config(path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;
    let plan = config.opcua.read_plan()?;

    let summary = ValidationSummary {
        endpoint: config.opcua.endpoint.clone(),
        interval: humantime::format_duration(config.agent.interval).to_string(),
        metrics: plan.metric_names().into_iter().map(String::from).collect(),
        node_count: plan.len(),
        security_policy: config.opcua.security_policy.clone(),
        security_mode: config.opcua.security_mode.clone(),
        auth_method: config.opcua.auth_method.clone(),
        tick_health: config.agent.tick_health.to_string(),
    };

    let plan = show_plan.then(|| {
        plan.nodes()
            .iter()
            .map(|node| PlanEntry {
                metric: node.metric_name.clone(),
                field: node.field_name.clone(),
                node_id: node.node_id.to_opc_string(),
            })
            .collect()
    });

    Ok(ValidationReport {
        valid: true,
        config_path: path.display().to_string(),
        summary,
        warnings: collect_warnings(&config),
        plan,
    })
}

fn collect_warnings(config: &UapollConfig) -> Vec<String> {
    let opcua = &config.opcua;
    let mut warnings = Vec::new();

    if opcua.node_count() == 0 {
        warnings.push("No nodes configured; every tick will be empty".to_string());
    }

    if let Ok(policy) = opcua.security_policy.parse::<SecurityPolicy>() {
        if policy.is_deprecated() {
            warnings.push(format!("Security policy {} is deprecated", policy));
        }
    }

    if opcua.trust_all_certificates {
        warnings.push("trust_all_certificates is enabled; server certificates are not verified".to_string());
    }

    if opcua.auth_method.eq_ignore_ascii_case("username")
        && opcua.security_mode.eq_ignore_ascii_case("none")
    {
        warnings.push("UserName authentication with security_mode None sends credentials unprotected".to_string());
    }

    let slowest = opcua.connect_timeout.max(opcua.request_timeout);
    if slowest > config.agent.interval {
        warnings.push(format!(
            "A tick may take up to {} but the interval is {}; ticks will be delayed",
            humantime::format_duration(slowest),
            humantime::format_duration(config.agent.interval)
        ));
    }

    warnings
}

fn print_text(report: &ValidationReport) {
    let summary = &report.summary;

    println!("✓ Configuration is valid: {}", report.config_path);
    println!();
    println!("Summary:");
    println!("  Endpoint:        {}", summary.endpoint);
    println!("  Interval:        {}", summary.interval);
    println!("  Metrics:         {}", summary.metrics.join(", "));
    println!("  Nodes:           {}", summary.node_count);
    println!("  Security:        {} / {}", summary.security_policy, summary.security_mode);
    println!("  Authentication:  {}", summary.auth_method);
    println!("  Tick health:     {}", summary.tick_health);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  ⚠ {}", warning);
        }
    }

    if let Some(plan) = &report.plan {
        println!();
        println!("Read plan:");
        for (index, entry) in plan.iter().enumerate() {
            println!(
                "  {:>3}. {}.{} <- {}",
                index + 1,
                entry.metric,
                entry.field,
                entry.node_id
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
