// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;
use crate::output::JsonLinesSink;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command.
///
/// Logging is set up once the configuration is loaded, so `[logging]`
/// applies unless a flag overrides it.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .once(args.once)
        .build()?;

    let logging = &runtime.config().logging;
    init_logging(
        cli.effective_log_level(logging.level),
        cli.effective_log_format(logging.format),
    );

    info!(config = %cli.config.display(), "Configuration loaded");

    let mut sink = JsonLinesSink::open(&args.output)
        .map_err(|e| BinError::from(e).with_context("opening output"))?;

    let stats = runtime.run(&mut sink).await?;

    info!(
        ticks = stats.ticks,
        collected = stats.collected,
        skipped = stats.skipped(),
        records = stats.records_emitted,
        "Collection finished"
    );

    Ok(())
}
