// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-tick collection.
//!
//! A [`Collector`] owns the session, the batch reader and the flattened node
//! list for one endpoint. Each tick:
//!
//! 1. makes sure the session is connected (one attempt, bounded)
//! 2. reads every node in one bounded request
//! 3. maps the node list to metric records
//!
//! A failure in step 1 or 2 skips the tick and leaves every node as it was.
//! [`Collector::run`] drives ticks on a fixed interval until shutdown, and a
//! slow tick delays the next one instead of overlapping it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::{BatchReader, OpcUaTransport, ReadSummary, SessionManager};
use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::flatten::ReadPlan;
use crate::metric::{to_metrics, MetricRecord, MetricSink};
use crate::node::ResolvedNode;

// =============================================================================
// TickHealthPolicy
// =============================================================================

/// Decides whether a tick whose batch read succeeded counts as healthy.
///
/// Unhealthy ticks still emit their records; the verdict only feeds logs and
/// statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TickHealthPolicy {
    /// Healthy whenever the request itself succeeded.
    #[default]
    BatchSucceeded,

    /// Healthy only if every node read good.
    AllNodesGood,

    /// Healthy if at least this fraction of nodes read good.
    MinGoodRatio(f64),
}

impl TickHealthPolicy {
    /// Evaluates a read summary.
    pub fn is_healthy(&self, summary: &ReadSummary) -> bool {
        match self {
            Self::BatchSucceeded => true,
            Self::AllNodesGood => summary.all_good(),
            Self::MinGoodRatio(min) => summary.good_ratio() >= *min,
        }
    }

    /// Validates the policy parameters.
    pub fn validate(&self) -> OpcUaResult<()> {
        match self {
            Self::MinGoodRatio(ratio) if !(0.0..=1.0).contains(ratio) => {
                Err(OpcUaError::configuration(ConfigurationError::invalid_health_policy(
                    format!("min_good_ratio must be between 0 and 1, got {}", ratio),
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TickHealthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchSucceeded => write!(f, "batch_succeeded"),
            Self::AllNodesGood => write!(f, "all_nodes_good"),
            Self::MinGoodRatio(ratio) => write!(f, "min_good_ratio({})", ratio),
        }
    }
}

// =============================================================================
// TickOutcome
// =============================================================================

/// Where a skipped tick stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStage {
    /// Establishing the session.
    Connect,
    /// Issuing the batch read.
    Read,
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The batch read succeeded.
    Collected {
        /// Records to emit.
        records: Vec<MetricRecord>,
        /// Per-node quality counts.
        summary: ReadSummary,
        /// Verdict of the health policy.
        healthy: bool,
    },

    /// The tick produced nothing.
    Skipped {
        /// Stage that failed.
        stage: TickStage,
        /// Cause.
        error: OpcUaError,
    },
}

impl TickOutcome {
    /// Returns the records of a collected tick.
    pub fn records(&self) -> &[MetricRecord] {
        match self {
            Self::Collected { records, .. } => records,
            Self::Skipped { .. } => &[],
        }
    }

    /// Returns `true` if the tick was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

// =============================================================================
// CollectorStats
// =============================================================================

/// Running totals across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectorStats {
    /// Ticks started.
    pub ticks: u64,
    /// Ticks whose batch read succeeded.
    pub collected: u64,
    /// Ticks skipped because no session could be established.
    pub skipped_connect: u64,
    /// Ticks skipped because the batch read failed.
    pub skipped_read: u64,
    /// Collected ticks the health policy rejected.
    pub unhealthy: u64,
    /// Bad node reads across all collected ticks.
    pub node_failures: u64,
    /// Records emitted.
    pub records_emitted: u64,
}

impl CollectorStats {
    /// Total skipped ticks.
    pub fn skipped(&self) -> u64 {
        self.skipped_connect + self.skipped_read
    }
}

// =============================================================================
// Collector
// =============================================================================

/// Drives periodic collection for one endpoint.
pub struct Collector<T: OpcUaTransport> {
    session: SessionManager<T>,
    reader: BatchReader,
    nodes: Vec<ResolvedNode>,
    health_policy: TickHealthPolicy,
    stats: CollectorStats,
}

impl<T: OpcUaTransport> Collector<T> {
    /// Creates a collector over a flattened plan.
    pub fn new(session: SessionManager<T>, reader: BatchReader, plan: ReadPlan) -> Self {
        Self {
            session,
            reader,
            nodes: plan.into_nodes(),
            health_policy: TickHealthPolicy::default(),
            stats: CollectorStats::default(),
        }
    }

    /// Sets the tick health policy.
    pub fn with_health_policy(mut self, policy: TickHealthPolicy) -> Self {
        self.health_policy = policy;
        self
    }

    /// Returns the nodes in read order, with their latest values.
    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    /// Returns the session manager.
    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    /// Returns the running statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Returns the health policy.
    pub fn health_policy(&self) -> TickHealthPolicy {
        self.health_policy
    }

    /// Runs one tick stamped with `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.stats.ticks += 1;

        if let Err(error) = self.session.ensure_connected().await {
            error.log("connect");
            self.stats.skipped_connect += 1;
            return TickOutcome::Skipped {
                stage: TickStage::Connect,
                error,
            };
        }

        let summary = match self.reader.read_all(&mut self.session, &mut self.nodes).await {
            Ok(summary) => summary,
            Err(error) => {
                error.log("read");
                self.session.mark_stale();
                self.stats.skipped_read += 1;
                return TickOutcome::Skipped {
                    stage: TickStage::Read,
                    error,
                };
            }
        };

        for failure in &summary.failures {
            warn!(
                field = %failure.field_name,
                status_code = format_args!("{:#010X}", failure.status_code),
                status = failure.status_name,
                "Node read returned bad status"
            );
        }

        let healthy = self.health_policy.is_healthy(&summary);
        if !healthy {
            warn!(
                policy = %self.health_policy,
                good = summary.good,
                uncertain = summary.uncertain,
                bad = summary.bad,
                "Tick is unhealthy"
            );
            self.stats.unhealthy += 1;
        }

        self.stats.collected += 1;
        self.stats.node_failures += summary.bad as u64;

        let records = to_metrics(&self.nodes, now);
        debug!(records = records.len(), healthy, "Tick collected");

        TickOutcome::Collected {
            records,
            summary,
            healthy,
        }
    }

    /// Ticks every `interval` until `shutdown` resolves, then closes the session.
    ///
    /// Shutdown is observed both while waiting for the next tick and while a
    /// tick is in flight; an interrupted tick emits nothing.
    pub async fn run<S, F>(&mut self, interval: Duration, sink: &mut S, shutdown: F) -> OpcUaResult<()>
    where
        S: MetricSink + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            endpoint = %self.session.endpoint(),
            nodes = self.nodes.len(),
            interval = %humantime::format_duration(interval),
            policy = %self.health_policy,
            "Collector started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested during tick");
                    break;
                }
                outcome = self.tick(Utc::now()) => outcome,
            };

            let records = outcome.records();
            if records.is_empty() {
                continue;
            }

            match sink.emit(records) {
                Ok(()) => self.stats.records_emitted += records.len() as u64,
                Err(e) => warn!(error = %e, "Failed to emit records"),
            }
        }

        if let Err(e) = sink.flush() {
            warn!(error = %e, "Failed to flush sink");
        }

        let result = self.close().await;

        info!(
            ticks = self.stats.ticks,
            collected = self.stats.collected,
            skipped = self.stats.skipped(),
            unhealthy = self.stats.unhealthy,
            "Collector stopped"
        );

        result
    }

    /// Closes the session. Safe to call more than once.
    pub async fn close(&mut self) -> OpcUaResult<()> {
        self.session.close().await
    }
}

impl<T: OpcUaTransport> fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("session", &self.session)
            .field("nodes", &self.nodes.len())
            .field("health_policy", &self.health_policy)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
