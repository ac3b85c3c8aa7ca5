// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Collector runtime orchestration.
//!
//! Wires the loaded configuration into a [`Collector`]: the transport, the
//! session manager, the batch reader and the read plan. It then drives the
//! collector until an OS signal arrives, or for a single tick with `--once`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use uapoll_config::{load_config, UapollConfig};
use uapoll_opcua::{
    BatchReader, Collector, CollectorStats, MetricSink, OpcUaTransport, SessionManager,
    TickOutcome,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// CollectorRuntime
// =============================================================================

/// Runs one collector built from configuration.
pub struct CollectorRuntime {
    config: Arc<UapollConfig>,
    shutdown: ShutdownCoordinator,
    once: bool,
}

impl CollectorRuntime {
    /// Creates a new runtime.
    pub fn new(config: UapollConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
            once: false,
        }
    }

    /// Runs a single tick instead of looping.
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UapollConfig {
        &self.config
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs against the configured server.
    #[cfg(feature = "real-transport")]
    pub async fn run<S: MetricSink + ?Sized>(&self, sink: &mut S) -> BinResult<CollectorStats> {
        let client_config = self.config.opcua.client_config()?;
        let transport = uapoll_opcua::RealOpcUaTransport::new(client_config);
        self.run_with_transport(transport, sink).await
    }

    /// Runs against the configured server.
    ///
    /// Always fails: this build carries no protocol stack.
    #[cfg(not(feature = "real-transport"))]
    pub async fn run<S: MetricSink + ?Sized>(&self, _sink: &mut S) -> BinResult<CollectorStats> {
        Err(BinError::init(
            "uapoll was built without an OPC UA transport; rebuild with `--features real-transport`",
        ))
    }

    /// Runs against the given transport.
    pub async fn run_with_transport<T, S>(&self, transport: T, sink: &mut S) -> BinResult<CollectorStats>
    where
        T: OpcUaTransport,
        S: MetricSink + ?Sized,
    {
        let collector = self.build_collector(transport)?;

        info!(
            "Starting uapoll v{} ({} nodes, endpoint {})",
            uapoll_opcua::VERSION,
            collector.nodes().len(),
            self.config.opcua.endpoint
        );

        let stats = if self.once {
            self.run_once(collector, sink).await?
        } else {
            self.run_loop(collector, sink).await?
        };

        info!("uapoll shutdown complete");
        Ok(stats)
    }

    /// Builds the collector for a transport.
    pub fn build_collector<T: OpcUaTransport>(&self, transport: T) -> BinResult<Collector<T>> {
        let opcua = &self.config.opcua;
        let plan = opcua.read_plan()?;

        let session = SessionManager::new(transport, opcua.connect_timeout);
        let reader = BatchReader::new(opcua.request_timeout);

        Ok(Collector::new(session, reader, plan).with_health_policy(self.config.agent.tick_health))
    }

    async fn run_loop<T, S>(&self, mut collector: Collector<T>, sink: &mut S) -> BinResult<CollectorStats>
    where
        T: OpcUaTransport,
        S: MetricSink + ?Sized,
    {
        let signals = tokio::spawn({
            let shutdown = self.shutdown.clone();
            async move { shutdown.wait_for_shutdown().await }
        });

        let result = collector
            .run(self.config.agent.interval, sink, self.shutdown.shutdown_signal())
            .await;

        signals.abort();

        if let Err(e) = result {
            warn!(error = %e, "Session did not close cleanly");
        }
        Ok(collector.stats())
    }

    async fn run_once<T, S>(&self, mut collector: Collector<T>, sink: &mut S) -> BinResult<CollectorStats>
    where
        T: OpcUaTransport,
        S: MetricSink + ?Sized,
    {
        let signals = tokio::spawn({
            let shutdown = self.shutdown.clone();
            async move { shutdown.wait_for_shutdown().await }
        });

        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.shutdown_signal() => None,
            outcome = collector.tick(Utc::now()) => Some(outcome),
        };

        signals.abort();

        let result = match outcome {
            Some(TickOutcome::Collected { records, .. }) => sink
                .emit(&records)
                .and_then(|()| sink.flush())
                .map_err(|e| BinError::io(e.to_string()).with_context("writing records")),
            Some(TickOutcome::Skipped { stage, error }) => {
                Err(BinError::from(error).with_context(format!("tick skipped at {} stage", stage)))
            }
            None => {
                info!("Shutdown requested during tick");
                Err(BinError::runtime("shutdown requested before the tick completed"))
            }
        };

        if let Err(e) = collector.close().await {
            warn!(error = %e, "Session did not close cleanly");
        }

        result.map(|()| collector.stats())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the collector runtime.
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<UapollConfig>,
    once: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            once: false,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: UapollConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Runs a single tick instead of looping.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<CollectorRuntime> {
        let config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;

                load_config(&path).map_err(|e| {
                    BinError::from(e).with_context(format!("loading {}", path.display()))
                })?
            }
        };

        Ok(CollectorRuntime::new(config).with_once(self.once))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use uapoll_config::{load_config_str, ConfigFormat};
    use uapoll_opcua::{MemorySink, NodeId, OpcUaError, OpcUaResult, OpcUaValue, ReadResult};

    const CONFIG: &str = r#"
[agent]
interval = "10s"

[opcua]
name = "opcua"
endpoint = "opc.tcp://mock:4840"
nodes = [
  { name = "temperature", namespace = "2", identifier_type = "s", identifier = "temp" },
  { name = "running", namespace = "2", identifier_type = "s", identifier = "run" },
]
"#;

    #[derive(Default)]
    struct MockState {
        refuse_connect: bool,
        stall_reads: bool,
        reads: u32,
        disconnects: u32,
    }

    struct MockTransport {
        state: Arc<Mutex<MockState>>,
        values: HashMap<String, OpcUaValue>,
        connected: bool,
    }

    impl MockTransport {
        fn new() -> (Self, Arc<Mutex<MockState>>) {
            let state = Arc::new(Mutex::new(MockState::default()));
            let values = HashMap::from([
                ("ns=2;s=temp".to_string(), OpcUaValue::Double(21.5)),
                ("ns=2;s=run".to_string(), OpcUaValue::Boolean(true)),
            ]);
            (
                Self {
                    state: Arc::clone(&state),
                    values,
                    connected: false,
                },
                state,
            )
        }
    }

    #[async_trait]
    impl OpcUaTransport for MockTransport {
        async fn connect(&mut self) -> OpcUaResult<()> {
            if self.state.lock().unwrap().refuse_connect {
                return Err(OpcUaError::connect_failed(self.endpoint(), "connection refused"));
            }
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> OpcUaResult<()> {
            self.state.lock().unwrap().disconnects += 1;
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<ReadResult>> {
            let stall = {
                let mut state = self.state.lock().unwrap();
                state.reads += 1;
                state.stall_reads
            };
            if stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(node_ids
                .iter()
                .map(|id| match self.values.get(&id.to_opc_string()) {
                    Some(value) => ReadResult::success(value.clone()),
                    None => ReadResult::failure(0x8034_0000),
                })
                .collect())
        }

        fn endpoint(&self) -> &str {
            "opc.tcp://mock:4840"
        }
    }

    fn test_config() -> UapollConfig {
        load_config_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_runtime_builder() {
        let runtime = RuntimeBuilder::new()
            .config(test_config())
            .once(true)
            .build()
            .unwrap();

        assert!(runtime.once);
        assert_eq!(runtime.config().opcua.node_count(), 2);
    }

    #[test]
    fn test_runtime_builder_requires_config() {
        let result = RuntimeBuilder::new().build();
        assert!(matches!(result, Err(BinError::Configuration(_))));
    }

    #[test]
    fn test_runtime_builder_reports_missing_file() {
        let err = RuntimeBuilder::new()
            .config_path("/nonexistent/uapoll.toml")
            .build()
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("loading /nonexistent/uapoll.toml"));
    }

    #[tokio::test]
    async fn test_run_once_emits_one_record() {
        let (transport, state) = MockTransport::new();
        let runtime = CollectorRuntime::new(test_config()).with_once(true);
        let mut sink = MemorySink::new();

        let stats = runtime.run_with_transport(transport, &mut sink).await.unwrap();

        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.collected, 1);
        assert_eq!(sink.records().len(), 1);

        let record = &sink.records()[0];
        assert_eq!(record.name, "opcua");
        assert_eq!(record.field("temperature"), Some(&OpcUaValue::Double(21.5)));
        assert_eq!(record.field("running"), Some(&OpcUaValue::Boolean(true)));

        let state = state.lock().unwrap();
        assert_eq!(state.reads, 1);
        assert_eq!(state.disconnects, 1);
    }

    #[tokio::test]
    async fn test_run_once_fails_when_tick_is_skipped() {
        let (transport, state) = MockTransport::new();
        state.lock().unwrap().refuse_connect = true;

        let runtime = CollectorRuntime::new(test_config()).with_once(true);
        let mut sink = MemorySink::new();

        let err = runtime.run_with_transport(transport, &mut sink).await.unwrap_err();

        assert!(err.to_string().starts_with("tick skipped at connect stage"));
        assert!(sink.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_closes_session_on_shutdown_mid_tick() {
        let mut config = test_config();
        config.opcua.request_timeout = Duration::from_secs(600);

        let (transport, state) = MockTransport::new();
        state.lock().unwrap().stall_reads = true;

        let runtime = CollectorRuntime::new(config).with_once(true);
        let mut sink = MemorySink::new();

        let shutdown = runtime.shutdown().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown.initiate_shutdown();
        });

        let err = runtime.run_with_transport(transport, &mut sink).await.unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("shutdown requested before the tick completed"));
        assert!(sink.records().is_empty());

        let state = state.lock().unwrap();
        assert_eq!(state.reads, 1);
        assert_eq!(state.disconnects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_stops_on_shutdown() {
        let (transport, state) = MockTransport::new();
        let runtime = CollectorRuntime::new(test_config());
        let mut sink = MemorySink::new();

        let shutdown = runtime.shutdown().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            shutdown.initiate_shutdown();
        });

        let stats = runtime.run_with_transport(transport, &mut sink).await.unwrap();

        // Ticks at 0s, 10s and 20s.
        assert_eq!(stats.ticks, 3);
        assert_eq!(sink.batches(), 3);
        assert_eq!(state.lock().unwrap().disconnects, 1);
    }

    #[tokio::test]
    async fn test_build_collector_applies_health_policy() {
        let mut config = test_config();
        config.agent.tick_health = uapoll_opcua::TickHealthPolicy::AllNodesGood;

        let (transport, _) = MockTransport::new();
        let collector = CollectorRuntime::new(config).build_collector(transport).unwrap();

        assert_eq!(collector.health_policy(), uapoll_opcua::TickHealthPolicy::AllNodesGood);
        assert_eq!(collector.nodes().len(), 2);
    }
}
