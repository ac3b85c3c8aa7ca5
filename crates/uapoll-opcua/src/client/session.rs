// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA session management.
//!
//! [`SessionManager`] exclusively owns one transport and drives it through
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected ──close──▶ Closed
//!      ▲                        │                  │
//!      └──────── Failed ◀───────┘                  │ mark_stale
//!      ▲                                           │
//!      └───────────────────────────────────────────┘
//! ```
//!
//! `Failed` is transient: the manager settles back to `Disconnected` before
//! returning the error, so the next tick simply tries again. Every read goes
//! through `&mut self`, which rules out overlapping requests on one session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::transport::{OpcUaTransport, ReadResult};
use crate::error::{
    ConnectionError, FailureReason, OpcUaError, OpcUaResult, OperationError,
};
use crate::types::NodeId;

// =============================================================================
// SessionState
// =============================================================================

/// State of an OPC UA session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session is held.
    #[default]
    Disconnected,

    /// A connect attempt is in flight.
    Connecting,

    /// Session is established and ready for reads.
    Connected,

    /// Session has been released for good.
    Closed,

    /// The last connect attempt failed.
    Failed,
}

impl SessionState {
    /// Returns `true` if reads may be issued.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` once the session has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Owns the transport and its session lifecycle.
pub struct SessionManager<T: OpcUaTransport> {
    transport: T,
    connect_timeout: Duration,
    state: SessionState,
    stats: SessionStats,
}

impl<T: OpcUaTransport> SessionManager<T> {
    /// Creates a manager around a not-yet-connected transport.
    pub fn new(transport: T, connect_timeout: Duration) -> Self {
        Self {
            transport,
            connect_timeout,
            state: SessionState::Disconnected,
            stats: SessionStats::new(),
        }
    }

    /// Returns the current session state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the session statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Makes a single connect attempt bounded by the connect timeout.
    ///
    /// # Errors
    ///
    /// - `ConnectFailed` if the attempt times out or the transport rejects it
    /// - `SessionClosed` if the session was already closed
    pub async fn connect(&mut self) -> OpcUaResult<()> {
        match self.state {
            SessionState::Closed => {
                return Err(OpcUaError::connection(ConnectionError::SessionClosed));
            }
            SessionState::Connected if self.transport.is_connected() => return Ok(()),
            _ => {}
        }

        self.set_state(SessionState::Connecting);
        let endpoint = self.transport.endpoint().to_string();

        let reason = match tokio::time::timeout(self.connect_timeout, self.transport.connect()).await
        {
            Ok(Ok(())) => {
                self.stats.record_connect();
                self.set_state(SessionState::Connected);
                tracing::info!(endpoint = %endpoint, "OPC UA session connected");
                return Ok(());
            }
            Ok(Err(OpcUaError::Connection(ConnectionError::ConnectFailed { reason, .. }))) => {
                reason
            }
            Ok(Err(e)) => FailureReason::Transport(e.to_string()),
            Err(_) => {
                // The connect future was dropped mid-flight; release whatever it left behind.
                self.transport.abort();
                FailureReason::TimedOut(self.connect_timeout)
            }
        };

        self.stats.record_failure();
        self.set_state(SessionState::Failed);
        self.set_state(SessionState::Disconnected);

        Err(OpcUaError::connection(ConnectionError::connect_failed(
            endpoint, reason,
        )))
    }

    /// Ensures a usable session, reconnecting at most once.
    ///
    /// No-op when the session is connected and the transport still agrees.
    pub async fn ensure_connected(&mut self) -> OpcUaResult<()> {
        match self.state {
            SessionState::Closed => Err(OpcUaError::connection(ConnectionError::SessionClosed)),
            SessionState::Connected if self.transport.is_connected() => Ok(()),
            _ => {
                if self.state == SessionState::Connected {
                    tracing::warn!(
                        endpoint = %self.transport.endpoint(),
                        "OPC UA session lost, reconnecting"
                    );
                    self.set_state(SessionState::Disconnected);
                }
                if self.stats.connects() > 0 {
                    self.stats.record_reconnect();
                }
                self.connect().await
            }
        }
    }

    /// Demotes a connected session after a request-level failure.
    ///
    /// The next [`ensure_connected`](Self::ensure_connected) will establish a
    /// fresh session.
    pub fn mark_stale(&mut self) {
        if self.state == SessionState::Connected {
            tracing::debug!(
                endpoint = %self.transport.endpoint(),
                "Marking OPC UA session stale"
            );
            self.transport.abort();
            self.set_state(SessionState::Disconnected);
        }
    }

    /// Reads all `node_ids` in one request bounded by `request_timeout`.
    ///
    /// # Errors
    ///
    /// - `NotConnected` if there is no connected session
    /// - `BatchReadFailed` on timeout or transport failure
    pub async fn read_values(
        &mut self,
        node_ids: &[NodeId],
        request_timeout: Duration,
    ) -> OpcUaResult<Vec<ReadResult>> {
        if !self.state.is_connected() {
            return Err(OpcUaError::not_connected());
        }

        match tokio::time::timeout(request_timeout, self.transport.read_values(node_ids)).await {
            Ok(Ok(results)) => Ok(results),
            Ok(Err(e @ OpcUaError::Operation(_))) => Err(e),
            Ok(Err(e)) => Err(OpcUaError::operation(OperationError::batch_read_failed(
                node_ids.len(),
                FailureReason::Transport(e.to_string()),
            ))),
            Err(_) => Err(OpcUaError::operation(OperationError::batch_read_failed(
                node_ids.len(),
                FailureReason::TimedOut(request_timeout),
            ))),
        }
    }

    /// Releases the session. Later calls are no-ops.
    pub async fn close(&mut self) -> OpcUaResult<()> {
        if self.state.is_closed() {
            return Ok(());
        }

        let result = if self.transport.is_connected() {
            self.transport.disconnect().await
        } else {
            Ok(())
        };

        self.stats.record_close();
        self.set_state(SessionState::Closed);

        match &result {
            Ok(()) => tracing::info!(endpoint = %self.transport.endpoint(), "OPC UA session closed"),
            Err(e) => tracing::warn!(
                endpoint = %self.transport.endpoint(),
                error = %e,
                "OPC UA session closed with error"
            ),
        }

        result
    }

    fn set_state(&mut self, new_state: SessionState) {
        let old_state = self.state;
        self.state = new_state;

        if old_state != new_state {
            tracing::trace!(
                old_state = %old_state,
                new_state = %new_state,
                "Session state changed"
            );
        }
    }
}

impl<T: OpcUaTransport> Drop for SessionManager<T> {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            tracing::debug!(
                endpoint = %self.transport.endpoint(),
                state = %self.state,
                "Session dropped without close, aborting"
            );
            self.transport.abort();
        }
    }
}

impl<T: OpcUaTransport> fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.transport.endpoint())
            .field("state", &self.state)
            .finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Statistics for session operations.
#[derive(Debug)]
pub struct SessionStats {
    connects: AtomicU64,
    failures: AtomicU64,
    reconnects: AtomicU64,
    closes: AtomicU64,
}

impl SessionStats {
    /// Creates new session statistics.
    pub fn new() -> Self {
        Self {
            connects: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            closes: AtomicU64::new(0),
        }
    }

    /// Records a successful connect.
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed connect attempt.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reconnect attempt.
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a close.
    pub fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of successful connects.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Returns the number of failed connect attempts.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of reconnect attempts.
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Returns the number of closes.
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }
}

impl Default for SessionStats {
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
    use crate::client::transport::OpcUaValue;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[derive(Default)]
    struct Probe {
        connected: AtomicBool,
        connects: AtomicU64,
        disconnects: AtomicU64,
        aborts: AtomicU64,
    }

    struct ProbeTransport {
        probe: Arc<Probe>,
        fail_connect: bool,
        connect_delay: Duration,
        read_delay: Duration,
    }

    impl ProbeTransport {
        fn new(probe: Arc<Probe>) -> Self {
            Self {
                probe,
                fail_connect: false,
                connect_delay: Duration::ZERO,
                read_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl OpcUaTransport for ProbeTransport {
        async fn connect(&mut self) -> OpcUaResult<()> {
            tokio::time::sleep(self.connect_delay).await;
            if self.fail_connect {
                return Err(OpcUaError::connect_failed("opc.tcp://probe:4840", "refused"));
            }
            self.probe.connects.fetch_add(1, Ordering::SeqCst);
            self.probe.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&mut self) -> OpcUaResult<()> {
            self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
            self.probe.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.probe.connected.load(Ordering::SeqCst)
        }

        async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<ReadResult>> {
            tokio::time::sleep(self.read_delay).await;
            Ok(node_ids
                .iter()
                .map(|_| ReadResult::success(OpcUaValue::Int32(1)))
                .collect())
        }

        fn endpoint(&self) -> &str {
            "opc.tcp://probe:4840"
        }

        fn abort(&mut self) {
            self.probe.aborts.fetch_add(1, Ordering::SeqCst);
            self.probe.connected.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_connect_and_close_once() {
        let probe = Arc::new(Probe::default());
        let mut session = SessionManager::new(ProbeTransport::new(probe.clone()), Duration::from_secs(1));

        assert_eq!(session.state(), SessionState::Disconnected);
        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(probe.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(session.stats().closes(), 1);

        drop(session);
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_settles_disconnected() {
        let probe = Arc::new(Probe::default());
        let mut transport = ProbeTransport::new(probe);
        transport.fail_connect = true;
        let mut session = SessionManager::new(transport, Duration::from_secs(1));

        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Connection(ConnectionError::ConnectFailed {
                reason: FailureReason::Transport(_),
                ..
            })
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.stats().failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout() {
        let probe = Arc::new(Probe::default());
        let mut transport = ProbeTransport::new(probe.clone());
        transport.connect_delay = Duration::from_secs(60);
        let mut session = SessionManager::new(transport, Duration::from_secs(2));

        let err = session.connect().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let probe = Arc::new(Probe::default());
        let mut transport = ProbeTransport::new(probe);
        transport.read_delay = Duration::from_secs(30);
        let mut session = SessionManager::new(transport, Duration::from_secs(1));
        session.connect().await.unwrap();

        let ids = [NodeId::numeric(0, 2261)];
        let err = session
            .read_values(&ids, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OpcUaError::Operation(OperationError::BatchReadFailed { node_count: 1, .. })
        ));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_read_requires_connection() {
        let probe = Arc::new(Probe::default());
        let mut session = SessionManager::new(ProbeTransport::new(probe), Duration::from_secs(1));
        let err = session
            .read_values(&[NodeId::numeric(0, 1)], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, OpcUaError::Connection(ConnectionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_ensure_connected_reconnects_after_stale() {
        let probe = Arc::new(Probe::default());
        let mut session = SessionManager::new(ProbeTransport::new(probe.clone()), Duration::from_secs(1));

        session.ensure_connected().await.unwrap();
        session.ensure_connected().await.unwrap();
        assert_eq!(probe.connects.load(Ordering::SeqCst), 1);

        session.mark_stale();
        assert_eq!(session.state(), SessionState::Disconnected);

        session.ensure_connected().await.unwrap();
        assert_eq!(probe.connects.load(Ordering::SeqCst), 2);
        assert_eq!(session.stats().reconnects(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_connect() {
        let probe = Arc::new(Probe::default());
        let mut session = SessionManager::new(ProbeTransport::new(probe), Duration::from_secs(1));
        session.close().await.unwrap();

        let err = session.ensure_connected().await.unwrap_err();
        assert!(matches!(err, OpcUaError::Connection(ConnectionError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_drop_without_close_aborts() {
        let probe = Arc::new(Probe::default());
        {
            let mut session =
                SessionManager::new(ProbeTransport::new(probe.clone()), Duration::from_secs(1));
            session.connect().await.unwrap();
        }
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 1);
        assert!(!probe.connected.load(Ordering::SeqCst));
    }
}
