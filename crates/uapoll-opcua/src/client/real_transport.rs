// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport backed by the `opcua` crate.
//!
//! The `opcua` client is synchronous and drives its own runtime, so every
//! call into it runs on tokio's blocking pool. That keeps the async timeouts
//! in [`SessionManager`](crate::client::SessionManager) meaningful: a hung
//! server stalls a blocking thread, never the runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use uapoll_opcua::client::{RealOpcUaTransport, SessionManager};
//! use uapoll_opcua::types::ClientConfig;
//!
//! let config = ClientConfig::new("opc.tcp://localhost:4840");
//! let mut session = SessionManager::new(RealOpcUaTransport::new(config.clone()), config.connect_timeout);
//! session.connect().await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use opcua::client::prelude::{
    AttributeId, AttributeService, Client, ClientBuilder, EndpointDescription, IdentityToken,
    ReadValueId, Session, TimestampsToReturn,
};
use opcua::sync::RwLock as OpcUaRwLock;

use crate::client::transport::{OpcUaTransport, OpcUaValue, ReadResult};
use crate::error::{
    ConnectionError, FailureReason, OpcUaError, OpcUaResult, OperationError,
};
use crate::types::{ClientConfig, NodeId, NodeIdentifier, SecurityMode, SecurityPolicy, UserIdentity};

type SharedSession = Arc<OpcUaRwLock<Session>>;

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// Transport speaking OPC UA binary over TCP.
pub struct RealOpcUaTransport {
    config: ClientConfig,
    session: Option<SharedSession>,
}

impl RealOpcUaTransport {
    /// Creates a transport for the given configuration. Nothing is opened yet.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn connect_failed(&self, message: impl Into<String>) -> OpcUaError {
        OpcUaError::connection(ConnectionError::connect_failed(
            &self.config.endpoint,
            FailureReason::Transport(message.into()),
        ))
    }
}

// =============================================================================
// Blocking helpers
// =============================================================================

fn build_client(config: &ClientConfig) -> Option<Client> {
    let mut builder = ClientBuilder::new()
        .application_name(&config.application_name)
        .application_uri(config.application_uri())
        .product_uri(config.application_uri())
        .pki_dir(&config.pki_dir)
        .trust_server_certs(config.trust_all_certificates)
        .session_retry_limit(0);

    builder = match (&config.certificate_path, &config.private_key_path) {
        (Some(cert), Some(key)) => builder.certificate_path(cert).private_key_path(key),
        _ => builder.create_sample_keypair(true),
    };

    builder.client()
}

fn to_opcua_policy(policy: SecurityPolicy) -> Option<opcua::client::prelude::SecurityPolicy> {
    use opcua::client::prelude::SecurityPolicy as Ua;

    match policy {
        SecurityPolicy::Auto => None,
        SecurityPolicy::None => Some(Ua::None),
        SecurityPolicy::Basic128Rsa15 => Some(Ua::Basic128Rsa15),
        SecurityPolicy::Basic256 => Some(Ua::Basic256),
        SecurityPolicy::Basic256Sha256 => Some(Ua::Basic256Sha256),
        SecurityPolicy::Aes128Sha256RsaOaep => Some(Ua::Aes128Sha256RsaOaep),
        SecurityPolicy::Aes256Sha256RsaPss => Some(Ua::Aes256Sha256RsaPss),
    }
}

fn to_opcua_mode(mode: SecurityMode) -> Option<opcua::types::MessageSecurityMode> {
    use opcua::types::MessageSecurityMode as Ua;

    match mode {
        SecurityMode::Auto => None,
        SecurityMode::None => Some(Ua::None),
        SecurityMode::Sign => Some(Ua::Sign),
        SecurityMode::SignAndEncrypt => Some(Ua::SignAndEncrypt),
    }
}

/// Picks the endpoint matching the configured policy and mode.
///
/// `Auto` on either side matches anything; among the candidates the one with
/// the highest server-advertised security level wins.
fn select_endpoint(
    endpoints: &[EndpointDescription],
    policy: SecurityPolicy,
    mode: SecurityMode,
) -> Option<EndpointDescription> {
    let policy_uri = to_opcua_policy(policy).map(|p| p.to_uri());
    let mode = to_opcua_mode(mode);

    endpoints
        .iter()
        .filter(|e| policy_uri.map_or(true, |uri| e.security_policy_uri.as_ref() == uri))
        .filter(|e| mode.map_or(true, |m| e.security_mode == m))
        .max_by_key(|e| e.security_level)
        .cloned()
}

fn identity_token(identity: &UserIdentity) -> IdentityToken {
    match identity {
        UserIdentity::Anonymous => IdentityToken::Anonymous,
        UserIdentity::UserName { username, password } => {
            IdentityToken::UserName(username.clone(), password.clone())
        }
        UserIdentity::Certificate {
            certificate_path,
            private_key_path,
        } => IdentityToken::X509(
            PathBuf::from(certificate_path),
            PathBuf::from(private_key_path),
        ),
    }
}

fn connect_blocking(config: &ClientConfig) -> Result<SharedSession, String> {
    let mut client = build_client(config).ok_or("failed to build OPC UA client")?;

    let endpoints = client
        .get_server_endpoints_from_url(config.endpoint.as_str())
        .map_err(|status| format!("endpoint discovery failed: {}", status))?;

    let mut endpoint =
        select_endpoint(&endpoints, config.security_policy, config.security_mode).ok_or_else(
            || {
                format!(
                    "no endpoint offers policy {} with mode {}",
                    config.security_policy, config.security_mode
                )
            },
        )?;

    debug!(
        security_policy = %endpoint.security_policy_uri,
        security_mode = ?endpoint.security_mode,
        security_level = endpoint.security_level,
        "Selected endpoint"
    );

    // Servers behind NAT often advertise an unreachable host name.
    endpoint.endpoint_url = config.endpoint.as_str().into();

    client
        .connect_to_endpoint(endpoint, identity_token(&config.identity))
        .map_err(|status| format!("session activation failed: {}", status))
}

fn to_opcua_node_id(node_id: &NodeId) -> opcua::types::NodeId {
    let ns = node_id.namespace_index;
    match &node_id.identifier {
        NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(ns, *v),
        NodeIdentifier::String(v) => opcua::types::NodeId::new(ns, v.clone()),
        NodeIdentifier::Guid(v) => {
            opcua::types::NodeId::new(ns, opcua::types::Guid::from_bytes(*v.as_bytes()))
        }
        NodeIdentifier::Opaque(v) => {
            opcua::types::NodeId::new(ns, opcua::types::ByteString::from(v.as_slice()))
        }
    }
}

fn to_chrono(value: &opcua::types::DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    let dt = value.as_chrono();
    chrono::DateTime::from_timestamp(dt.timestamp(), dt.timestamp_subsec_nanos())
}

fn from_opcua_variant(variant: &opcua::types::Variant) -> OpcUaValue {
    use opcua::types::Variant;

    match variant {
        Variant::Empty => OpcUaValue::Null,
        Variant::Boolean(v) => OpcUaValue::Boolean(*v),
        Variant::SByte(v) => OpcUaValue::SByte(*v),
        Variant::Byte(v) => OpcUaValue::Byte(*v),
        Variant::Int16(v) => OpcUaValue::Int16(*v),
        Variant::UInt16(v) => OpcUaValue::UInt16(*v),
        Variant::Int32(v) => OpcUaValue::Int32(*v),
        Variant::UInt32(v) => OpcUaValue::UInt32(*v),
        Variant::Int64(v) => OpcUaValue::Int64(*v),
        Variant::UInt64(v) => OpcUaValue::UInt64(*v),
        Variant::Float(v) => OpcUaValue::Float(*v),
        Variant::Double(v) => OpcUaValue::Double(*v),
        Variant::String(v) => OpcUaValue::String(v.as_ref().to_string()),
        Variant::DateTime(v) => to_chrono(v).map_or(OpcUaValue::Null, OpcUaValue::DateTime),
        Variant::Guid(v) => OpcUaValue::Guid(uuid::Uuid::from_bytes(*v.as_bytes())),
        Variant::ByteString(v) => OpcUaValue::ByteString(v.value.clone().unwrap_or_default()),
        Variant::Array(arr) => {
            OpcUaValue::Array(arr.values.iter().map(from_opcua_variant).collect())
        }
        other => OpcUaValue::String(format!("{:?}", other)),
    }
}

fn to_read_result(data_value: &opcua::types::DataValue) -> ReadResult {
    let status_code = data_value.status.as_ref().map_or(0, |s| s.bits());
    ReadResult {
        value: data_value.value.as_ref().map(from_opcua_variant),
        status_code,
        server_timestamp: data_value.server_timestamp.as_ref().and_then(to_chrono),
        source_timestamp: data_value.source_timestamp.as_ref().and_then(to_chrono),
    }
}

// =============================================================================
// OpcUaTransport impl
// =============================================================================

#[async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    async fn connect(&mut self) -> OpcUaResult<()> {
        // A previous session may still linger after a stale read.
        self.abort();

        info!(endpoint = %self.config.endpoint, "Connecting to OPC UA server");

        let config = self.config.clone();
        let session = tokio::task::spawn_blocking(move || connect_blocking(&config))
            .await
            .map_err(|e| self.connect_failed(format!("connect task failed: {}", e)))?
            .map_err(|reason| self.connect_failed(reason))?;

        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        info!(endpoint = %self.config.endpoint, "Disconnecting from OPC UA server");

        tokio::task::spawn_blocking(move || session.read().disconnect())
            .await
            .map_err(|e| {
                OpcUaError::connect_failed(&self.config.endpoint, format!("disconnect task failed: {}", e))
            })
    }

    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.read().is_connected())
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> OpcUaResult<Vec<ReadResult>> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }

        let session = self
            .session
            .clone()
            .ok_or_else(OpcUaError::not_connected)?;

        let read_value_ids: Vec<ReadValueId> = node_ids
            .iter()
            .map(|n| ReadValueId {
                node_id: to_opcua_node_id(n),
                attribute_id: AttributeId::Value as u32,
                index_range: opcua::types::UAString::null(),
                data_encoding: opcua::types::QualifiedName::null(),
            })
            .collect();

        trace!(count = node_ids.len(), "Reading node values");

        let node_count = node_ids.len();
        let data_values = tokio::task::spawn_blocking(move || {
            session
                .read()
                .read(&read_value_ids, TimestampsToReturn::Both, 0.0)
        })
        .await
        .map_err(|e| OpcUaError::batch_read_failed(node_count, format!("read task failed: {}", e)))?
        .map_err(|status| {
            OpcUaError::operation(OperationError::batch_read_failed(
                node_count,
                FailureReason::Transport(format!("read service failed: {}", status)),
            ))
        })?;

        Ok(data_values.iter().map(to_read_result).collect())
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn abort(&mut self) {
        if let Some(session) = self.session.take() {
            warn!(endpoint = %self.config.endpoint, "Releasing OPC UA session without waiting");
            // Detached so no caller blocks on an unresponsive server.
            std::thread::spawn(move || session.read().disconnect());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
