// mcp-protocol/src/exchange.rs
// ============================================================================
// Module: Exchange
// Description: Per-session handle passed to every server-side handler.
// Purpose: Let a tool/resource/prompt/completion handler make reverse calls
//          (sampling, roots) and emit filtered log notifications without
//          reaching into session internals.
// Dependencies: mcp-schema, mcp-session
// ============================================================================

//! ## Overview
//! One [`Exchange`] is built per inbound request from the session that
//! carried it, the client's advertised capabilities/identity (captured at
//! `initialize`), and the session's current minimum log level. Reverse calls
//! are capability-gated locally: asking for sampling
//! when the client never advertised it fails immediately with
//! [`McpError::CapabilityMissing`], without any wire traffic.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use mcp_schema::ClientCapabilities;
use mcp_schema::McpError;
use mcp_schema::methods::CreateMessageParams;
use mcp_schema::methods::CreateMessageResult;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::ListRootsResult;
use mcp_schema::methods::LogLevel;
use mcp_schema::methods::LoggingMessageParams;
use mcp_schema::methods::ResourceSubscriptionParams;
use mcp_session::Session;
use serde_json::Value;

/// Per-session handle passed to every registered handler.
#[derive(Clone)]
pub struct Exchange {
    session: Arc<Session>,
    client_capabilities: ClientCapabilities,
    client_info: Implementation,
    min_log_level: Arc<AtomicU8>,
    subscriptions: Arc<Mutex<HashSet<String>>>,
}

impl Exchange {
    pub(crate) fn new(
        session: Arc<Session>,
        client_capabilities: ClientCapabilities,
        client_info: Implementation,
        min_log_level: Arc<AtomicU8>,
        subscriptions: Arc<Mutex<HashSet<String>>>,
    ) -> Self {
        Self {
            session,
            client_capabilities,
            client_info,
            min_log_level,
            subscriptions,
        }
    }

    /// The client's advertised capability set, captured at `initialize`.
    #[must_use]
    pub fn client_capabilities(&self) -> &ClientCapabilities {
        &self.client_capabilities
    }

    /// The client's identity, captured at `initialize`.
    #[must_use]
    pub fn client_info(&self) -> &Implementation {
        &self.client_info
    }

    /// Asks the client to sample a completion from its model.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the client never
    /// advertised `sampling`, or whatever [`Session::send_request`] returns.
    pub async fn create_message(&self, params: CreateMessageParams) -> Result<CreateMessageResult, McpError> {
        if self.client_capabilities.sampling.is_none() {
            return Err(McpError::CapabilityMissing("client did not advertise sampling".to_string()));
        }
        let value = self
            .session
            .send_request("sampling/createMessage", Some(serde_json::to_value(params).map_err(|err| McpError::Codec(err.to_string()))?))
            .await?;
        serde_json::from_value(value).map_err(|err| McpError::Codec(err.to_string()))
    }

    /// Asks the client for its current list of filesystem/URI roots.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the client never
    /// advertised `roots`, or whatever [`Session::send_request`] returns.
    pub async fn list_roots(&self) -> Result<ListRootsResult, McpError> {
        if self.client_capabilities.roots.is_none() {
            return Err(McpError::CapabilityMissing("client did not advertise roots".to_string()));
        }
        let value = self.session.send_request("roots/list", None).await?;
        serde_json::from_value(value).map_err(|err| McpError::Codec(err.to_string()))
    }

    /// Emits `notifications/message` if `level` meets the session's current
    /// minimum (set via `logging/setLevel`); silently drops it otherwise.
    ///
    /// # Errors
    ///
    /// Whatever [`Session::send_notification`] returns.
    pub async fn notify_log(&self, level: LogLevel, logger: Option<String>, data: Value) -> Result<(), McpError> {
        if (level as u8) < self.min_log_level.load(Ordering::Acquire) {
            return Ok(());
        }
        let params = LoggingMessageParams { level, logger, data };
        self.session
            .send_notification(
                "notifications/message",
                Some(serde_json::to_value(params).map_err(|err| McpError::Codec(err.to_string()))?),
            )
            .await
    }

    /// Emits `notifications/resources/updated` for `uri` if and only if this
    /// session currently holds a live `resources/subscribe` subscription on
    /// it; silently does nothing otherwise, mirroring [`Self::notify_log`]'s
    /// drop-if-uninterested behavior.
    ///
    /// # Errors
    ///
    /// Whatever [`Session::send_notification`] returns.
    pub async fn notify_resource_updated(&self, uri: impl Into<String>) -> Result<(), McpError> {
        let uri = uri.into();
        let subscribed = self
            .subscriptions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&uri);
        if !subscribed {
            return Ok(());
        }
        let params = ResourceSubscriptionParams { uri };
        self.session
            .send_notification(
                "notifications/resources/updated",
                Some(serde_json::to_value(params).map_err(|err| McpError::Codec(err.to_string()))?),
            )
            .await
    }
}
