// mcp-server/src/transport.rs
// ============================================================================
// Module: Server-Side SSE Transport
// Description: Server half of the HTTP+SSE pairing.
// Purpose: Bridge one SSE connection's outbound channel to the `Transport`
//          trait the session layer (mcp-session) expects, and hand POSTed
//          bytes to the session's registered inbound handler.
// Dependencies: async-trait, axum, mcp-schema, mcp-transport, tokio
// ============================================================================

//! ## Overview
//! One [`SseServerTransport`] is built per accepted `GET <sseEndpoint>`
//! connection. `Transport::send` encodes outbound envelopes as `message` SSE
//! frames pushed onto the connection's channel; [`SseServerTransport::deliver_post_body`]
//! is the other half, invoked by the `POST <messageEndpoint>` handler to feed
//! bytes the transport itself never reads off a socket.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::response::sse::Event;
use mcp_schema::Envelope;
use mcp_schema::McpError;
use mcp_transport::InboundHandler;
use mcp_transport::Transport;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Server-side transport for one SSE connection.
///
/// Inbound bytes never arrive on this type directly (there is no socket to
/// read); the `POST <messageEndpoint>` handler decodes them and calls
/// [`SseServerTransport::deliver_post_body`], which forwards to whatever
/// handler [`Transport::connect`] registered.
pub struct SseServerTransport {
    outbound: mpsc::Sender<Event>,
    handler: Mutex<Option<Arc<dyn InboundHandler>>>,
    closing: AtomicBool,
}

impl SseServerTransport {
    /// Builds a transport that pushes outbound frames onto `outbound`, the
    /// sender half of the channel feeding the connection's SSE stream.
    #[must_use]
    pub fn new(outbound: mpsc::Sender<Event>) -> Self {
        Self {
            outbound,
            handler: Mutex::new(None),
            closing: AtomicBool::new(false),
        }
    }

    /// Pushes the `endpoint` discovery event the client waits for before its
    /// first `send`. Sent once, before the transport is handed to
    /// [`mcp_session::Session::connect`].
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if the connection's SSE stream
    /// has already been dropped.
    pub async fn send_endpoint_event(&self, url: &str) -> Result<(), McpError> {
        self.outbound
            .send(Event::default().event("endpoint").data(url))
            .await
            .map_err(|_| McpError::TransportFailure("sse connection closed before endpoint event".to_string()))
    }

    /// Decodes one POSTed body and hands it to the registered inbound
    /// handler, in lieu of a background reader task.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::ParseError`] or [`McpError::InvalidRequest`] if
    /// `bytes` do not decode to a well-formed envelope.
    pub async fn deliver_post_body(&self, bytes: &[u8]) -> Result<(), McpError> {
        let envelope = mcp_schema::envelope::decode(bytes)?;
        if let Some(handler) = self.handler.lock().await.as_ref() {
            handler.handle_envelope(envelope).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for SseServerTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        *self.handler.lock().await = Some(handler);
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(McpError::TransportFailure("sse transport is closing".to_string()));
        }
        let bytes = mcp_schema::envelope::encode(&envelope)?;
        let payload = String::from_utf8_lossy(&bytes).into_owned();
        self.outbound
            .send(Event::default().event("message").data(payload))
            .await
            .map_err(|_| McpError::TransportFailure("sse connection closed".to_string()))
    }

    async fn close_gracefully(&self) {
        self.closing.store(true, Ordering::Release);
    }

    async fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }
}
