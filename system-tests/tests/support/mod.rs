// system-tests/tests/support/mod.rs
// ============================================================================
// Module: Paired In-Process Transport
// Description: A two-sided `Transport` double that wires a client session
//              directly to a server session without a socket or child
//              process, for fast deterministic protocol-level tests.
// Purpose: Generalize `mcp-session`'s own `LoopbackTransport` test double
//          (which only echoes a canned response) into a genuine pairing
//          where both sides deliver real envelopes to a real peer session.
// Dependencies: async-trait, mcp-schema, mcp-session, mcp-transport, tokio
// ============================================================================

pub mod harness;

use std::sync::Arc;

use async_trait::async_trait;
use mcp_schema::Envelope;
use mcp_schema::McpError;
use mcp_transport::InboundHandler;
use mcp_transport::Transport;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// One half of an in-process transport pairing. Envelopes sent on this half
/// are delivered directly to the peer half's bound [`InboundHandler`].
pub struct PairedTransport {
    peer_handler: Mutex<Option<Arc<dyn InboundHandler>>>,
    peer: Mutex<Option<Arc<PairedTransport>>>,
}

impl PairedTransport {
    /// Builds two cross-wired halves: envelopes sent on one arrive at the
    /// other's connected handler.
    #[must_use]
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Arc::new(Self { peer_handler: Mutex::new(None), peer: Mutex::new(None) });
        let b = Arc::new(Self { peer_handler: Mutex::new(None), peer: Mutex::new(None) });
        (a, b)
    }

    /// Links this half to `peer` so `send` can reach across. Must be called
    /// on both halves before either connects.
    pub async fn link(this: &Arc<Self>, peer: &Arc<Self>) {
        *this.peer.lock().await = Some(Arc::clone(peer));
    }
}

#[async_trait]
impl Transport for PairedTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        *self.peer_handler.lock().await = Some(handler);
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        let peer = self.peer.lock().await.clone().ok_or_else(|| McpError::TransportNotReady("paired transport has no linked peer".to_string()))?;
        let handler = peer.peer_handler.lock().await.clone();
        if let Some(handler) = handler {
            handler.handle_envelope(envelope).await;
        }
        Ok(())
    }

    async fn close_gracefully(&self) {}

    async fn close(&self) {}
}

/// Builds one linked client/server [`PairedTransport`] pair, each already
/// upcast to `Arc<dyn Transport>` and ready for `Session::new`.
pub async fn paired_transports() -> (Arc<dyn Transport>, Arc<dyn Transport>) {
    let (client_side, server_side) = PairedTransport::pair();
    PairedTransport::link(&client_side, &server_side).await;
    PairedTransport::link(&server_side, &client_side).await;
    (client_side, server_side)
}

/// Wraps an [`InboundHandler`], forwarding every envelope it sees on an
/// unbounded channel before passing it on, so a test can observe what a
/// session received without interposing on its dispatch logic.
struct TappingHandler {
    inner: Arc<dyn InboundHandler>,
    tap: mpsc::UnboundedSender<Envelope>,
}

#[async_trait]
impl InboundHandler for TappingHandler {
    async fn handle_envelope(&self, envelope: Envelope) {
        let _ = self.tap.send(envelope.clone());
        self.inner.handle_envelope(envelope).await;
    }
}

/// A [`Transport`] decorator that reports every inbound envelope on `tap`
/// before handing it to the wrapped session, letting a test assert on raw
/// wire traffic a typed client/server face would otherwise swallow (e.g. a
/// filtered-out `notifications/message`).
pub struct TappingTransport {
    inner: Arc<dyn Transport>,
    tap: mpsc::UnboundedSender<Envelope>,
}

impl TappingTransport {
    /// Wraps `inner`, returning the decorator plus a receiver of every
    /// envelope subsequently delivered to the bound handler.
    pub fn new(inner: Arc<dyn Transport>) -> (Arc<Self>, mpsc::UnboundedReceiver<Envelope>) {
        let (tap, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { inner, tap }), rx)
    }
}

#[async_trait]
impl Transport for TappingTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        self.inner.connect(Arc::new(TappingHandler { inner: handler, tap: self.tap.clone() })).await
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        self.inner.send(envelope).await
    }

    async fn close_gracefully(&self) {
        self.inner.close_gracefully().await;
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
