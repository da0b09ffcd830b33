// mcp-transport/src/traits.rs
// ============================================================================
// Module: Transport Trait
// Description: The capability set every transport binding implements.
// Purpose: Let the session layer (mcp-session) depend on one trait object
//          regardless of which binding is wired up.
// Dependencies: async-trait, mcp-schema
// ============================================================================

//! ## Overview
//! `connect` starts inbound delivery and invokes the handler strictly in
//! arrival order; `send` enqueues an envelope and suspends while the
//! outbound queue is full; `close_gracefully` drains best-effort before
//! releasing resources; `close` is immediate.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_schema::Envelope;
use mcp_schema::McpError;

/// Receives inbound envelopes from a [`Transport`] in arrival order.
///
/// Implementations (the session layer) MUST NOT block on a lock while
/// inside `handle_envelope` if doing so could deadlock against their own
/// `sendRequest` waiters.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Delivers one decoded envelope.
    async fn handle_envelope(&self, envelope: Envelope);
}

/// Moves opaque envelopes bidirectionally over some byte stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts inbound delivery. Each decoded inbound envelope is passed to
    /// `handler` strictly in arrival order for this transport instance.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if the underlying stream
    /// cannot be established.
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError>;

    /// Enqueues an envelope for write, suspending while the outbound queue
    /// is full.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if the transport is closed, or
    /// [`McpError::TransportNotReady`] if the binding requires a discovery
    /// step (e.g. SSE endpoint event) that has not completed within its
    /// bounded wait.
    async fn send(&self, envelope: Envelope) -> Result<(), McpError>;

    /// Stops accepting new sends, drains the outbound queue best-effort,
    /// then releases underlying resources.
    async fn close_gracefully(&self);

    /// Releases underlying resources immediately, without draining.
    async fn close(&self);
}
