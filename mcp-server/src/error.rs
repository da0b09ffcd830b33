// mcp-server/src/error.rs
// ============================================================================
// Module: Server Errors
// Description: Failure modes specific to standing up and operating the
//              HTTP+SSE provider.
// Purpose: Keep bind/listen/config failures distinct from the wire-level
//          `McpError` the protocol layer already owns.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! One variant per failure phase, each carrying a human-readable reason.

use thiserror::Error;

/// Failures raised while standing up or operating a [`crate::HttpSseProvider`].
#[derive(Debug, Error)]
pub enum McpServerError {
    /// The bind address or listener configuration was invalid.
    #[error("config error: {0}")]
    Config(String),
    /// The listener could not be bound or the axum server failed while
    /// serving.
    #[error("transport error: {0}")]
    Transport(String),
    /// [`crate::HttpSseProvider::set_session_factory`] was called more than
    /// once.
    #[error("session factory already set")]
    FactoryAlreadySet,
}
