// mcp-schema/src/error.rs
// ============================================================================
// Module: MCP Error
// Description: The shared error enum every crate in the workspace re-exports.
// Purpose: Give local errors (capability gating, registry preconditions) and
//          reconstructed remote errors (peer-encoded JSON-RPC error bodies)
//          one vocabulary.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! `McpError` realizes the abstract error kinds of the protocol spec: some
//! variants are raised purely locally (capability gating, registry
//! preconditions, readiness), others wrap a transport or codec failure, and
//! [`McpError::Remote`] reconstructs a JSON-RPC error body the peer sent
//! over the wire. Propagation policy: local errors never touch the wire;
//! remote errors are rebuilt from `code`/`message`/`data` and raised to the
//! caller unchanged.

use crate::envelope::JsonRpcError;

/// Errors surfaced anywhere in the MCP runtime.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Inbound bytes did not parse as JSON.
    #[error("parse error: {0}")]
    ParseError(String),
    /// Envelope was valid JSON but matched none of request/response/notification.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// No handler is registered for the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// A handler rejected its own parameters.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// A handler failed internally; the message is forwarded from the error body.
    #[error("internal error: {0}")]
    InternalError(String),
    /// Operation requires a capability the counterparty did not advertise.
    /// Detected locally; no wire call is attempted.
    #[error("capability missing: {0}")]
    CapabilityMissing(String),
    /// Operation attempted before the readiness latch was satisfied.
    #[error("client must be initialized before {0}")]
    NotInitialized(String),
    /// Per-request timeout expired before a response arrived.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The peer's proposed or returned protocol version is unsupported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),
    /// The transport is not yet ready to send (e.g. SSE endpoint not discovered).
    #[error("transport not ready: {0}")]
    TransportNotReady(String),
    /// The transport failed; the session is typically closing.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// The outbound queue is full; the caller may retry.
    #[error("transport send would block: {0}")]
    Transient(String),
    /// A registry insert found an existing entry under the same key.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// A registry removal or lookup found no entry under the given key.
    #[error("not found: {0}")]
    NotFound(String),
    /// The session (or provider) was closed; pending waiters are cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),
    /// A value did not decode into the requested type.
    #[error("codec error: {0}")]
    Codec(String),
    /// The peer returned a JSON-RPC error; reconstructed with the original
    /// code, message, and structured data.
    #[error("remote error {code}: {message}", code = .0.code, message = .0.message)]
    Remote(JsonRpcError),
}

impl McpError {
    /// Maps a local error to the reserved JSON-RPC code it would carry if it
    /// ever needed to cross the wire (used when a handler's own error must
    /// be wrapped into a response.
    #[must_use]
    pub fn to_wire_code(&self) -> i64 {
        match self {
            Self::ParseError(_) => JsonRpcError::PARSE_ERROR,
            Self::InvalidRequest(_) => JsonRpcError::INVALID_REQUEST,
            Self::MethodNotFound(_) => JsonRpcError::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => JsonRpcError::INVALID_PARAMS,
            Self::Remote(err) => err.code,
            _ => JsonRpcError::INTERNAL_ERROR,
        }
    }
}

impl From<JsonRpcError> for McpError {
    fn from(value: JsonRpcError) -> Self {
        Self::Remote(value)
    }
}
