// mcp-transport/src/lib.rs
// ============================================================================
// Module: MCP Transport
// Description: Transport trait plus the stdio and HTTP+SSE client bindings.
// Purpose: Move opaque envelopes bidirectionally without knowing method
//          shapes, so the session layer (mcp-session) can sit on top of
//          either binding unchanged.
// Dependencies: mcp-schema, tokio, reqwest, reqwest-eventsource
// ============================================================================

//! ## Overview
//! A [`Transport`] delivers inbound envelopes to an [`InboundHandler`] in
//! arrival order and accepts outbound envelopes with backpressure. Two
//! client-side bindings live here: [`stdio::StdioClientTransport`] (spawns a
//! child process and speaks line-delimited JSON over its stdio) and
//! [`sse::SseClientTransport`] (the client half of the HTTP+SSE pairing).
//! [`stdio::StdioServerTransport`] is the symmetric server-side stdio
//! binding used when this process itself is the MCP server. The server-side
//! HTTP+SSE binding is multi-session by construction and lives in
//! `mcp-server`, not here.

pub mod sse;
pub mod stdio;
pub mod traits;

pub use traits::InboundHandler;
pub use traits::Transport;
