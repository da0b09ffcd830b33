// mcp-server/src/lib.rs
// ============================================================================
// Crate: mcp-server
// Description: Multi-session HTTP+SSE server-session provider.
// Purpose: Pair GET `<sseEndpoint>` connections with POST `<messageEndpoint>`
//          deliveries, one [`mcp_session::Session`] per SSE connection, so
//          many clients can be live against the same handler registries at
//          once.
// Dependencies: axum, dashmap, mcp-schema, mcp-session, mcp-transport,
//               mcp-protocol, tokio, uuid
// ============================================================================

//! ## Overview
//! A [`HttpSseProvider`] owns zero or more live sessions, each keyed by an
//! opaque session id minted on `GET <sseEndpoint>`. The embedder supplies a
//! [`SessionFactory`] (via [`HttpSseProvider::set_session_factory`]) exactly
//! once, before wiring the returned [`axum::Router`] into a listener; the
//! factory is the seam where `mcp-cli` plugs in a [`mcp_protocol::ServerSession`]
//! bound to its shared [`mcp_protocol::ServerHandlers`].
//!
//! [`HttpSseProvider::notify_clients`] broadcasts one notification to every
//! live session, logging (not failing) per-session delivery errors: one bad
//! peer never blocks delivery to the rest.

mod error;
mod provider;
mod transport;

pub use error::McpServerError;
pub use provider::HttpSseProvider;
pub use provider::SessionFactory;
pub use provider::SessionId;
pub use transport::SseServerTransport;
