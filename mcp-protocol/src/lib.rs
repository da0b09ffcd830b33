// mcp-protocol/src/lib.rs
// ============================================================================
// Module: Protocol Layer
// Description: Client and server protocol faces over a bidirectional session.
// Purpose: Turn a generic request/response/notification `Session`
//          (mcp-session) into the typed MCP method surface: a client that
//          drives the handshake and calls the server's
//          tools/resources/prompts, and a server that answers them through
//          caller-registered handlers.
// Dependencies: mcp-schema, mcp-session, async-trait, dashmap, tokio
// ============================================================================

//! ## Overview
//! [`client::McpClient`] is built over an already-connected [`mcp_session::Session`]
//! and drives the `initialize` handshake, then exposes typed request helpers
//! for the rest of the client-to-server surface, plus a [`client::RootsProvider`]/
//! [`client::Sampler`] pair for answering the server's reverse calls.
//! [`server::ServerHandlers`]/[`server::ServerSession`] do the symmetric job on
//! the server side: handler registries shared across every connection, and a
//! per-connection router that turns inbound requests into handler calls.
//! [`exchange::Exchange`] is the handle every server-side handler receives to
//! make its own reverse calls and emit filtered log notifications.

pub mod client;
pub mod exchange;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod server;

pub use exchange::Exchange;
pub use handlers::CompletionHandler;
pub use handlers::PromptHandler;
pub use handlers::ResourceHandler;
pub use handlers::ToolHandler;
pub use metrics::McpMethod;
pub use metrics::McpMetricEvent;
pub use metrics::McpMetrics;
pub use metrics::McpOutcome;
pub use metrics::NoopMetrics;
pub use registry::Registry;
pub use server::ListChangedSignals;
pub use server::ServerHandlers;
pub use server::ServerHandlersBuilder;
pub use server::ServerSession;

pub use client::ChangeNotification;
pub use client::McpClient;
pub use client::RootsProvider;
pub use client::Sampler;
