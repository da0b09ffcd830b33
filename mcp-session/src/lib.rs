// mcp-session/src/lib.rs
// ============================================================================
// Module: Session Layer
// Description: Bidirectional JSON-RPC session multiplexer.
// Purpose: Own one session's correlation state: the id generator, the
//          pending-waiter map, the Uninitialized/Initializing/Initialized
//          latch, and inbound dispatch to locally registered handlers.
// Dependencies: mcp-schema, mcp-transport, dashmap, tokio
// ============================================================================

//! ## Overview
//! A [`Session`] wraps one [`mcp_transport::Transport`] and turns it into a
//! request/response/notification multiplexer: `send_request` correlates a
//! generated id to a waiter and suspends until the matching response arrives
//! or the timeout elapses; `send_notification` is fire-and-forget; inbound
//! requests and notifications are handed to caller-registered
//! [`RequestHandler`]/[`NotificationHandler`] implementations. The session
//! itself never interprets method names or params — that is the protocol
//! layer's job.

mod dispatch;
mod ids;
mod session;
mod state;

pub use dispatch::NotificationHandler;
pub use dispatch::RequestHandler;
pub use ids::SessionIdGenerator;
pub use session::Session;
pub use session::SessionOptions;
pub use state::SessionState;
