// mcp-session/src/dispatch.rs
// ============================================================================
// Module: Inbound Dispatch Traits
// Description: The two callback shapes the protocol layer registers with a
//              session to answer inbound requests and observe notifications.
// Purpose: Keep the session layer ignorant of method names; it only knows
//          "something arrived, hand it to the registered callback."
// Dependencies: async-trait, mcp-schema
// ============================================================================

//! ## Overview
//! [`RequestHandler`] answers inbound requests (the protocol layer routes by
//! method name internally and returns either a result value or a
//! [`JsonRpcError`] body). [`NotificationHandler`] observes inbound
//! notifications and never replies. Both run inside the session's inbound
//! dispatch task, so they MUST NOT hold a lock while suspending
//! on `Session::send_request` (that would deadlock against this same task's
//! own waiter bookkeeping only if the handler awaited its own response
//! inline while holding a lock the response path needs — callers should
//! spawn long-running work rather than block dispatch).

use async_trait::async_trait;
use mcp_schema::JsonRpcError;
use mcp_schema::Request;
use serde_json::Value;

/// Answers inbound requests routed to this session.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handles one inbound request, returning the value to place in
    /// `result` or the error body to place in `error`.
    async fn handle_request(&self, request: Request) -> Result<Value, JsonRpcError>;
}

/// Observes inbound notifications routed to this session.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handles one inbound notification. Notifications never elicit a
    /// response, so this returns nothing.
    async fn handle_notification(&self, method: &str, params: Option<Value>);
}
