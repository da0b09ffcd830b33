// system-tests/tests/timeout.rs
// ============================================================================
// Scenario coverage: request timeout expiry, pending-waiter removal, and the
// late response that follows an already-timed-out request being silently
// dropped rather than misrouted.
// ============================================================================

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_protocol::Exchange;
use mcp_protocol::ToolHandler;
use mcp_schema::McpError;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::Content;
use mcp_schema::methods::ToolDefinition;
use serde_json::Value;

use support::harness::connected_pair;

struct SlowTool;

#[async_trait]
impl ToolHandler for SlowTool {
    async fn call(&self, _exchange: &Exchange, _arguments: Value) -> Result<CallToolResult, McpError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(CallToolResult { content: vec![Content::Text { text: "eventually".to_string() }], is_error: false })
    }
}

#[tokio::test]
async fn a_request_that_outlives_its_timeout_fails_and_the_late_response_is_dropped_not_misrouted() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    pair.server_handlers
        .add_tool(ToolDefinition { name: "slow".to_string(), description: None, input_schema: serde_json::json!({}) }, Arc::new(SlowTool))
        .unwrap();

    let params = serde_json::json!({"name": "slow", "arguments": {}});
    let result = pair.client_session.send_request_with_timeout("tools/call", Some(params), Duration::from_millis(20)).await;
    assert!(matches!(result, Err(McpError::Timeout(_))));

    // The server answers ~150ms after the call started; give it time to land
    // on a session whose pending waiter has already been removed.
    tokio::time::sleep(Duration::from_millis(250)).await;

    // The session itself is unaffected by the dropped late response: a fresh
    // request on the same session still resolves normally.
    let ok = pair.client.call_tool("slow", serde_json::json!({})).await.unwrap();
    assert!(!ok.is_error);
}

#[tokio::test]
async fn a_request_that_answers_within_the_timeout_resolves_normally() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    pair.server_handlers
        .add_tool(ToolDefinition { name: "slow".to_string(), description: None, input_schema: serde_json::json!({}) }, Arc::new(SlowTool))
        .unwrap();

    let params = serde_json::json!({"name": "slow", "arguments": {}});
    let result = pair.client_session.send_request_with_timeout("tools/call", Some(params), Duration::from_secs(2)).await;
    assert!(result.is_ok());
}
