// system-tests/tests/logging.rs
// ============================================================================
// Scenario coverage: `logging/setLevel` gating and severity filtering of
// `notifications/message` at the exchange.
// ============================================================================

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_protocol::Exchange;
use mcp_protocol::ServerHandlersBuilder;
use mcp_protocol::ServerSession;
use mcp_protocol::ToolHandler;
use mcp_schema::ClientCapabilities;
use mcp_schema::Envelope;
use mcp_schema::McpError;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::Content;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::LogLevel;
use mcp_schema::methods::LoggingMessageParams;
use mcp_schema::methods::ToolDefinition;
use mcp_session::Session;
use mcp_session::SessionOptions;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use support::TappingTransport;

struct LoggingTool;

#[async_trait]
impl ToolHandler for LoggingTool {
    async fn call(&self, exchange: &Exchange, _arguments: Value) -> Result<CallToolResult, McpError> {
        exchange.notify_log(LogLevel::Debug, Some("probe".to_string()), serde_json::json!("debug detail")).await?;
        exchange.notify_log(LogLevel::Warning, Some("probe".to_string()), serde_json::json!("warning detail")).await?;
        Ok(CallToolResult { content: vec![Content::Text { text: "done".to_string() }], is_error: false })
    }
}

/// Collects every `notifications/message` envelope arriving on `tap` within
/// `window`, ignoring any other traffic (request responses, handshake
/// envelopes) that happens to interleave with it.
async fn collect_log_messages(tap: &mut mpsc::UnboundedReceiver<Envelope>, window: Duration) -> Vec<LoggingMessageParams> {
    let deadline = Instant::now() + window;
    let mut out = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, tap.recv()).await {
            Ok(Some(Envelope::Notification(notification))) if notification.method == "notifications/message" => {
                if let Some(params) = notification.params.and_then(|value| serde_json::from_value::<LoggingMessageParams>(value).ok()) {
                    out.push(params);
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
    out
}

#[tokio::test]
async fn exchange_notify_log_drops_messages_below_the_sessions_minimum_level() {
    let server_handlers = ServerHandlersBuilder::new("srv", "0.1.0").enable_logging().build();
    server_handlers
        .add_tool(ToolDefinition { name: "logs".to_string(), description: None, input_schema: serde_json::json!({}) }, Arc::new(LoggingTool))
        .unwrap();
    let server_session = ServerSession::new(Arc::clone(&server_handlers));

    let client = mcp_protocol::McpClient::new(ClientCapabilities::default(), Implementation { name: "c".to_string(), version: "1".to_string() }, None, None);

    let (client_transport, server_transport) = support::paired_transports().await;
    let (tapped_client_transport, mut tap) = TappingTransport::new(client_transport);

    let client_session = Session::new(
        tapped_client_transport,
        Arc::clone(&client) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&client) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("c".to_string()), default_timeout: Duration::from_secs(5) },
    );
    client.bind(Arc::downgrade(&client_session));

    let server_session_inner = Session::new(
        server_transport,
        Arc::clone(&server_session) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&server_session) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("s".to_string()), default_timeout: Duration::from_secs(5) },
    );
    server_session.bind(Arc::downgrade(&server_session_inner));

    client_session.connect().await.unwrap();
    server_session_inner.connect().await.unwrap();
    client.initialize().await.unwrap();

    // Default minimum is `Info`, so the tool's `Debug` call is dropped and
    // only its `Warning` call reaches the wire.
    let result = client.call_tool("logs", serde_json::json!({})).await.unwrap();
    assert!(!result.is_error);
    let messages = collect_log_messages(&mut tap, Duration::from_millis(300)).await;
    assert_eq!(messages.len(), 1, "only the Warning-level message should have passed the default Info threshold");
    assert_eq!(messages[0].level, LogLevel::Warning);

    // Lowering the threshold to `Debug` lets both calls through next time.
    client.set_log_level(LogLevel::Debug).await.unwrap();
    let result = client.call_tool("logs", serde_json::json!({})).await.unwrap();
    assert!(!result.is_error);
    let messages = collect_log_messages(&mut tap, Duration::from_millis(300)).await;
    assert_eq!(messages.len(), 2, "both calls should pass once the threshold is lowered to Debug");
    assert_eq!(messages[0].level, LogLevel::Debug);
    assert_eq!(messages[1].level, LogLevel::Warning);
}

#[tokio::test]
async fn set_log_level_fails_locally_when_the_server_never_advertised_logging() {
    let server_handlers = ServerHandlersBuilder::new("srv", "0.1.0").build();
    let server_session = ServerSession::new(Arc::clone(&server_handlers));
    let client = mcp_protocol::McpClient::new(ClientCapabilities::default(), Implementation { name: "c".to_string(), version: "1".to_string() }, None, None);

    let (client_transport, server_transport) = support::paired_transports().await;
    let client_session = Session::new(
        client_transport,
        Arc::clone(&client) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&client) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("c".to_string()), default_timeout: Duration::from_secs(5) },
    );
    client.bind(Arc::downgrade(&client_session));
    let server_session_inner = Session::new(
        server_transport,
        Arc::clone(&server_session) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&server_session) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("s".to_string()), default_timeout: Duration::from_secs(5) },
    );
    server_session.bind(Arc::downgrade(&server_session_inner));
    client_session.connect().await.unwrap();
    server_session_inner.connect().await.unwrap();
    client.initialize().await.unwrap();

    let result = client.set_log_level(LogLevel::Debug).await;
    assert!(matches!(result, Err(McpError::CapabilityMissing(_))));
}
