// system-tests/tests/handshake.rs
// ============================================================================
// Scenario coverage: initialize handshake, version echo, readiness latch.
// ============================================================================

mod support;

use std::time::Duration;

use mcp_protocol::McpClient;
use mcp_protocol::ServerHandlersBuilder;
use mcp_protocol::ServerSession;
use mcp_schema::ClientCapabilities;
use mcp_schema::McpError;
use mcp_schema::methods::Implementation;
use mcp_session::Session;
use mcp_session::SessionOptions;

use support::paired_transports;
use support::harness::connected_pair;

#[tokio::test]
async fn initialize_echoes_a_version_the_server_supports() {
    let (_pair, init) = connected_pair(|builder| builder).await;
    assert_eq!(init.protocol_version, "2025-06-18");
    assert_eq!(init.server_info.name, "system-tests-server");
}

#[tokio::test]
async fn tools_list_succeeds_after_initialized_notification() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    let tools = pair.client.list_all_tools().await.unwrap();
    assert!(tools.is_empty());
}

#[tokio::test]
async fn a_request_before_initialized_notification_waits_out_the_latch_and_fails() {
    let server_handlers = ServerHandlersBuilder::new("srv", "0.1.0").build();
    let server_session = ServerSession::with_initialization_timeout(server_handlers, Duration::from_millis(50));

    let client = McpClient::new(ClientCapabilities::default(), Implementation { name: "c".to_string(), version: "1".to_string() }, None, None);

    let (client_transport, server_transport) = paired_transports().await;
    let client_session = Session::new(
        client_transport,
        std::sync::Arc::clone(&client) as std::sync::Arc<dyn mcp_session::RequestHandler>,
        std::sync::Arc::clone(&client) as std::sync::Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("c".to_string()), default_timeout: Duration::from_secs(5) },
    );
    client.bind(std::sync::Arc::downgrade(&client_session));

    let server_session_inner = Session::new(
        server_transport,
        std::sync::Arc::clone(&server_session) as std::sync::Arc<dyn mcp_session::RequestHandler>,
        std::sync::Arc::clone(&server_session) as std::sync::Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("s".to_string()), default_timeout: Duration::from_secs(5) },
    );
    server_session.bind(std::sync::Arc::downgrade(&server_session_inner));

    client_session.connect().await.unwrap();
    server_session_inner.connect().await.unwrap();

    // Send `initialize` directly on the session, bypassing `McpClient::initialize`,
    // so `notifications/initialized` is never sent and the server is left
    // waiting out its initialization timeout when a later request arrives.
    let params = serde_json::json!({
        "protocolVersion": "2025-06-18",
        "capabilities": {},
        "clientInfo": { "name": "c", "version": "1" },
    });
    client_session.send_request("initialize", Some(params)).await.unwrap();

    let result = client_session.send_request("tools/list", None).await;
    assert!(matches!(result, Err(McpError::Remote(_))));
    if let Err(McpError::Remote(err)) = result {
        assert_eq!(err.code, mcp_schema::JsonRpcError::INTERNAL_ERROR);
        assert!(err.message.contains("initialized"));
    }
}

#[tokio::test]
async fn a_second_concurrent_initialize_is_rejected() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    let params = serde_json::json!({
        "protocolVersion": "2025-06-18",
        "capabilities": {},
        "clientInfo": { "name": "c", "version": "1" },
    });
    let result = pair.client_session.send_request("initialize", Some(params)).await;
    assert!(matches!(result, Err(McpError::Remote(_))));
}
