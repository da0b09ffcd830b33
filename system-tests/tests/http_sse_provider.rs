// system-tests/tests/http_sse_provider.rs
// ============================================================================
// Scenario coverage: a real client/server pair wired over the HTTP+SSE
// provider on a loopback socket, rather than the in-process paired
// transport every other scenario file uses.
// ============================================================================

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_protocol::Exchange;
use mcp_protocol::McpClient;
use mcp_protocol::ServerHandlersBuilder;
use mcp_protocol::ServerSession;
use mcp_protocol::ToolHandler;
use mcp_schema::ClientCapabilities;
use mcp_schema::McpError;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::Content;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::ToolDefinition;
use mcp_server::HttpSseProvider;
use mcp_session::Session;
use mcp_session::SessionOptions;
use mcp_transport::Transport;
use mcp_transport::sse::SseClientTransport;
use serde_json::Value;

struct UppercaseTool;

#[async_trait]
impl ToolHandler for UppercaseTool {
    async fn call(&self, _exchange: &Exchange, arguments: Value) -> Result<CallToolResult, McpError> {
        let text = arguments.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(CallToolResult { content: vec![Content::Text { text: text.to_uppercase() }], is_error: false })
    }
}

/// Binds an ephemeral loopback port, starts an [`HttpSseProvider`] on it,
/// and returns its base URL alongside the bound listener's join handle.
async fn spawn_provider() -> (Arc<HttpSseProvider>, String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("binds an ephemeral port");
    let local_addr = listener.local_addr().expect("bound listener has a local address");
    let base_url = format!("http://{local_addr}");

    let handlers = ServerHandlersBuilder::new("http-sse-system-test", "0.1.0").build();
    handlers
        .add_tool(
            ToolDefinition { name: "upper".to_string(), description: None, input_schema: serde_json::json!({"type": "object"}) },
            Arc::new(UppercaseTool),
        )
        .unwrap();

    let provider = HttpSseProvider::new(base_url.clone(), "/sse", "/message");
    provider
        .set_session_factory(Arc::new(move |transport: Arc<dyn Transport>| {
            let server_session = ServerSession::new(Arc::clone(&handlers));
            let session = Session::new(
                transport,
                Arc::clone(&server_session) as Arc<dyn mcp_session::RequestHandler>,
                Arc::clone(&server_session) as Arc<dyn mcp_session::NotificationHandler>,
                SessionOptions { id_prefix: Some("s".to_string()), default_timeout: Duration::from_secs(5) },
            );
            server_session.bind(Arc::downgrade(&session));
            session
        }))
        .unwrap();

    let router = provider.router();
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    (provider, base_url, join)
}

#[tokio::test]
async fn a_client_over_real_http_and_sse_completes_the_handshake_and_calls_a_tool() {
    let (provider, base_url, server_task) = spawn_provider().await;

    let client_transport: Arc<dyn Transport> = Arc::new(SseClientTransport::new(&base_url).expect("base url parses"));
    let client = McpClient::new(ClientCapabilities::default(), Implementation { name: "http-client".to_string(), version: "0.1.0".to_string() }, None, None);
    let client_session = Session::new(
        client_transport,
        Arc::clone(&client) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&client) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { id_prefix: Some("c".to_string()), default_timeout: Duration::from_secs(5) },
    );
    client.bind(Arc::downgrade(&client_session));
    client_session.connect().await.expect("client session connects over http+sse");

    let init = client.initialize().await.expect("handshake succeeds over real http+sse");
    assert_eq!(init.server_info.name, "http-sse-system-test");

    let result = client.call_tool("upper", serde_json::json!({"text": "hi there"})).await.expect("tool call succeeds");
    assert!(!result.is_error);
    assert!(matches!(&result.content[0], Content::Text { text } if text == "HI THERE"));

    assert_eq!(provider.session_count(), 1);

    client_session.close_gracefully().await;
    provider.close_gracefully().await;
    server_task.abort();
}
