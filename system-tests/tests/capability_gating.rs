// system-tests/tests/capability_gating.rs
// ============================================================================
// Scenario coverage: capability gating fails locally, before any wire
// traffic, and the MethodNotFound shape a server returns for a reverse
// call the client cannot answer.
// ============================================================================

mod support;

use mcp_schema::ClientCapabilities;
use mcp_schema::McpError;
use mcp_schema::capabilities::RootsCapability;
use mcp_schema::methods::CreateMessageParams;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::Role;
use mcp_schema::methods::SamplingMessage;

use support::harness::connected_pair;

#[tokio::test]
async fn listing_tools_against_a_server_with_no_tools_capability_fails_locally() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    // No tool was ever registered, so `server_capabilities().tools` is `None`.
    let result = pair.client.list_tools(None).await;
    assert!(matches!(result, Err(McpError::CapabilityMissing(_))));
}

#[tokio::test]
async fn roots_list_against_a_client_with_no_roots_capability_is_method_not_found() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    // The exchange is only reachable via a handler; exercise the same
    // dispatch path the exchange would through a raw session request.
    let result = pair.server_session.send_request("roots/list", Some(serde_json::json!({}))).await;
    match result {
        Err(McpError::Remote(err)) => {
            assert_eq!(err.code, mcp_schema::JsonRpcError::METHOD_NOT_FOUND);
            assert_eq!(err.message, "Roots not supported");
            let data = err.data.expect("method-not-found carries a structured reason");
            assert_eq!(data["reason"], "Client does not have roots capability");
        }
        other => panic!("expected a remote MethodNotFound error, got {other:?}"),
    }
}

#[tokio::test]
async fn sampling_against_a_client_with_no_sampling_capability_fails_locally() {
    let (pair, _init) = connected_pair(|builder| builder).await;

    // Client never advertised `sampling`, so a raw `sampling/createMessage`
    // sent by the server is answered with MethodNotFound by the client,
    // without the client ever invoking a sampler.
    let params = CreateMessageParams {
        messages: vec![SamplingMessage { role: Role::User, content: mcp_schema::methods::Content::Text { text: "hi".to_string() } }],
        model_preferences: None,
        system_prompt: None,
        max_tokens: 16,
    };
    let result = pair
        .server_session
        .send_request("sampling/createMessage", Some(serde_json::to_value(params).unwrap()))
        .await;
    assert!(matches!(result, Err(McpError::Remote(_))));
}

#[tokio::test]
async fn a_client_that_advertises_roots_answers_roots_list() {
    let server_handlers = mcp_protocol::ServerHandlersBuilder::new("srv", "0.1.0").build();
    let server_session = mcp_protocol::ServerSession::new(server_handlers.clone());
    let client = mcp_protocol::McpClient::new(
        ClientCapabilities { roots: Some(RootsCapability { list_changed: true }), ..ClientCapabilities::default() },
        Implementation { name: "c".to_string(), version: "1".to_string() },
        None,
        None,
    );

    let (client_transport, server_transport) = support::paired_transports().await;
    let client_session = mcp_session::Session::new(
        client_transport,
        std::sync::Arc::clone(&client) as std::sync::Arc<dyn mcp_session::RequestHandler>,
        std::sync::Arc::clone(&client) as std::sync::Arc<dyn mcp_session::NotificationHandler>,
        mcp_session::SessionOptions { id_prefix: Some("c".to_string()), default_timeout: std::time::Duration::from_secs(5) },
    );
    client.bind(std::sync::Arc::downgrade(&client_session));
    let server_session_inner = mcp_session::Session::new(
        server_transport,
        std::sync::Arc::clone(&server_session) as std::sync::Arc<dyn mcp_session::RequestHandler>,
        std::sync::Arc::clone(&server_session) as std::sync::Arc<dyn mcp_session::NotificationHandler>,
        mcp_session::SessionOptions { id_prefix: Some("s".to_string()), default_timeout: std::time::Duration::from_secs(5) },
    );
    server_session.bind(std::sync::Arc::downgrade(&server_session_inner));
    client_session.connect().await.unwrap();
    server_session_inner.connect().await.unwrap();
    client.initialize().await.unwrap();

    let roots = server_session_inner.send_request("roots/list", Some(serde_json::json!({}))).await.unwrap();
    assert_eq!(roots["items"], serde_json::json!([]));
}
