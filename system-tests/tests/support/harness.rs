// system-tests/tests/support/harness.rs
// ============================================================================
// Module: Connected Pair Harness
// Description: Builds a fully initialized client/server session pair over a
//              `PairedTransport`, the fixture every protocol-level test
//              starts from.
// Purpose: Avoid repeating the wiring in `mcp-cli`'s `serve_stdio` at the
//          top of every test.
// Dependencies: mcp-protocol, mcp-schema, mcp-session
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use mcp_protocol::McpClient;
use mcp_protocol::ServerHandlers;
use mcp_protocol::ServerHandlersBuilder;
use mcp_protocol::ServerSession;
use mcp_schema::ClientCapabilities;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::InitializeResult;
use mcp_session::Session;
use mcp_session::SessionOptions;

use super::paired_transports;

/// A running client/server pair sharing one [`PairedTransport`] link.
pub struct ConnectedPair {
    pub client: Arc<McpClient>,
    pub client_session: Arc<Session>,
    pub server_handlers: Arc<ServerHandlers>,
    pub server_session: Arc<Session>,
}

/// Builds `server_handlers` via `configure`, connects both halves over a
/// [`PairedTransport`] pairing, and performs `initialize` from the client
/// side. Returns the pair once the handshake completes.
pub async fn connected_pair(configure: impl FnOnce(ServerHandlersBuilder) -> ServerHandlersBuilder) -> (ConnectedPair, InitializeResult) {
    let server_handlers = configure(ServerHandlersBuilder::new("system-tests-server", "0.1.0")).build();
    let server_session = ServerSession::new(Arc::clone(&server_handlers));

    let client = McpClient::new(ClientCapabilities::default(), Implementation { name: "system-tests-client".to_string(), version: "0.1.0".to_string() }, None, None);

    let (client_transport, server_transport) = paired_transports().await;

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

    client_session.connect().await.expect("client session connects over the paired transport");
    server_session_inner.connect().await.expect("server session connects over the paired transport");

    let init = client.initialize().await.expect("handshake succeeds over the paired transport");

    (
        ConnectedPair { client, client_session, server_handlers, server_session: server_session_inner },
        init,
    )
}
