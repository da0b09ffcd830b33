// mcp-server/src/provider.rs
// ============================================================================
// Module: HTTP+SSE Server-Session Provider
// Description: Pairs GET `<sseEndpoint>` connections with POST
//              `<messageEndpoint>` deliveries into live, multiplexed
//              sessions.
// Purpose: Real multi-session HTTP+SSE pairing: many concurrent SSE
//          connections, each its own session, each addressable by the
//          opaque session id minted at connect time.
// Dependencies: axum, dashmap, mcp-schema, mcp-session, mcp-transport, tokio,
//               uuid
// ============================================================================

//! ## Overview
//! [`HttpSseProvider::set_session_factory`] is called exactly once by the
//! embedder, before the returned [`axum::Router`] is wired into
//! a listener. Each `GET <sseEndpoint>` then:
//! 1. mints a session id,
//! 2. builds a [`crate::SseServerTransport`] and runs it through the
//!    factory to get a bound [`mcp_session::Session`],
//! 3. sends the `endpoint` discovery event carrying the POST URL, and
//! 4. registers the session so a later `POST <messageEndpoint>?sessionId=...`
//!    can find it.
//!
//! The POST handler only ever acknowledges that a well-formed envelope was
//! handed to the session; the actual JSON-RPC response to a request flows
//! back asynchronously as a `message` event on the same SSE connection
//! rather than in the POST's own HTTP response body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::routing::get;
use axum::routing::post;
use dashmap::DashMap;
use mcp_schema::JsonRpcError;
use mcp_session::Session;
use mcp_transport::Transport;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::McpServerError;
use crate::transport::SseServerTransport;

/// Custom (non-reserved) JSON-RPC code for a POST against an unknown or
/// expired session id.
const SESSION_NOT_FOUND: i64 = -32010;
/// Bound on how many outbound frames a single SSE connection can buffer
/// before `Transport::send` (and whatever awaits it) suspends.
const SSE_CHANNEL_CAPACITY: usize = 64;

/// Opaque identifier minted for each accepted SSE connection.
pub type SessionId = String;

/// Builds the session object (typically a [`mcp_protocol::ServerSession`]
/// bound to the embedder's shared handlers) that will own one SSE
/// connection's transport. Called once per `GET <sseEndpoint>`; the
/// returned session has not yet had [`Session::connect`] called on it.
pub type SessionFactory = Arc<dyn Fn(Arc<dyn Transport>) -> Arc<Session> + Send + Sync>;

struct SessionEntry {
    session: Arc<Session>,
    transport: Arc<SseServerTransport>,
}

/// Multi-session HTTP+SSE server-session provider.
pub struct HttpSseProvider {
    base_url: String,
    sse_endpoint: String,
    message_endpoint: String,
    factory: OnceLock<SessionFactory>,
    sessions: DashMap<SessionId, SessionEntry>,
    closing: AtomicBool,
}

impl HttpSseProvider {
    /// Builds a provider that advertises endpoint URLs rooted at `base_url`
    /// (e.g. `"http://127.0.0.1:8080"`, no trailing slash), serving the SSE
    /// stream at `sse_endpoint` (e.g. `"/sse"`) and accepting posted
    /// messages at `message_endpoint` (e.g. `"/message"`).
    #[must_use]
    pub fn new(base_url: impl Into<String>, sse_endpoint: impl Into<String>, message_endpoint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.into(),
            sse_endpoint: sse_endpoint.into(),
            message_endpoint: message_endpoint.into(),
            factory: OnceLock::new(),
            sessions: DashMap::new(),
            closing: AtomicBool::new(false),
        })
    }

    /// Registers the session factory. MUST be called exactly once, before
    /// any client connects.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::FactoryAlreadySet`] if already called.
    pub fn set_session_factory(&self, factory: SessionFactory) -> Result<(), McpServerError> {
        self.factory.set(factory).map_err(|_| McpServerError::FactoryAlreadySet)
    }

    /// Builds the axum router exposing the SSE and message endpoints.
    #[must_use]
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(&self.sse_endpoint, get(handle_sse_connect))
            .route(&self.message_endpoint, post(handle_post_message))
            .with_state(Arc::clone(self))
    }

    /// Binds `bind_addr` and serves until the process is stopped or the
    /// listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Config`] if `bind_addr` does not parse, or
    /// [`McpServerError::Transport`] if the listener cannot be bound or the
    /// server fails while serving.
    pub async fn serve(self: Arc<Self>, bind_addr: &str) -> Result<(), McpServerError> {
        let addr: SocketAddr =
            bind_addr.parse().map_err(|err| McpServerError::Config(format!("invalid bind address: {err}")))?;
        let app = self.router();
        let listener =
            tokio::net::TcpListener::bind(addr).await.map_err(|err| McpServerError::Transport(format!("bind failed: {err}")))?;
        axum::serve(listener, app).await.map_err(|err| McpServerError::Transport(format!("server failed: {err}")))
    }

    /// Number of live sessions. Exposed for tests and operational metrics.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Broadcasts one notification to every live session, logging (without
    /// failing the caller) per-session delivery errors.
    pub async fn notify_clients(&self, method: &str, params: Option<Value>) {
        let targets: Vec<(SessionId, Arc<Session>)> =
            self.sessions.iter().map(|entry| (entry.key().clone(), Arc::clone(&entry.value().session))).collect();
        for (session_id, session) in targets {
            if let Err(err) = session.send_notification(method.to_string(), params.clone()).await {
                tracing::warn!(session_id, %err, "failed to notify session");
            }
        }
    }

    /// Stops accepting new connections and closes every live session in
    /// parallel.
    pub async fn close_gracefully(&self) {
        self.closing.store(true, Ordering::Release);
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|entry| Arc::clone(&entry.value().session)).collect();
        let handles: Vec<_> = sessions
            .into_iter()
            .map(|session| {
                tokio::spawn(async move {
                    session.close_gracefully().await;
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        self.sessions.clear();
    }
}

#[derive(Debug, Deserialize)]
struct SessionIdQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn handle_sse_connect(State(provider): State<Arc<HttpSseProvider>>) -> Response {
    if provider.closing.load(Ordering::Acquire) {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is closing").into_response();
    }
    let Some(factory) = provider.factory.get() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "no session factory configured").into_response();
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<Event>(SSE_CHANNEL_CAPACITY);
    let transport = Arc::new(SseServerTransport::new(tx));
    let session = factory(Arc::clone(&transport) as Arc<dyn Transport>);

    if let Err(err) = session.connect().await {
        tracing::warn!(%err, "failed to connect server session");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to start session").into_response();
    }
    let endpoint_url = format!("{}{}?sessionId={session_id}", provider.base_url, provider.message_endpoint);
    if let Err(err) = transport.send_endpoint_event(&endpoint_url).await {
        tracing::warn!(%err, "failed to send endpoint event");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to start session").into_response();
    }

    provider.sessions.insert(session_id, SessionEntry { session, transport });
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn handle_post_message(
    State(provider): State<Arc<HttpSseProvider>>,
    Query(query): Query<SessionIdQuery>,
    body: axum::body::Bytes,
) -> Response {
    let Some(session_id) = query.session_id else {
        return wire_error_response(
            StatusCode::BAD_REQUEST,
            JsonRpcError::new(JsonRpcError::INVALID_REQUEST, "missing sessionId query parameter"),
        );
    };
    let Some(transport) = provider.sessions.get(&session_id).map(|entry| Arc::clone(&entry.transport)) else {
        return wire_error_response(
            StatusCode::NOT_FOUND,
            JsonRpcError::with_data(SESSION_NOT_FOUND, "unknown or expired session", serde_json::json!({ "sessionId": session_id })),
        );
    };

    match transport.deliver_post_body(&body).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response(),
        Err(err) => wire_error_response(StatusCode::BAD_REQUEST, JsonRpcError::new(err.to_wire_code(), err.to_string())),
    }
}

fn wire_error_response(status: StatusCode, error: JsonRpcError) -> Response {
    (status, Json(error)).into_response()
}

#[cfg(test)]
mod tests {
    use mcp_session::NotificationHandler;
    use mcp_session::RequestHandler;
    use mcp_session::SessionOptions;

    use super::*;

    struct NullRequestHandler;
    #[async_trait::async_trait]
    impl RequestHandler for NullRequestHandler {
        async fn handle_request(&self, _request: mcp_schema::Request) -> Result<Value, JsonRpcError> {
            Ok(Value::Null)
        }
    }

    struct NullNotificationHandler;
    #[async_trait::async_trait]
    impl NotificationHandler for NullNotificationHandler {
        async fn handle_notification(&self, _method: &str, _params: Option<Value>) {}
    }

    fn stub_factory() -> SessionFactory {
        Arc::new(|transport: Arc<dyn Transport>| Session::new(transport, Arc::new(NullRequestHandler), Arc::new(NullNotificationHandler), SessionOptions::default()))
    }

    #[test]
    fn set_session_factory_rejects_second_call() {
        let provider = HttpSseProvider::new("http://127.0.0.1:8080", "/sse", "/message");
        assert!(provider.set_session_factory(stub_factory()).is_ok());
        assert!(matches!(provider.set_session_factory(stub_factory()), Err(McpServerError::FactoryAlreadySet)));
    }

    #[tokio::test]
    async fn notify_clients_on_empty_provider_is_a_no_op() {
        let provider = HttpSseProvider::new("http://127.0.0.1:8080", "/sse", "/message");
        provider.notify_clients("notifications/tools/list_changed", None).await;
        assert_eq!(provider.session_count(), 0);
    }

    #[tokio::test]
    async fn close_gracefully_on_empty_provider_is_a_no_op() {
        let provider = HttpSseProvider::new("http://127.0.0.1:8080", "/sse", "/message");
        provider.close_gracefully().await;
        assert_eq!(provider.session_count(), 0);
    }
}
