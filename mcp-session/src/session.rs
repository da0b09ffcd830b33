// mcp-session/src/session.rs
// ============================================================================
// Module: Session
// Description: The request/response/notification multiplexer over one
//              transport.
// Purpose: Correlate outbound requests to inbound responses, hand inbound
//          requests/notifications to registered handlers, and enforce the
//          session state machine.
// Dependencies: mcp-schema, mcp-transport, dashmap, tokio
// ============================================================================

//! ## Overview
//! A [`Session`] owns exactly one [`Transport`] for its lifetime. Outbound
//! calls go through [`Session::send_request`] (correlated, bounded by a
//! timeout) or [`Session::send_notification`] (fire-and-forget). Inbound
//! envelopes arrive via the transport's [`InboundHandler`] callback, which
//! the session implements internally and fans out to the caller-supplied
//! [`RequestHandler`]/[`NotificationHandler`].
//!
//! A handler MUST NOT block the inbound dispatch loop: request
//! and notification handling is spawned onto its own task so a slow tool
//! call does not stall delivery of the next inbound envelope (including the
//! response a concurrent `send_request` is waiting on).

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use mcp_schema::Envelope;
use mcp_schema::JsonRpcError;
use mcp_schema::McpError;
use mcp_schema::RequestId;
use mcp_schema::Response;
use mcp_transport::InboundHandler;
use mcp_transport::Transport;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::dispatch::NotificationHandler;
use crate::dispatch::RequestHandler;
use crate::ids::SessionIdGenerator;
use crate::state::SessionState;
use crate::state::StateCell;

/// Default bound on how long [`Session::send_request`] waits for a matching
/// response before failing with [`McpError::Timeout`].
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Tuning knobs for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Prefix used by the session's id generator; defaults to a random
    /// six-character token when not set.
    pub id_prefix: Option<String>,
    /// Default per-request timeout, overridable per call via
    /// [`Session::send_request_with_timeout`].
    pub default_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            id_prefix: None,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// One bidirectional JSON-RPC session over a single transport.
pub struct Session {
    transport: Arc<dyn Transport>,
    request_handler: Arc<dyn RequestHandler>,
    notification_handler: Arc<dyn NotificationHandler>,
    ids: SessionIdGenerator,
    pending: DashMap<RequestId, oneshot::Sender<Response>>,
    state: StateCell,
    default_timeout: Duration,
    closed: AtomicBool,
}

impl Session {
    /// Builds a session over `transport`. The session does not start
    /// receiving until [`Session::connect`] is called.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        request_handler: Arc<dyn RequestHandler>,
        notification_handler: Arc<dyn NotificationHandler>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let ids = match options.id_prefix {
            Some(prefix) => SessionIdGenerator::with_prefix(prefix),
            None => SessionIdGenerator::new(),
        };
        Arc::new(Self {
            transport,
            request_handler,
            notification_handler,
            ids,
            pending: DashMap::new(),
            state: StateCell::new(),
            default_timeout: options.default_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Starts inbound delivery on the underlying transport.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Transport::connect`] returns.
    pub async fn connect(self: &Arc<Self>) -> Result<(), McpError> {
        let dispatcher: Arc<dyn InboundHandler> = Arc::new(SessionDispatcher {
            session: Arc::downgrade(self),
        });
        self.transport.connect(dispatcher).await
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Attempts the `Uninitialized -> Initializing` transition. Returns
    /// `false` if another call already performed it (a concurrent
    /// `initialize`, which the protocol layer must reject per SPEC_FULL.md
    /// §4.3's Open Question resolution).
    #[must_use]
    pub fn begin_initializing(&self) -> bool {
        self.state.begin_initializing()
    }

    /// Marks the session fully initialized once the handshake's
    /// confirmation notification has landed.
    pub fn mark_initialized(&self) {
        self.state.set(SessionState::Initialized);
    }

    /// Sends a request and suspends for [`SessionOptions::default_timeout`]
    /// awaiting the matching response.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Timeout`] if no response arrives in time,
    /// [`McpError::Remote`] if the peer answered with an error body, or
    /// whatever [`Transport::send`] returns on transport failure.
    pub async fn send_request(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value, McpError> {
        self.send_request_with_timeout(method, params, self.default_timeout).await
    }

    /// As [`Session::send_request`], with an explicit timeout.
    ///
    /// # Errors
    ///
    /// See [`Session::send_request`].
    pub async fn send_request_with_timeout(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(McpError::Cancelled("session is closed".to_string()));
        }
        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let envelope = Envelope::request(id.clone(), method, params);
        if let Err(err) = self.transport.send(envelope).await {
            self.pending.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => match response.error {
                Some(error) => Err(McpError::Remote(error)),
                None => Ok(response.result.unwrap_or(Value::Null)),
            },
            Ok(Err(_)) => Err(McpError::Cancelled(format!("session closed while awaiting {id}"))),
            Err(_) => {
                self.pending.remove(&id);
                Err(McpError::Timeout(format!("no response for request {id}")))
            }
        }
    }

    /// Sends a fire-and-forget notification.
    ///
    /// # Errors
    ///
    /// Whatever [`Transport::send`] returns.
    pub async fn send_notification(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), McpError> {
        self.transport.send(Envelope::notification(method, params)).await
    }

    /// Stops accepting new sends, cancels pending waiters, and drains the
    /// transport best-effort.
    pub async fn close_gracefully(&self) {
        self.closed.store(true, Ordering::Release);
        self.cancel_pending();
        self.transport.close_gracefully().await;
    }

    /// Immediately cancels pending waiters and releases the transport.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.cancel_pending();
        self.transport.close().await;
    }

    fn cancel_pending(&self) {
        self.pending.clear();
    }

    async fn deliver(&self, envelope: Envelope) {
        match envelope {
            Envelope::Response(response) => {
                if let Some((_, tx)) = self.pending.remove(&response.id) {
                    let _ = tx.send(response);
                } else {
                    tracing::warn!(id = %response.id, "response for unknown or already-resolved request");
                }
            }
            Envelope::Request(request) => {
                let handler = Arc::clone(&self.request_handler);
                let transport = Arc::clone(&self.transport);
                tokio::spawn(async move {
                    let id = request.id.clone();
                    let reply = match handler.handle_request(request).await {
                        Ok(result) => Response::success(id, result),
                        Err(error) => Response::failure(id, error),
                    };
                    if let Err(err) = transport.send(Envelope::Response(reply)).await {
                        tracing::warn!(%err, "failed to deliver response");
                    }
                });
            }
            Envelope::Notification(notification) => {
                let handler = Arc::clone(&self.notification_handler);
                tokio::spawn(async move {
                    handler.handle_notification(&notification.method, notification.params).await;
                });
            }
        }
    }
}

/// Bridges transport-level inbound delivery to [`Session::deliver`] without
/// holding a strong reference back to the session (the session owns the
/// transport, so a strong cycle would leak both).
struct SessionDispatcher {
    session: Weak<Session>,
}

#[async_trait::async_trait]
impl InboundHandler for SessionDispatcher {
    async fn handle_envelope(&self, envelope: Envelope) {
        if let Some(session) = self.session.upgrade() {
            session.deliver(envelope).await;
        }
    }
}
