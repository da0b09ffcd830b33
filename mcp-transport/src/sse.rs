// mcp-transport/src/sse.rs
// ============================================================================
// Module: HTTP+SSE Client Transport
// Description: Client half of the HTTP+SSE pairing.
// Purpose: Discover the message-posting URL from the `endpoint` SSE event,
//          then post outgoing envelopes to it while consuming `message`
//          events on the original SSE channel.
// Dependencies: reqwest, reqwest-eventsource, mcp-schema
// ============================================================================

//! ## Overview
//! The client opens `GET <base>/<sseEndpoint>`, waits for the special
//! `endpoint` event whose `data` is the message-posting URL (carrying an
//! opaque session id as a query parameter), and thereafter POSTs outgoing
//! messages to that URL. Inbound messages arrive as `message` SSE frames on
//! the same connection. `send` blocks until the endpoint event has arrived,
//! bounded by a configurable wait (default 10 s); on expiry it fails with
//! [`McpError::TransportNotReady`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use mcp_schema::Envelope;
use mcp_schema::McpError;
use reqwest_eventsource::Event;
use reqwest_eventsource::EventSource;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::traits::InboundHandler;
use crate::traits::Transport;

/// Default bound on how long `send` waits for endpoint discovery.
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// Accepted HTTP statuses for a POST response.
const ACCEPTED_POST_STATUSES: [u16; 4] = [200, 201, 202, 206];

/// Client-side HTTP+SSE transport.
pub struct SseClientTransport {
    /// Base URL the SSE and message endpoints are resolved against.
    base_url: Url,
    /// Path (relative to `base_url`) of the SSE endpoint, default `/sse`.
    sse_endpoint: String,
    /// Shared HTTP client used both for the SSE connection and POSTs.
    http: reqwest::Client,
    /// Resolved message-posting URL, set once the `endpoint` event arrives.
    post_url: watch::Sender<Option<Url>>,
    /// Receiver side kept alive so `watch::Sender::subscribe` always works.
    post_url_rx: watch::Receiver<Option<Url>>,
    /// How long `send` waits for endpoint discovery before failing.
    ready_timeout: Duration,
    /// Set once `close`/`close_gracefully` has run.
    closing: AtomicBool,
    /// Background task handle, joined on close.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SseClientTransport {
    /// Builds a transport rooted at `base_url`, with the default
    /// `/sse` SSE endpoint path and a 10 s endpoint-discovery timeout.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, McpError> {
        Self::with_options(base_url, "/sse", DEFAULT_READY_TIMEOUT)
    }

    /// Builds a transport with an explicit SSE endpoint path and
    /// endpoint-discovery timeout.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if `base_url` does not parse.
    pub fn with_options(
        base_url: &str,
        sse_endpoint: &str,
        ready_timeout: Duration,
    ) -> Result<Self, McpError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| McpError::TransportFailure(format!("invalid base url: {err}")))?;
        let (post_url, post_url_rx) = watch::channel(None);
        Ok(Self {
            base_url,
            sse_endpoint: sse_endpoint.to_string(),
            http: reqwest::Client::new(),
            post_url,
            post_url_rx,
            ready_timeout,
            closing: AtomicBool::new(false),
            task: Mutex::new(None),
        })
    }

    /// Waits (bounded) for the message-posting URL to be discovered.
    async fn wait_for_ready(&self) -> Result<Url, McpError> {
        if let Some(url) = self.post_url_rx.borrow().clone() {
            return Ok(url);
        }
        let mut rx = self.post_url_rx.clone();
        let wait = async {
            loop {
                if rx.changed().await.is_err() {
                    return None;
                }
                if let Some(url) = rx.borrow().clone() {
                    return Some(url);
                }
            }
        };
        match tokio::time::timeout(self.ready_timeout, wait).await {
            Ok(Some(url)) => Ok(url),
            Ok(None) | Err(_) => {
                Err(McpError::TransportNotReady("endpoint event not received".to_string()))
            }
        }
    }
}

#[async_trait]
impl Transport for SseClientTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        let sse_url = self
            .base_url
            .join(self.sse_endpoint.trim_start_matches('/'))
            .map_err(|err| McpError::TransportFailure(format!("invalid sse endpoint: {err}")))?;
        let base_url = self.base_url.clone();
        let post_url_tx = self.post_url.clone();

        let request = self.http.get(sse_url);
        let mut source = EventSource::new(request)
            .map_err(|err| McpError::TransportFailure(format!("sse connect failed: {err}")))?;

        let task = tokio::spawn(async move {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(message)) => match message.event.as_str() {
                        "endpoint" => match base_url.join(message.data.trim_start_matches('/')) {
                            Ok(url) => {
                                let _ = post_url_tx.send(Some(url));
                            }
                            Err(err) => tracing::warn!(%err, "invalid endpoint event data"),
                        },
                        "message" => match mcp_schema::envelope::decode(message.data.as_bytes()) {
                            Ok(envelope) => handler.handle_envelope(envelope).await,
                            Err(err) => tracing::warn!(%err, "dropping malformed sse message"),
                        },
                        other => tracing::warn!(event = other, "ignoring unknown sse event type"),
                    },
                    Err(err) => {
                        tracing::warn!(%err, "sse connection failed");
                        source.close();
                        break;
                    }
                }
            }
        });
        *self.task.lock().await = Some(task);
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(McpError::TransportFailure("transport is closing".to_string()));
        }
        let post_url = self.wait_for_ready().await?;
        let bytes = mcp_schema::envelope::encode(&envelope)?;
        let response = self
            .http
            .post(post_url)
            .header("content-type", "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(|err| McpError::TransportFailure(format!("sse post failed: {err}")))?;
        let status = response.status().as_u16();
        if ACCEPTED_POST_STATUSES.contains(&status) {
            Ok(())
        } else {
            Err(McpError::TransportFailure(format!("sse post rejected with status {status}")))
        }
    }

    async fn close_gracefully(&self) {
        self.closing.store(true, Ordering::Release);
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }

    async fn close(&self) {
        self.closing.store(true, Ordering::Release);
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }
}
