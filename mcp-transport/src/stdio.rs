// mcp-transport/src/stdio.rs
// ============================================================================
// Module: Stdio Transport
// Description: Line-delimited JSON over a child process's stdio (client
//              side) or this process's own stdio (server side).
// Purpose: Realize the line-delimited stdio wire format.
// Dependencies: tokio (process, io-util), mcp-schema
// ============================================================================

//! ## Overview
//! Each envelope is one JSON document followed by `\n`; `serde_json`'s
//! string escaping already guarantees no raw newline survives inside a
//! value, so framing here is just "read a line, decode it" / "encode it,
//! append `\n`, write it".
//!
//! On startup three cooperative tasks run: an inbound reader (blocking
//! `read_line` on the peer's stdout), an outbound writer (blocking write on
//! the peer's stdin), and an error reader (the peer's stderr, surfaced to an
//! out-of-band consumer — default: `tracing::warn!`, never parsed as
//! protocol). `close_gracefully` stops the writer, waits a short drain
//! delay, asks the child to exit, and awaits it.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use mcp_schema::Envelope;
use mcp_schema::McpError;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::traits::InboundHandler;
use crate::traits::Transport;

/// Maximum accepted line length, guarding against an unbounded peer.
const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;
/// Outbound queue depth before `send` suspends.
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;
/// Delay given to the outbound queue to drain before the child is signaled.
const GRACEFUL_DRAIN_DELAY: Duration = Duration::from_millis(200);

/// Callback invoked with each line the child writes to stderr.
pub type StderrSink = Arc<dyn Fn(String) + Send + Sync>;

/// Spawns and owns a child process, speaking line-delimited JSON over its
/// stdio. This is the client-side stdio binding.
pub struct StdioClientTransport {
    /// The spawned child, taken by `connect`'s reader/writer tasks.
    child: Mutex<Option<Child>>,
    /// Sender half handed to callers via [`Transport::send`].
    outbound_tx: mpsc::Sender<Vec<u8>>,
    /// Receiver half, taken by the writer task at `connect` time.
    outbound_rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    /// Set once `close`/`close_gracefully` has run.
    closing: AtomicBool,
    /// Maximum accepted inbound line length.
    max_line_bytes: usize,
    /// Consumer for stderr lines; defaults to `tracing::warn!`.
    stderr_sink: Option<StderrSink>,
    /// Background task handles, joined on close.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl StdioClientTransport {
    /// Spawns `command` with `args`/`envs`, wiring piped stdin/stdout/stderr.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if the child cannot be spawned.
    pub fn spawn(
        command: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<Self, McpError> {
        Self::spawn_with_stderr_sink(command, args, envs, None)
    }

    /// Like [`Self::spawn`], with an explicit stderr consumer instead of the
    /// `tracing::warn!` default.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::TransportFailure`] if the child cannot be spawned.
    pub fn spawn_with_stderr_sink(
        command: &str,
        args: &[String],
        envs: &[(String, String)],
        stderr_sink: Option<StderrSink>,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = cmd
            .spawn()
            .map_err(|err| McpError::TransportFailure(format!("spawn failed: {err}")))?;
        let (outbound_tx, outbound_rx) = mpsc::channel(DEFAULT_OUTBOUND_CAPACITY);
        Ok(Self {
            child: Mutex::new(Some(child)),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            closing: AtomicBool::new(false),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            stderr_sink,
            tasks: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Transport for StdioClientTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        let mut child_guard = self.child.lock().await;
        let child = child_guard
            .as_mut()
            .ok_or_else(|| McpError::TransportFailure("transport already connected".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::TransportFailure("child stdout unavailable".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::TransportFailure("child stdin unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McpError::TransportFailure("child stderr unavailable".to_string()))?;
        drop(child_guard);

        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| McpError::TransportFailure("transport already connected".to_string()))?;

        let max_line_bytes = self.max_line_bytes;
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.len() > max_line_bytes {
                            tracing::warn!(len = line.len(), "stdio inbound line exceeds limit, dropping");
                            continue;
                        }
                        match mcp_schema::envelope::decode(line.as_bytes()) {
                            Ok(envelope) => handler.handle_envelope(envelope).await,
                            Err(err) => tracing::warn!(%err, "dropping malformed inbound envelope"),
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(%err, "stdio inbound read failed");
                        break;
                    }
                }
            }
        });

        let mut stdin = stdin;
        let writer_task = tokio::spawn(async move {
            while let Some(mut bytes) = outbound_rx.recv().await {
                bytes.push(b'\n');
                if stdin.write_all(&bytes).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let stderr_sink = self.stderr_sink.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match &stderr_sink {
                    Some(sink) => sink(line),
                    None => tracing::warn!(target: "mcp_transport::stdio::stderr", "{line}"),
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(reader_task);
        tasks.push(writer_task);
        tasks.push(stderr_task);
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(McpError::TransportFailure("transport is closing".to_string()));
        }
        let bytes = mcp_schema::envelope::encode(&envelope)?;
        self.outbound_tx
            .send(bytes)
            .await
            .map_err(|_| McpError::TransportFailure("outbound channel closed".to_string()))
    }

    async fn close_gracefully(&self) {
        self.closing.store(true, Ordering::Release);
        tokio::time::sleep(GRACEFUL_DRAIN_DELAY).await;
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    async fn close(&self) {
        self.closing.store(true, Ordering::Release);
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }
}

/// Speaks line-delimited JSON over this process's own stdin/stdout — used
/// when this process itself is the MCP server (the symmetric counterpart
/// of [`StdioClientTransport`]).
pub struct StdioServerTransport {
    /// Sender half handed to callers via [`Transport::send`].
    outbound_tx: mpsc::Sender<Vec<u8>>,
    /// Receiver half, taken by the writer task at `connect` time.
    outbound_rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    /// Set once `close`/`close_gracefully` has run.
    closing: AtomicBool,
    /// Maximum accepted inbound line length.
    max_line_bytes: usize,
    /// Background task handles, joined on close.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl StdioServerTransport {
    /// Builds a transport bound to the process's own stdio.
    #[must_use]
    pub fn new() -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(DEFAULT_OUTBOUND_CAPACITY);
        Self {
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            closing: AtomicBool::new(false),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            tasks: Mutex::new(Vec::new()),
        }
    }
}

impl Default for StdioServerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioServerTransport {
    async fn connect(&self, handler: Arc<dyn InboundHandler>) -> Result<(), McpError> {
        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| McpError::TransportFailure("transport already connected".to_string()))?;
        let max_line_bytes = self.max_line_bytes;

        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.len() > max_line_bytes {
                            tracing::warn!(len = line.len(), "stdio inbound line exceeds limit, dropping");
                            continue;
                        }
                        match mcp_schema::envelope::decode(line.as_bytes()) {
                            Ok(envelope) => handler.handle_envelope(envelope).await,
                            Err(err) => tracing::warn!(%err, "dropping malformed inbound envelope"),
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(mut bytes) = outbound_rx.recv().await {
                bytes.push(b'\n');
                if stdout.write_all(&bytes).await.is_err() {
                    break;
                }
                if stdout.flush().await.is_err() {
                    break;
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(reader_task);
        tasks.push(writer_task);
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), McpError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(McpError::TransportFailure("transport is closing".to_string()));
        }
        let bytes = mcp_schema::envelope::encode(&envelope)?;
        self.outbound_tx
            .send(bytes)
            .await
            .map_err(|_| McpError::TransportFailure("outbound channel closed".to_string()))
    }

    async fn close_gracefully(&self) {
        self.closing.store(true, Ordering::Release);
        tokio::time::sleep(GRACEFUL_DRAIN_DELAY).await;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    async fn close(&self) {
        self.closing.store(true, Ordering::Release);
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingHandler {
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl InboundHandler for RecordingHandler {
        async fn handle_envelope(&self, envelope: Envelope) {
            if let Envelope::Notification(notif) = envelope {
                self.seen.lock().unwrap().push(notif.method);
            }
        }
    }

    #[tokio::test]
    async fn echoes_a_notification_through_cat() {
        let transport = StdioClientTransport::spawn("cat", &[], &[]).unwrap();
        let handler = Arc::new(RecordingHandler {
            seen: StdMutex::new(Vec::new()),
        });
        transport.connect(handler.clone()).await.unwrap();
        transport
            .send(Envelope::notification("notifications/initialized", None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        transport.close().await;
        assert_eq!(handler.seen.lock().unwrap().as_slice(), ["notifications/initialized"]);
    }
}
