// mcp-protocol/src/client.rs
// ============================================================================
// Module: Client Protocol Face
// Description: Handshake, typed request helpers, and reverse-call answering
//              for the client half of the method surface.
// Purpose: Let an embedder drive `initialize` once, then call the rest of
//          the server's method surface through typed helpers instead of
//          hand-building `serde_json::Value` params at every call site.
// Dependencies: async-trait, dashmap, mcp-schema, mcp-session, tokio
// ============================================================================

//! ## Overview
//! [`McpClient`] is built independently of any [`Session`] (the same
//! Arc-cycle concern solved for [`crate::server::ServerSession`]): construct
//! it, then [`McpClient::bind`] it to the session's [`Weak`] handle once
//! [`Session::new`] has returned, before [`Session::connect`] runs. It
//! implements both [`RequestHandler`] (answering the server's reverse calls,
//! `roots/list` and `sampling/createMessage`) and [`NotificationHandler`]
//! (observing `notifications/*/list_changed`, `notifications/resources/updated`,
//! and `notifications/message`), and exposes the forward call surface as
//! typed async methods gated by the server's capabilities captured at
//! `initialize`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;
use mcp_schema::ClientCapabilities;
use mcp_schema::Cursor;
use mcp_schema::JsonRpcError;
use mcp_schema::McpError;
use mcp_schema::Page;
use mcp_schema::Request;
use mcp_schema::ServerCapabilities;
use mcp_schema::methods::CallToolParams;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::CompleteParams;
use mcp_schema::methods::CompleteResult;
use mcp_schema::methods::CompletionArgument;
use mcp_schema::methods::CompletionRef;
use mcp_schema::methods::CompletionValues;
use mcp_schema::methods::CreateMessageParams;
use mcp_schema::methods::CreateMessageResult;
use mcp_schema::methods::GetPromptParams;
use mcp_schema::methods::GetPromptResult;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::InitializeParams;
use mcp_schema::methods::InitializeResult;
use mcp_schema::methods::ListParams;
use mcp_schema::methods::ListPromptsResult;
use mcp_schema::methods::ListResourceTemplatesResult;
use mcp_schema::methods::ListResourcesResult;
use mcp_schema::methods::ListRootsResult;
use mcp_schema::methods::ListToolsResult;
use mcp_schema::methods::LogLevel;
use mcp_schema::methods::LoggingMessageParams;
use mcp_schema::methods::PromptDefinition;
use mcp_schema::methods::ReadResourceParams;
use mcp_schema::methods::ReadResourceResult;
use mcp_schema::methods::ResourceDefinition;
use mcp_schema::methods::ResourceSubscriptionParams;
use mcp_schema::methods::ResourceTemplate;
use mcp_schema::methods::Root;
use mcp_schema::methods::SetLevelParams;
use mcp_schema::methods::ToolDefinition;
use mcp_session::NotificationHandler;
use mcp_session::RequestHandler;
use mcp_session::Session;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

/// Protocol versions this client supports, ordered oldest-first; the last
/// element is the highest version it supports and is what gets offered at
/// `initialize`.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-06-18"];

/// One list-changed or resource-updated event observed from the server.
#[derive(Debug, Clone)]
pub enum ChangeNotification {
    /// `notifications/tools/list_changed`.
    ToolsListChanged,
    /// `notifications/resources/list_changed`.
    ResourcesListChanged,
    /// `notifications/prompts/list_changed`.
    PromptsListChanged,
    /// `notifications/resources/updated` for the given URI.
    ResourceUpdated(String),
}

/// Answers the server's `roots/list` reverse call.
#[async_trait]
pub trait RootsProvider: Send + Sync {
    /// Produces the client's current filesystem/URI roots.
    async fn list_roots(&self) -> Vec<Root>;
}

/// Answers the server's `sampling/createMessage` reverse call.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Samples a completion for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an [`McpError`] if sampling fails.
    async fn create_message(&self, params: CreateMessageParams) -> Result<CreateMessageResult, McpError>;
}

/// Drives the client half of one MCP session: the `initialize` handshake,
/// typed forward calls, and answers to the server's reverse calls.
pub struct McpClient {
    session: OnceLock<Weak<Session>>,
    capabilities: ClientCapabilities,
    client_info: Implementation,
    roots: DashMap<String, Root>,
    roots_provider: Option<Arc<dyn RootsProvider>>,
    sampler: Option<Arc<dyn Sampler>>,
    server_info: Mutex<Option<Implementation>>,
    server_capabilities: Mutex<Option<ServerCapabilities>>,
    changes: broadcast::Sender<ChangeNotification>,
}

impl McpClient {
    /// Builds a client advertising `capabilities`/`client_info`. Call
    /// [`Self::bind`] with the session's weak handle before
    /// [`Session::connect`] runs.
    #[must_use]
    pub fn new(
        capabilities: ClientCapabilities,
        client_info: Implementation,
        roots_provider: Option<Arc<dyn RootsProvider>>,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Arc<Self> {
        let (changes, _) = broadcast::channel(64);
        Arc::new(Self {
            session: OnceLock::new(),
            capabilities,
            client_info,
            roots: DashMap::new(),
            roots_provider,
            sampler,
            server_info: Mutex::new(None),
            server_capabilities: Mutex::new(None),
            changes,
        })
    }

    /// Records which session this instance answers for. Must be called
    /// exactly once, before the session starts receiving.
    pub fn bind(&self, session: Weak<Session>) {
        let _ = self.session.set(session);
    }

    fn session(&self) -> Result<Arc<Session>, McpError> {
        self.session
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| McpError::TransportNotReady("client not bound to a session".to_string()))
    }

    /// Manually registers a root, used when no [`RootsProvider`] was
    /// supplied and roots are managed directly by the embedder. Emits
    /// `notifications/roots/list_changed` when advertised.
    pub async fn set_root(&self, root: Root) {
        self.roots.insert(root.uri.clone(), root);
        self.notify_roots_changed().await;
    }

    /// Removes a manually registered root. Emits
    /// `notifications/roots/list_changed` when advertised.
    pub async fn remove_root(&self, uri: &str) -> Option<Root> {
        let removed = self.roots.remove(uri).map(|(_, root)| root);
        self.notify_roots_changed().await;
        removed
    }

    async fn notify_roots_changed(&self) {
        if !self.capabilities.roots.as_ref().is_some_and(|r| r.list_changed) {
            return;
        }
        if let Ok(session) = self.session() {
            if let Err(err) = session.send_notification("notifications/roots/list_changed", None).await {
                tracing::warn!(%err, "failed to send roots/list_changed");
            }
        }
    }

    /// The server's identity, captured at `initialize`.
    #[must_use]
    pub fn server_info(&self) -> Option<Implementation> {
        self.server_info.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// The server's capability set, captured at `initialize`.
    #[must_use]
    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.server_capabilities.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Subscribes to list-changed and resource-updated events.
    #[must_use]
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeNotification> {
        self.changes.subscribe()
    }

    /// Performs the `initialize` handshake and sends the confirming
    /// `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::InvalidRequest`] if `initialize` was already sent
    /// on this session, [`McpError::UnsupportedProtocolVersion`] if the
    /// server's negotiated version is not one this client supports (spec
    /// §4.4.1 step 3), or whatever [`Session::send_request`] returns.
    pub async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let session = self.session()?;
        if !session.begin_initializing() {
            return Err(McpError::InvalidRequest("initialize already in progress or complete".to_string()));
        }
        #[allow(clippy::unwrap_used, reason = "SUPPORTED_PROTOCOL_VERSIONS is a non-empty constant")]
        let offered = *SUPPORTED_PROTOCOL_VERSIONS.last().unwrap();
        let params = InitializeParams {
            protocol_version: offered.to_string(),
            capabilities: self.capabilities.clone(),
            client_info: self.client_info.clone(),
        };
        let value = session
            .send_request("initialize", Some(serde_json::to_value(params).map_err(|err| McpError::Codec(err.to_string()))?))
            .await?;
        let result: InitializeResult = serde_json::from_value(value).map_err(|err| McpError::Codec(err.to_string()))?;
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(McpError::UnsupportedProtocolVersion(result.protocol_version.clone()));
        }
        *self.server_info.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(result.server_info.clone());
        *self.server_capabilities.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(result.capabilities.clone());
        session.send_notification("notifications/initialized", None).await?;
        session.mark_initialized();
        Ok(result)
    }

    /// Sends a liveness `ping`; the server answers with an empty result.
    ///
    /// # Errors
    ///
    /// Whatever [`Session::send_request`] returns.
    pub async fn ping(&self) -> Result<(), McpError> {
        self.session()?.send_request("ping", None).await?;
        Ok(())
    }

    fn require_capability(&self, name: &str, predicate: impl Fn(&ServerCapabilities) -> bool) -> Result<(), McpError> {
        match self.server_capabilities() {
            Some(capabilities) if predicate(&capabilities) => Ok(()),
            Some(_) => Err(McpError::CapabilityMissing(format!("server did not advertise {name}"))),
            None => Err(McpError::NotInitialized(format!("calling {name}"))),
        }
    }

    async fn call<P, R>(&self, method: &str, params: Option<P>) -> Result<R, McpError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let session = self.session()?;
        let value = match params {
            Some(p) => Some(serde_json::to_value(p).map_err(|err| McpError::Codec(err.to_string()))?),
            None => None,
        };
        let result = session.send_request(method, value).await?;
        serde_json::from_value(result).map_err(|err| McpError::Codec(err.to_string()))
    }

    /// Lists one page of tools.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the server did not
    /// advertise `tools`, or whatever [`Session::send_request`] returns.
    pub async fn list_tools(&self, cursor: Option<Cursor>) -> Result<ListToolsResult, McpError> {
        self.require_capability("tools", |c| c.tools.is_some())?;
        self.call("tools/list", Some(ListParams { cursor })).await
    }

    /// Lists every tool, following `next_cursor` until exhausted.
    ///
    /// # Errors
    ///
    /// See [`Self::list_tools`].
    pub async fn list_all_tools(&self) -> Result<Vec<ToolDefinition>, McpError> {
        paginate_all(|cursor| self.list_tools(cursor)).await
    }

    /// Calls a registered tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the server did not
    /// advertise `tools`, or whatever [`Session::send_request`] returns.
    pub async fn call_tool(&self, name: impl Into<String>, arguments: Value) -> Result<CallToolResult, McpError> {
        self.require_capability("tools", |c| c.tools.is_some())?;
        self.call("tools/call", Some(CallToolParams { name: name.into(), arguments })).await
    }

    /// Lists one page of resources.
    ///
    /// # Errors
    ///
    /// See [`Self::list_tools`] (same gating pattern, `resources` family).
    pub async fn list_resources(&self, cursor: Option<Cursor>) -> Result<ListResourcesResult, McpError> {
        self.require_capability("resources", |c| c.resources.is_some())?;
        self.call("resources/list", Some(ListParams { cursor })).await
    }

    /// Lists every resource, following `next_cursor` until exhausted.
    ///
    /// # Errors
    ///
    /// See [`Self::list_resources`].
    pub async fn list_all_resources(&self) -> Result<Vec<ResourceDefinition>, McpError> {
        paginate_all(|cursor| self.list_resources(cursor)).await
    }

    /// Lists one page of discovery-only resource templates.
    ///
    /// # Errors
    ///
    /// See [`Self::list_resources`].
    pub async fn list_resource_templates(&self, cursor: Option<Cursor>) -> Result<ListResourceTemplatesResult, McpError> {
        self.require_capability("resources", |c| c.resources.is_some())?;
        self.call("resources/templates/list", Some(ListParams { cursor })).await
    }

    /// Lists every resource template, following `next_cursor` until exhausted.
    ///
    /// # Errors
    ///
    /// See [`Self::list_resource_templates`].
    pub async fn list_all_resource_templates(&self) -> Result<Vec<ResourceTemplate>, McpError> {
        paginate_all(|cursor| self.list_resource_templates(cursor)).await
    }

    /// Reads one resource.
    ///
    /// # Errors
    ///
    /// See [`Self::list_resources`].
    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<ReadResourceResult, McpError> {
        self.require_capability("resources", |c| c.resources.is_some())?;
        self.call("resources/read", Some(ReadResourceParams { uri: uri.into() })).await
    }

    /// Subscribes to change notifications for one resource.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the server does not
    /// support `resources.subscribe`, or whatever [`Session::send_request`]
    /// returns.
    pub async fn subscribe_resource(&self, uri: impl Into<String>) -> Result<(), McpError> {
        self.require_capability("resources.subscribe", |c| c.resources.as_ref().is_some_and(|r| r.subscribe))?;
        self.call("resources/subscribe", Some(ResourceSubscriptionParams { uri: uri.into() })).await
    }

    /// Unsubscribes from change notifications for one resource.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe_resource`].
    pub async fn unsubscribe_resource(&self, uri: impl Into<String>) -> Result<(), McpError> {
        self.require_capability("resources.subscribe", |c| c.resources.as_ref().is_some_and(|r| r.subscribe))?;
        self.call("resources/unsubscribe", Some(ResourceSubscriptionParams { uri: uri.into() })).await
    }

    /// Lists one page of prompts.
    ///
    /// # Errors
    ///
    /// See [`Self::list_tools`] (same gating pattern, `prompts` family).
    pub async fn list_prompts(&self, cursor: Option<Cursor>) -> Result<ListPromptsResult, McpError> {
        self.require_capability("prompts", |c| c.prompts.is_some())?;
        self.call("prompts/list", Some(ListParams { cursor })).await
    }

    /// Lists every prompt, following `next_cursor` until exhausted.
    ///
    /// # Errors
    ///
    /// See [`Self::list_prompts`].
    pub async fn list_all_prompts(&self) -> Result<Vec<PromptDefinition>, McpError> {
        paginate_all(|cursor| self.list_prompts(cursor)).await
    }

    /// Renders a registered prompt.
    ///
    /// # Errors
    ///
    /// See [`Self::list_prompts`].
    pub async fn get_prompt(&self, name: impl Into<String>, arguments: Option<Value>) -> Result<GetPromptResult, McpError> {
        self.require_capability("prompts", |c| c.prompts.is_some())?;
        self.call("prompts/get", Some(GetPromptParams { name: name.into(), arguments })).await
    }

    /// Requests completion candidates for one prompt or resource argument.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the server did not
    /// advertise `completions`, or whatever [`Session::send_request`]
    /// returns.
    pub async fn complete(&self, reference: CompletionRef, argument: CompletionArgument) -> Result<CompletionValues, McpError> {
        self.require_capability("completions", |c| c.completions.is_some())?;
        let result: CompleteResult = self.call("completion/complete", Some(CompleteParams { reference, argument })).await?;
        Ok(result.completion)
    }

    /// Sets the minimum severity of `notifications/message` the server
    /// should emit to this session.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::CapabilityMissing`] if the server did not
    /// advertise `logging`, or whatever [`Session::send_request`] returns.
    pub async fn set_log_level(&self, level: LogLevel) -> Result<(), McpError> {
        self.require_capability("logging", |c| c.logging.is_some())?;
        self.call("logging/setLevel", Some(SetLevelParams { level })).await
    }

    async fn handle_list_roots(&self) -> Result<Value, JsonRpcError> {
        if self.capabilities.roots.is_none() {
            return Err(JsonRpcError::method_not_found_with_reason(
                "Roots not supported",
                "Client does not have roots capability",
            ));
        }
        let roots = match &self.roots_provider {
            Some(provider) => provider.list_roots().await,
            None => self.roots.iter().map(|entry| entry.value().clone()).collect(),
        };
        let result: ListRootsResult = Page::last(roots);
        serde_json::to_value(result).map_err(|err| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, err.to_string()))
    }

    async fn handle_create_message(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if self.capabilities.sampling.is_none() {
            return Err(JsonRpcError::method_not_found_with_reason(
                "Sampling not supported",
                "Client does not have sampling capability",
            ));
        }
        let Some(sampler) = &self.sampler else {
            return Err(JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "no sampler configured"));
        };
        let Some(raw) = params else {
            return Err(JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "missing params"));
        };
        let params: CreateMessageParams = mcp_schema::envelope::unmarshal(&raw)
            .map_err(|err| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, err.to_string()))?;
        let result = sampler.create_message(params).await.map_err(|err| match err {
            McpError::Remote(wire) => wire,
            other => JsonRpcError::new(other.to_wire_code(), other.to_string()),
        })?;
        serde_json::to_value(result).map_err(|err| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, err.to_string()))
    }
}

#[async_trait]
impl RequestHandler for McpClient {
    async fn handle_request(&self, request: Request) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "roots/list" => self.handle_list_roots().await,
            "sampling/createMessage" => self.handle_create_message(request.params).await,
            other => Err(JsonRpcError::method_not_found_with_reason(
                format!("unsupported method: {other}"),
                "client does not implement this method",
            )),
        }
    }
}

#[async_trait]
impl NotificationHandler for McpClient {
    async fn handle_notification(&self, method: &str, params: Option<Value>) {
        match method {
            "notifications/tools/list_changed" => {
                let _ = self.changes.send(ChangeNotification::ToolsListChanged);
            }
            "notifications/resources/list_changed" => {
                let _ = self.changes.send(ChangeNotification::ResourcesListChanged);
            }
            "notifications/prompts/list_changed" => {
                let _ = self.changes.send(ChangeNotification::PromptsListChanged);
            }
            "notifications/resources/updated" => {
                if let Some(value) = params {
                    if let Ok(params) = mcp_schema::envelope::unmarshal::<ResourceSubscriptionParams>(&value) {
                        let _ = self.changes.send(ChangeNotification::ResourceUpdated(params.uri));
                    }
                }
            }
            "notifications/message" => {
                if let Some(value) = params {
                    if let Ok(message) = mcp_schema::envelope::unmarshal::<LoggingMessageParams>(&value) {
                        tracing::debug!(level = ?message.level, logger = ?message.logger, "server log message");
                    }
                }
            }
            other => tracing::debug!(method = other, "unhandled inbound notification"),
        }
    }
}

async fn paginate_all<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, McpError>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T>, McpError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    loop {
        let page = fetch_page(cursor).await?;
        items.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(items)
}
