// mcp-protocol/src/server.rs
// ============================================================================
// Module: Server Protocol Face
// Description: Handler registries, capability-aware dispatch, and the
//              per-session request/notification routing.
// Purpose: Answer the server half of the method surface generically: four
//          symmetric registry families (tools, resources, prompts,
//          completions) behind one capability-aware dispatcher.
// Dependencies: async-trait, mcp-schema, mcp-session, tokio
// ============================================================================

//! ## Overview
//! [`ServerHandlers`] is built once (via [`ServerHandlersBuilder`]) and
//! shared across every session a provider accepts; it owns the tool,
//! resource, prompt, and completion registries plus the `*_list_changed`
//! broadcast signals a server-session-provider (mcp-server) forwards to connected
//! clients. [`ServerSession`] is instantiated once per connection: it binds
//! to a [`Session`], captures the client's capabilities/identity at
//! `initialize`, and implements [`RequestHandler`]/[`NotificationHandler`]
//! to answer the rest of the method surface through the shared registries.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::RwLock;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use mcp_schema::ClientCapabilities;
use mcp_schema::Cursor;
use mcp_schema::JsonRpcError;
use mcp_schema::McpError;
use mcp_schema::Page;
use mcp_schema::Request;
use mcp_schema::ServerCapabilities;
use mcp_schema::capabilities::CompletionsCapability;
use mcp_schema::capabilities::LoggingCapability;
use mcp_schema::capabilities::PromptsCapability;
use mcp_schema::capabilities::ResourcesCapability;
use mcp_schema::capabilities::ToolsCapability;
use mcp_schema::methods::CallToolParams;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::CompleteParams;
use mcp_schema::methods::CompletionRef;
use mcp_schema::methods::CompletionValues;
use mcp_schema::methods::GetPromptParams;
use mcp_schema::methods::Implementation;
use mcp_schema::methods::InitializeParams;
use mcp_schema::methods::InitializeResult;
use mcp_schema::methods::ListParams;
use mcp_schema::methods::ListPromptsResult;
use mcp_schema::methods::ListResourceTemplatesResult;
use mcp_schema::methods::ListResourcesResult;
use mcp_schema::methods::ListToolsResult;
use mcp_schema::methods::LogLevel;
use mcp_schema::methods::PromptDefinition;
use mcp_schema::methods::ReadResourceParams;
use mcp_schema::methods::ReadResourceResult;
use mcp_schema::methods::ResourceDefinition;
use mcp_schema::methods::ResourceSubscriptionParams;
use mcp_schema::methods::ResourceTemplate;
use mcp_schema::methods::SetLevelParams;
use mcp_schema::methods::ToolDefinition;
use mcp_session::NotificationHandler;
use mcp_session::RequestHandler;
use mcp_session::Session;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::exchange::Exchange;
use crate::handlers::CompletionHandler;
use crate::handlers::PromptHandler;
use crate::handlers::ResourceHandler;
use crate::handlers::ToolHandler;
use crate::metrics::McpMetrics;
use crate::metrics::McpMetricEvent;
use crate::metrics::McpMethod;
use crate::metrics::McpOutcome;
use crate::metrics::NoopMetrics;
use crate::registry::Registry;

/// Default page size for list methods when the caller supplies no cursor.
const DEFAULT_PAGE_SIZE: usize = 50;

// ============================================================================
// SECTION: Registry Entries
// ============================================================================

#[derive(Clone)]
struct ToolEntry {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Clone)]
struct ResourceEntry {
    definition: ResourceDefinition,
    handler: Arc<dyn ResourceHandler>,
}

#[derive(Clone)]
struct PromptEntry {
    definition: PromptDefinition,
    handler: Arc<dyn PromptHandler>,
}

#[derive(Clone)]
struct CompletionEntry {
    handler: Arc<dyn CompletionHandler>,
}

// ============================================================================
// SECTION: List-Changed Signaling
// ============================================================================

/// Broadcast signals a server-session-provider (mcp-server) subscribes to so it can
/// forward `notifications/*/list_changed` to every connected client.
pub struct ListChangedSignals {
    tools: broadcast::Sender<()>,
    resources: broadcast::Sender<()>,
    prompts: broadcast::Sender<()>,
}

impl ListChangedSignals {
    fn new() -> Self {
        let (tools, _) = broadcast::channel(16);
        let (resources, _) = broadcast::channel(16);
        let (prompts, _) = broadcast::channel(16);
        Self { tools, resources, prompts }
    }

    /// Subscribes to `notifications/tools/list_changed` triggers.
    #[must_use]
    pub fn subscribe_tools(&self) -> broadcast::Receiver<()> {
        self.tools.subscribe()
    }

    /// Subscribes to `notifications/resources/list_changed` triggers.
    #[must_use]
    pub fn subscribe_resources(&self) -> broadcast::Receiver<()> {
        self.resources.subscribe()
    }

    /// Subscribes to `notifications/prompts/list_changed` triggers.
    #[must_use]
    pub fn subscribe_prompts(&self) -> broadcast::Receiver<()> {
        self.prompts.subscribe()
    }

    fn fire_tools(&self) {
        let _ = self.tools.send(());
    }

    fn fire_resources(&self) {
        let _ = self.resources.send(());
    }

    fn fire_prompts(&self) {
        let _ = self.prompts.send(());
    }
}

// ============================================================================
// SECTION: Server Handlers (shared across sessions)
// ============================================================================

/// The handler registries and identity shared by every session a provider
/// accepts. Build with [`ServerHandlersBuilder`].
pub struct ServerHandlers {
    implementation: Implementation,
    instructions: Option<String>,
    tools: Registry<String, ToolEntry>,
    resources: Registry<String, ResourceEntry>,
    resource_templates: RwLock<Vec<ResourceTemplate>>,
    prompts: Registry<String, PromptEntry>,
    completions: Registry<String, CompletionEntry>,
    tools_enabled: AtomicBool,
    resources_enabled: AtomicBool,
    prompts_enabled: AtomicBool,
    completions_enabled: AtomicBool,
    logging_enabled: bool,
    resources_subscribe_enabled: bool,
    metrics: Arc<dyn McpMetrics>,
    /// Public so a server-session-provider (mcp-server) can subscribe directly.
    pub list_changed: ListChangedSignals,
}

impl ServerHandlers {
    /// Registers a tool, enabling the `tools` capability family.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::AlreadyExists`] if the name is already registered.
    pub fn add_tool(&self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Result<(), McpError> {
        let name = definition.name.clone();
        self.tools.add(name, ToolEntry { definition, handler })?;
        self.tools_enabled.store(true, Ordering::Relaxed);
        self.list_changed.fire_tools();
        Ok(())
    }

    /// Unregisters a tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotFound`] if no tool is registered under `name`.
    pub fn remove_tool(&self, name: &str) -> Result<(), McpError> {
        self.tools.remove(&name.to_string())?;
        self.list_changed.fire_tools();
        Ok(())
    }

    /// Registers a resource, enabling the `resources` capability family.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::AlreadyExists`] if the URI is already registered.
    pub fn add_resource(&self, definition: ResourceDefinition, handler: Arc<dyn ResourceHandler>) -> Result<(), McpError> {
        let uri = definition.uri.clone();
        self.resources.add(uri, ResourceEntry { definition, handler })?;
        self.resources_enabled.store(true, Ordering::Relaxed);
        self.list_changed.fire_resources();
        Ok(())
    }

    /// Unregisters a resource.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotFound`] if no resource is registered under `uri`.
    pub fn remove_resource(&self, uri: &str) -> Result<(), McpError> {
        self.resources.remove(&uri.to_string())?;
        self.list_changed.fire_resources();
        Ok(())
    }

    /// Adds a discovery-only resource template (no handler attached).
    pub fn add_resource_template(&self, template: ResourceTemplate) {
        self.resource_templates
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(template);
        self.resources_enabled.store(true, Ordering::Relaxed);
        self.list_changed.fire_resources();
    }

    /// Registers a prompt, enabling the `prompts` capability family.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::AlreadyExists`] if the name is already registered.
    pub fn add_prompt(&self, definition: PromptDefinition, handler: Arc<dyn PromptHandler>) -> Result<(), McpError> {
        let name = definition.name.clone();
        self.prompts.add(name, PromptEntry { definition, handler })?;
        self.prompts_enabled.store(true, Ordering::Relaxed);
        self.list_changed.fire_prompts();
        Ok(())
    }

    /// Unregisters a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotFound`] if no prompt is registered under `name`.
    pub fn remove_prompt(&self, name: &str) -> Result<(), McpError> {
        self.prompts.remove(&name.to_string())?;
        self.list_changed.fire_prompts();
        Ok(())
    }

    /// Registers a completion provider for one prompt or resource reference.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::AlreadyExists`] if a handler is already registered
    /// for this reference.
    pub fn add_completion(&self, reference: &CompletionRef, handler: Arc<dyn CompletionHandler>) -> Result<(), McpError> {
        self.completions.add(completion_key(reference), CompletionEntry { handler })?;
        self.completions_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Unregisters a completion provider.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotFound`] if no handler is registered for this
    /// reference.
    pub fn remove_completion(&self, reference: &CompletionRef) -> Result<(), McpError> {
        self.completions.remove(&completion_key(reference))?;
        Ok(())
    }

    /// The capability set this instance currently advertises. Families are
    /// "sticky": once a handler of a family has ever been registered, the
    /// capability stays advertised even if the registry later empties —
    /// capabilities are declared once, not recomputed per request.
    #[must_use]
    pub fn server_capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: self.tools_enabled.load(Ordering::Relaxed).then_some(ToolsCapability { list_changed: true }),
            resources: self.resources_enabled.load(Ordering::Relaxed).then_some(ResourcesCapability {
                subscribe: self.resources_subscribe_enabled,
                list_changed: true,
            }),
            prompts: self.prompts_enabled.load(Ordering::Relaxed).then_some(PromptsCapability { list_changed: true }),
            logging: self.logging_enabled.then_some(LoggingCapability {}),
            completions: self.completions_enabled.load(Ordering::Relaxed).then_some(CompletionsCapability {}),
            experimental: None,
        }
    }
}

/// Builds a [`ServerHandlers`].
pub struct ServerHandlersBuilder {
    implementation: Implementation,
    instructions: Option<String>,
    logging_enabled: bool,
    resources_subscribe_enabled: bool,
    metrics: Arc<dyn McpMetrics>,
}

impl ServerHandlersBuilder {
    /// Starts a builder with the server's advertised identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            implementation: Implementation { name: name.into(), version: version.into() },
            instructions: None,
            logging_enabled: false,
            resources_subscribe_enabled: false,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Sets the free-form usage instructions returned at `initialize`.
    #[must_use]
    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = Some(text.into());
        self
    }

    /// Enables `logging/setLevel` and `notifications/message`.
    #[must_use]
    pub fn enable_logging(mut self) -> Self {
        self.logging_enabled = true;
        self
    }

    /// Enables `resources/subscribe` and `resources/unsubscribe`.
    #[must_use]
    pub fn enable_resource_subscribe(mut self) -> Self {
        self.resources_subscribe_enabled = true;
        self
    }

    /// Wires a metrics sink; defaults to [`NoopMetrics`].
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Finalizes the builder.
    #[must_use]
    pub fn build(self) -> Arc<ServerHandlers> {
        Arc::new(ServerHandlers {
            implementation: self.implementation,
            instructions: self.instructions,
            tools: Registry::new(),
            resources: Registry::new(),
            resource_templates: RwLock::new(Vec::new()),
            prompts: Registry::new(),
            completions: Registry::new(),
            tools_enabled: AtomicBool::new(false),
            resources_enabled: AtomicBool::new(false),
            prompts_enabled: AtomicBool::new(false),
            completions_enabled: AtomicBool::new(false),
            logging_enabled: self.logging_enabled,
            resources_subscribe_enabled: self.resources_subscribe_enabled,
            metrics: self.metrics,
            list_changed: ListChangedSignals::new(),
        })
    }
}

// ============================================================================
// SECTION: Server Session (one per connection)
// ============================================================================

/// Supported protocol versions, newest first. The first entry is offered
/// back to a client whose requested version is not in this list.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2024-11-05"];

/// Default bound on how long a request received while the session is still
/// `Initializing` waits for `notifications/initialized` before failing with
/// `<NotInitialized>`.
const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_secs(20);
/// Polling interval used while waiting out [`DEFAULT_INITIALIZATION_TIMEOUT`].
const INITIALIZATION_POLL_INTERVAL: Duration = Duration::from_millis(10);

fn negotiate_protocol_version(requested: &str) -> String {
    if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
        requested.to_string()
    } else {
        SUPPORTED_PROTOCOL_VERSIONS[0].to_string()
    }
}

/// One connection's worth of server-side protocol state: which client
/// capabilities/identity it saw at `initialize`, its current minimum log
/// level, and its resource subscriptions.
pub struct ServerSession {
    handlers: Arc<ServerHandlers>,
    session: OnceLock<Weak<Session>>,
    client_capabilities: Mutex<Option<ClientCapabilities>>,
    client_info: Mutex<Option<Implementation>>,
    min_log_level: Arc<AtomicU8>,
    subscriptions: Arc<Mutex<HashSet<String>>>,
    initialization_timeout: Duration,
}

impl ServerSession {
    /// Builds a session bound to the shared `handlers`, with the default
    /// 20 s initialization timeout. Call [`Self::bind`] with the [`Session`]
    /// this will be registered against before [`Session::connect`] runs.
    #[must_use]
    pub fn new(handlers: Arc<ServerHandlers>) -> Arc<Self> {
        Self::with_initialization_timeout(handlers, DEFAULT_INITIALIZATION_TIMEOUT)
    }

    /// As [`Self::new`], with an explicit bound on how long a request
    /// arriving mid-handshake waits for `notifications/initialized` before
    /// failing with `<NotInitialized>`.
    #[must_use]
    pub fn with_initialization_timeout(handlers: Arc<ServerHandlers>, initialization_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            handlers,
            session: OnceLock::new(),
            client_capabilities: Mutex::new(None),
            client_info: Mutex::new(None),
            min_log_level: Arc::new(AtomicU8::new(LogLevel::Info as u8)),
            subscriptions: Arc::new(Mutex::new(HashSet::new())),
            initialization_timeout,
        })
    }

    /// Records which session this instance answers for, and spawns the
    /// tasks that forward the shared [`ServerHandlers`]' `*_list_changed`
    /// signals to this one session as wire notifications — each session
    /// forwarding its own subscription to the one shared broadcast is what
    /// delivers the notification to every active session without a
    /// provider having to enumerate sessions itself. Must be called
    /// exactly once, before the session starts receiving.
    pub fn bind(&self, session: Weak<Session>) {
        let _ = self.session.set(session);
        spawn_list_changed_forwarder(session.clone(), self.handlers.list_changed.subscribe_tools(), "notifications/tools/list_changed");
        spawn_list_changed_forwarder(session.clone(), self.handlers.list_changed.subscribe_resources(), "notifications/resources/list_changed");
        spawn_list_changed_forwarder(session, self.handlers.list_changed.subscribe_prompts(), "notifications/prompts/list_changed");
    }

    /// Blocks (cooperatively) until `session` reaches
    /// [`mcp_session::SessionState::Initialized`] or `self.initialization_timeout`
    /// elapses, whichever comes first. Returns whether it became initialized.
    async fn wait_for_initialized(&self, session: &Session) -> bool {
        if session.state() == mcp_session::SessionState::Initialized {
            return true;
        }
        let deadline = Instant::now() + self.initialization_timeout;
        loop {
            tokio::time::sleep(INITIALIZATION_POLL_INTERVAL).await;
            if session.state() == mcp_session::SessionState::Initialized {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    fn session(&self) -> Option<Arc<Session>> {
        self.session.get().and_then(Weak::upgrade)
    }

    fn exchange(&self) -> Option<Exchange> {
        let session = self.session()?;
        let capabilities = self.client_capabilities.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()?;
        let info = self.client_info.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()?;
        Some(Exchange::new(session, capabilities, info, Arc::clone(&self.min_log_level), Arc::clone(&self.subscriptions)))
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let Some(session) = self.session() else {
            return Err(JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "session not bound"));
        };
        if !session.begin_initializing() {
            return Err(JsonRpcError::new(
                JsonRpcError::INVALID_REQUEST,
                "initialize already in progress or complete",
            ));
        }
        let Some(raw) = params else {
            return Err(JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "missing initialize params"));
        };
        let params: InitializeParams = mcp_schema::envelope::unmarshal(&raw)
            .map_err(|err| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, err.to_string()))?;
        let negotiated = negotiate_protocol_version(&params.protocol_version);
        *self.client_capabilities.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(params.capabilities);
        *self.client_info.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(params.client_info);

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: self.handlers.server_capabilities(),
            server_info: self.handlers.implementation.clone(),
            instructions: self.handlers.instructions.clone(),
        };
        serde_json::to_value(result).map_err(|err| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, err.to_string()))
    }

    async fn dispatch(&self, method: &str, params: Option<Value>, exchange: &Exchange) -> Result<Value, JsonRpcError> {
        match method {
            "ping" => Ok(Value::Null),
            "tools/list" => self.list_tools(params),
            "tools/call" => self.call_tool(params, exchange).await,
            "resources/list" => self.list_resources(params),
            "resources/templates/list" => self.list_resource_templates(params),
            "resources/read" => self.read_resource(params, exchange).await,
            "resources/subscribe" => self.set_subscription(params, true),
            "resources/unsubscribe" => self.set_subscription(params, false),
            "prompts/list" => self.list_prompts(params),
            "prompts/get" => self.get_prompt(params, exchange).await,
            "completion/complete" => self.complete(params, exchange).await,
            "logging/setLevel" => self.set_level(params),
            _ => Err(JsonRpcError::method_not_found_with_reason(
                format!("unsupported method: {method}"),
                "no handler registered for this method",
            )),
        }
    }

    fn list_tools(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.handlers.tools_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("tools"));
        }
        let cursor = parse_list_params(params)?;
        let mut items: Vec<ToolDefinition> = self.handlers.tools.list_all().into_iter().map(|entry| entry.definition).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        let page: ListToolsResult = paginate(items, cursor);
        to_value(&page)
    }

    async fn call_tool(&self, params: Option<Value>, exchange: &Exchange) -> Result<Value, JsonRpcError> {
        if !self.handlers.tools_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("tools"));
        }
        let params: CallToolParams = require_params(params)?;
        let Some(entry) = self.handlers.tools.get(&params.name) else {
            return Err(unknown_entry("tool", &params.name));
        };
        let result: CallToolResult = entry
            .handler
            .call(exchange, params.arguments)
            .await
            .map_err(error_to_wire)?;
        to_value(&result)
    }

    fn list_resources(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.handlers.resources_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("resources"));
        }
        let cursor = parse_list_params(params)?;
        let mut items: Vec<ResourceDefinition> =
            self.handlers.resources.list_all().into_iter().map(|entry| entry.definition).collect();
        items.sort_by(|a, b| a.uri.cmp(&b.uri));
        let page: ListResourcesResult = paginate(items, cursor);
        to_value(&page)
    }

    fn list_resource_templates(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.handlers.resources_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("resources"));
        }
        let cursor = parse_list_params(params)?;
        let mut items = self
            .handlers
            .resource_templates
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        items.sort_by(|a, b| a.uri_template.cmp(&b.uri_template));
        let page: ListResourceTemplatesResult = paginate(items, cursor);
        to_value(&page)
    }

    async fn read_resource(&self, params: Option<Value>, exchange: &Exchange) -> Result<Value, JsonRpcError> {
        if !self.handlers.resources_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("resources"));
        }
        let params: ReadResourceParams = require_params(params)?;
        let Some(entry) = self.handlers.resources.get(&params.uri) else {
            return Err(unknown_entry("resource", &params.uri));
        };
        let result: ReadResourceResult = entry.handler.read(exchange, &params.uri).await.map_err(error_to_wire)?;
        to_value(&result)
    }

    fn set_subscription(&self, params: Option<Value>, subscribe: bool) -> Result<Value, JsonRpcError> {
        if !self.handlers.resources_subscribe_enabled {
            return Err(JsonRpcError::method_not_found_with_reason(
                "resources/subscribe is not supported",
                "server did not advertise resources.subscribe",
            ));
        }
        let params: ResourceSubscriptionParams = require_params(params)?;
        if !self.handlers.resources.contains(&params.uri) {
            return Err(unknown_entry("resource", &params.uri));
        }
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if subscribe {
            subscriptions.insert(params.uri);
        } else {
            subscriptions.remove(&params.uri);
        }
        Ok(Value::Null)
    }

    fn list_prompts(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.handlers.prompts_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("prompts"));
        }
        let cursor = parse_list_params(params)?;
        let mut items: Vec<PromptDefinition> =
            self.handlers.prompts.list_all().into_iter().map(|entry| entry.definition).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        let page: ListPromptsResult = paginate(items, cursor);
        to_value(&page)
    }

    async fn get_prompt(&self, params: Option<Value>, exchange: &Exchange) -> Result<Value, JsonRpcError> {
        if !self.handlers.prompts_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("prompts"));
        }
        let params: GetPromptParams = require_params(params)?;
        let Some(entry) = self.handlers.prompts.get(&params.name) else {
            return Err(unknown_entry("prompt", &params.name));
        };
        let result = entry.handler.get(exchange, params.arguments).await.map_err(error_to_wire)?;
        to_value(&result)
    }

    async fn complete(&self, params: Option<Value>, exchange: &Exchange) -> Result<Value, JsonRpcError> {
        if !self.handlers.completions_enabled.load(Ordering::Relaxed) {
            return Err(capability_missing("completions"));
        }
        let params: CompleteParams = require_params(params)?;
        let exists = match &params.reference {
            CompletionRef::Prompt { name } => self.handlers.prompts.contains(name),
            CompletionRef::Resource { uri } => self.handlers.resources.contains(uri),
        };
        if !exists {
            let (kind, id) = params.reference.registry_key();
            return Err(unknown_entry(kind, &id));
        }
        let key = completion_key(&params.reference);
        let values = match self.handlers.completions.get(&key) {
            Some(entry) => entry.handler.complete(exchange, &params.argument).await.map_err(error_to_wire)?,
            None => CompletionValues { values: Vec::new(), total: Some(0), has_more: Some(false) },
        };
        to_value(&mcp_schema::methods::CompleteResult { completion: values })
    }

    fn set_level(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.handlers.logging_enabled {
            return Err(JsonRpcError::method_not_found_with_reason(
                "logging/setLevel is not supported",
                "server did not advertise logging",
            ));
        }
        let params: SetLevelParams = require_params(params)?;
        self.min_log_level.store(params.level as u8, Ordering::Release);
        Ok(Value::Null)
    }
}

#[async_trait]
impl RequestHandler for ServerSession {
    async fn handle_request(&self, request: Request) -> Result<Value, JsonRpcError> {
        if request.method == "initialize" {
            return self.handle_initialize(request.params).await;
        }
        let Some(session) = self.session() else {
            return Err(JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "session not bound"));
        };
        // A request arriving before `initialize` was ever sent fails fast; one
        // arriving between the `initialize` response and `notifications/initialized`
        // waits out the initialization timeout.
        if session.state() == mcp_session::SessionState::Uninitialized {
            return Err(not_initialized());
        }
        if session.state() != mcp_session::SessionState::Initialized && !self.wait_for_initialized(session.as_ref()).await {
            return Err(not_initialized());
        }
        let Some(exchange) = self.exchange() else {
            return Err(JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "session missing client identity"));
        };
        let method = McpMethod::classify(&request.method);
        let started = std::time::Instant::now();
        let outcome = self.dispatch(&request.method, request.params, &exchange).await;
        let elapsed = started.elapsed();
        let event = McpMetricEvent {
            method,
            outcome: if outcome.is_ok() { McpOutcome::Ok } else { McpOutcome::Error },
            error_code: outcome.as_ref().err().map(|err| err.code),
        };
        self.handlers.metrics.record_request(event.clone());
        self.handlers.metrics.record_latency(event, elapsed);
        outcome
    }
}

#[async_trait]
impl NotificationHandler for ServerSession {
    async fn handle_notification(&self, method: &str, _params: Option<Value>) {
        match method {
            "notifications/initialized" => {
                if let Some(session) = self.session() {
                    session.mark_initialized();
                }
            }
            other => tracing::debug!(method = other, "unhandled inbound notification"),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn parse_list_params(params: Option<Value>) -> Result<Option<Cursor>, JsonRpcError> {
    match params {
        None => Ok(None),
        Some(value) => {
            let parsed: ListParams = mcp_schema::envelope::unmarshal(&value)
                .map_err(|err| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, err.to_string()))?;
            Ok(parsed.cursor)
        }
    }
}

fn require_params<T>(params: Option<Value>) -> Result<T, JsonRpcError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let value = params.ok_or_else(|| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "missing params"))?;
    mcp_schema::envelope::unmarshal(&value).map_err(|err| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, err.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|err| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, err.to_string()))
}

fn completion_key(reference: &CompletionRef) -> String {
    let (kind, id) = reference.registry_key();
    format!("{kind}:{id}")
}

/// Spawns a task that forwards each signal received on `rx` as a
/// fire-and-forget `method` notification on `session`, until the session is
/// dropped or the broadcast channel closes. A lagged receiver (the session
/// fell behind the signal's small ring buffer) still sends one notification
/// per drain — coalescing bursts is acceptable since the consumer always
/// follows up with a fresh `*/list` call.
fn spawn_list_changed_forwarder(session: Weak<Session>, mut rx: broadcast::Receiver<()>, method: &'static str) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    let Some(session) = session.upgrade() else { return };
                    if let Err(err) = session.send_notification(method, None).await {
                        tracing::warn!(method, %err, "failed to forward list_changed notification");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });
}

fn not_initialized() -> JsonRpcError {
    let err = McpError::NotInitialized("handshake has not completed".to_string());
    JsonRpcError::new(err.to_wire_code(), err.to_string())
}

fn capability_missing(family: &str) -> JsonRpcError {
    JsonRpcError::method_not_found_with_reason(format!("{family} capability is not enabled"), "no handler registered for this family")
}

fn unknown_entry(kind: &str, id: &str) -> JsonRpcError {
    JsonRpcError::with_data(JsonRpcError::INVALID_PARAMS, format!("unknown {kind}: {id}"), serde_json::json!({ "id": id }))
}

fn error_to_wire(err: McpError) -> JsonRpcError {
    match err {
        McpError::Remote(wire) => wire,
        other => JsonRpcError::new(other.to_wire_code(), other.to_string()),
    }
}

fn paginate<T: Clone, R>(items: Vec<T>, cursor: Option<Cursor>) -> R
where
    R: From<Page<T>>,
{
    let start = cursor.map(|c| c.to_string()).and_then(|raw| raw.parse::<usize>().ok()).unwrap_or(0);
    let end = (start + DEFAULT_PAGE_SIZE).min(items.len());
    let slice = items.get(start..end).unwrap_or_default().to_vec();
    let page = if end < items.len() { Page::with_next(slice, Cursor::new(end.to_string())) } else { Page::last(slice) };
    R::from(page)
}
