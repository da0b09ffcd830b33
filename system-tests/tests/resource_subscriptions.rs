// system-tests/tests/resource_subscriptions.rs
// ============================================================================
// Scenario coverage: `resources/subscribe` and `resources/unsubscribe`
// gating and validation against `ServerCapabilities.resources.subscribe`,
// plus `notifications/resources/updated` delivery being conditioned on a
// live per-session subscription.
// ============================================================================

mod support;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mcp_protocol::ChangeNotification;
use mcp_protocol::Exchange;
use mcp_protocol::ResourceHandler;
use mcp_schema::McpError;
use mcp_schema::methods::ReadResourceResult;
use mcp_schema::methods::ResourceContents;
use mcp_schema::methods::ResourceDefinition;

use support::harness::connected_pair;

struct StaticResource;

#[async_trait]
impl ResourceHandler for StaticResource {
    async fn read(&self, _exchange: &Exchange, uri: &str) -> Result<ReadResourceResult, McpError> {
        Ok(ReadResourceResult { contents: vec![ResourceContents { uri: uri.to_string(), mime_type: None, text: Some("static".to_string()), blob: None }] })
    }
}

/// Captures the [`Exchange`] handed to its first `read` call so a test can
/// push a later out-of-band update through it, the way a file watcher or
/// poll loop would hold onto an exchange obtained from an earlier request.
struct CapturingResource {
    captured: Mutex<Option<Exchange>>,
}

impl CapturingResource {
    fn new() -> Self {
        Self { captured: Mutex::new(None) }
    }
}

#[async_trait]
impl ResourceHandler for CapturingResource {
    async fn read(&self, exchange: &Exchange, uri: &str) -> Result<ReadResourceResult, McpError> {
        *self.captured.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(exchange.clone());
        Ok(ReadResourceResult { contents: vec![ResourceContents { uri: uri.to_string(), mime_type: None, text: Some("v1".to_string()), blob: None }] })
    }
}

#[tokio::test]
async fn subscribing_then_unsubscribing_a_registered_resource_succeeds() {
    let (pair, _init) = connected_pair(|builder| builder.enable_resource_subscribe()).await;
    pair.server_handlers
        .add_resource(ResourceDefinition { uri: "demo://thing".to_string(), name: "thing".to_string(), description: None, mime_type: None }, Arc::new(StaticResource))
        .unwrap();

    pair.client.subscribe_resource("demo://thing").await.unwrap();
    pair.client.unsubscribe_resource("demo://thing").await.unwrap();
}

#[tokio::test]
async fn subscribing_without_resources_subscribe_enabled_fails_locally() {
    let (pair, _init) = connected_pair(|builder| builder).await;
    pair.server_handlers
        .add_resource(ResourceDefinition { uri: "demo://thing".to_string(), name: "thing".to_string(), description: None, mime_type: None }, Arc::new(StaticResource))
        .unwrap();
    // The server advertises `resources` (a resource is registered) but not
    // `resources.subscribe`, so the client's local capability gate rejects
    // this before any wire traffic is sent.
    let result = pair.client.subscribe_resource("demo://thing").await;
    assert!(matches!(result, Err(McpError::CapabilityMissing(_))));
}

#[tokio::test]
async fn subscribing_an_unregistered_uri_fails_even_when_subscribe_is_enabled() {
    let (pair, _init) = connected_pair(|builder| builder.enable_resource_subscribe()).await;
    pair.server_handlers
        .add_resource(ResourceDefinition { uri: "demo://thing".to_string(), name: "thing".to_string(), description: None, mime_type: None }, Arc::new(StaticResource))
        .unwrap();
    let result = pair.client.subscribe_resource("demo://missing").await;
    assert!(matches!(result, Err(McpError::Remote(_))));
}

#[tokio::test]
async fn a_subscribed_session_receives_resources_updated_after_an_out_of_band_push() {
    let (pair, _init) = connected_pair(|builder| builder.enable_resource_subscribe()).await;
    let resource = Arc::new(CapturingResource::new());
    pair.server_handlers
        .add_resource(
            ResourceDefinition { uri: "demo://thing".to_string(), name: "thing".to_string(), description: None, mime_type: None },
            Arc::clone(&resource) as Arc<dyn ResourceHandler>,
        )
        .unwrap();

    let mut changes = pair.client.subscribe_changes();
    pair.client.subscribe_resource("demo://thing").await.unwrap();
    pair.client.read_resource("demo://thing").await.unwrap();

    let exchange = resource.captured.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone().expect("read captured an exchange");
    exchange.notify_resource_updated("demo://thing").await.unwrap();

    let notification = tokio::time::timeout(Duration::from_secs(1), changes.recv()).await.unwrap().unwrap();
    assert!(matches!(notification, ChangeNotification::ResourceUpdated(uri) if uri == "demo://thing"));
}

#[tokio::test]
async fn an_unsubscribed_session_never_receives_resources_updated() {
    let (pair, _init) = connected_pair(|builder| builder.enable_resource_subscribe()).await;
    let resource = Arc::new(CapturingResource::new());
    pair.server_handlers
        .add_resource(
            ResourceDefinition { uri: "demo://thing".to_string(), name: "thing".to_string(), description: None, mime_type: None },
            Arc::clone(&resource) as Arc<dyn ResourceHandler>,
        )
        .unwrap();

    let mut changes = pair.client.subscribe_changes();
    // Deliberately no `subscribe_resource` call.
    pair.client.read_resource("demo://thing").await.unwrap();

    let exchange = resource.captured.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone().expect("read captured an exchange");
    exchange.notify_resource_updated("demo://thing").await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
    assert!(outcome.is_err(), "no notification should arrive for an unsubscribed uri");
}
