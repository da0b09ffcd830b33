// mcp-schema/src/methods.rs
// ============================================================================
// Module: Method Surface Types
// Description: Typed request/result pairs for every supported JSON-RPC method.
// Purpose: Let the protocol layer (mcp-protocol) build and parse
//          `params`/`result` payloads without hand-rolling
//          `serde_json::Value` shapes at every call site.
// Dependencies: serde, serde_json, crate::capabilities, crate::pagination
// ============================================================================

//! ## Overview
//! Every struct here round-trips through [`crate::envelope::unmarshal`] on
//! one side and `serde_json::to_value` on the other; none of them know
//! about the transport or session layer. Field names use `camelCase` on the
//! wire via `#[serde(rename_all = "camelCase")]`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::capabilities::ClientCapabilities;
use crate::capabilities::ServerCapabilities;
use crate::pagination::Cursor;
use crate::pagination::Page;

// ============================================================================
// SECTION: Shared Shapes
// ============================================================================

/// `{ name, version }` identity advertised by both peers at initialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version string.
    pub version: String,
}

/// Conversational role carried by prompt and sampling messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user or calling agent.
    User,
    /// The model.
    Assistant,
}

/// Opaque cursor carried by any list request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    /// Page cursor from a previous response; forwarded byte-identically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

/// Content block shared by tool results and prompt/sampling messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text content.
    Text {
        /// Text payload.
        text: String,
    },
    /// Structured JSON content.
    Json {
        /// JSON payload.
        json: Value,
    },
}

// ============================================================================
// SECTION: Initialize
// ============================================================================

/// `initialize` request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Highest protocol version the client supports.
    pub protocol_version: String,
    /// Client capability set.
    pub capabilities: ClientCapabilities,
    /// Client identity.
    pub client_info: Implementation,
}

/// `initialize` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Negotiated protocol version.
    pub protocol_version: String,
    /// Server capability set.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: Implementation,
    /// Free-form usage instructions for the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Declared shape of a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name; the registry key.
    pub name: String,
    /// Human-readable description shown to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema describing the tool's input arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// `tools/list` result.
pub type ListToolsResult = Page<ToolDefinition>;

/// `tools/call` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name; must exist in the registry.
    pub name: String,
    /// Tool arguments, validated by the handler.
    #[serde(default)]
    pub arguments: Value,
}

/// `tools/call` result. `is_error == true` is a *successful* JSON-RPC
/// response semantically distinct from a JSON-RPC `error` — it MUST be
/// preserved rather than collapsed into a wire-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Tool output content blocks.
    pub content: Vec<Content>,
    /// Whether the tool call itself failed (distinct from a protocol error).
    #[serde(default)]
    pub is_error: bool,
}

// ============================================================================
// SECTION: Resources
// ============================================================================

/// Declared shape of a registered resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource URI; the registry key.
    pub uri: String,
    /// Human-readable resource name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource contents.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// `resources/list` result.
pub type ListResourcesResult = Page<ResourceDefinition>;

/// Discovery-only resource template entry: listed separately from concrete
/// resources, with no handler of its own — pure discovery metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// URI template, e.g. `"file:///{path}"`.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `resources/templates/list` result.
pub type ListResourceTemplatesResult = Page<ResourceTemplate>;

/// `resources/read` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// A single resource content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI this content block belongs to.
    pub uri: String,
    /// MIME type of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text contents, when the resource is text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded contents, when the resource is binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// `resources/read` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// Content blocks; typically one, but a resource may expand to several.
    pub contents: Vec<ResourceContents>,
}

/// `resources/subscribe` / `resources/unsubscribe` params, and the shape of
/// `notifications/resources/updated` (same single `uri` field, fired the
/// other direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSubscriptionParams {
    /// URI to subscribe to, unsubscribe from, or that changed.
    pub uri: String,
}

// ============================================================================
// SECTION: Prompts
// ============================================================================

/// A single named argument a prompt accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// Declared shape of a registered prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt name; the registry key.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments the prompt accepts.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// `prompts/list` result.
pub type ListPromptsResult = Page<PromptDefinition>;

/// `prompts/get` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptParams {
    /// Prompt name; must exist in the registry.
    pub name: String,
    /// Argument values keyed by [`PromptArgument::name`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// A single rendered prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker role.
    pub role: Role,
    /// Message content.
    pub content: Content,
}

/// `prompts/get` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Optional description of the rendered prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages.
    pub messages: Vec<PromptMessage>,
}

// ============================================================================
// SECTION: Completion
// ============================================================================

/// Tagged reference to the entity a completion request targets (spec
/// §4.4.6): either a prompt name or a resource URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionRef {
    /// References a registered prompt by name.
    #[serde(rename = "ref/prompt")]
    Prompt {
        /// Prompt name.
        name: String,
    },
    /// References a registered resource by URI.
    #[serde(rename = "ref/resource")]
    Resource {
        /// Resource URI.
        uri: String,
    },
}

impl CompletionRef {
    /// The `(refType, refId)` key under which the completion registry looks
    /// this reference up.
    #[must_use]
    pub fn registry_key(&self) -> (&'static str, String) {
        match self {
            Self::Prompt { name } => ("prompt", name.clone()),
            Self::Resource { uri } => ("resource", uri.clone()),
        }
    }
}

/// The argument a completion request is completing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionArgument {
    /// Argument name being completed.
    pub name: String,
    /// Partial value typed so far.
    pub value: String,
}

/// `completion/complete` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteParams {
    /// Target prompt or resource.
    #[serde(rename = "ref")]
    pub reference: CompletionRef,
    /// Argument being completed.
    pub argument: CompletionArgument,
}

/// Completion candidates for a `completion/complete` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionValues {
    /// Candidate completions, closest match first.
    pub values: Vec<String>,
    /// Total number of candidates, when known to exceed `values.len()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Whether more candidates exist beyond `values`.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "hasMore")]
    pub has_more: Option<bool>,
}

/// `completion/complete` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResult {
    /// Completion candidates.
    pub completion: CompletionValues,
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Logging severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Ordinal 0.
    Debug,
    /// Ordinal 1.
    Info,
    /// Ordinal 2.
    Notice,
    /// Ordinal 3.
    Warning,
    /// Ordinal 4.
    Error,
    /// Ordinal 5.
    Critical,
    /// Ordinal 6.
    Alert,
    /// Ordinal 7.
    Emergency,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// `logging/setLevel` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelParams {
    /// New minimum level for this session.
    pub level: LogLevel,
}

/// `notifications/message` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingMessageParams {
    /// Severity of this message.
    pub level: LogLevel,
    /// Optional logger name the message originated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// Arbitrary structured payload.
    pub data: Value,
}

// ============================================================================
// SECTION: Roots
// ============================================================================

/// A client-advertised filesystem/URI boundary the server may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    /// Root URI.
    pub uri: String,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `roots/list` result.
pub type ListRootsResult = Page<Root>;

// ============================================================================
// SECTION: Sampling
// ============================================================================

/// A single message in a sampling conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Speaker role.
    pub role: Role,
    /// Message content.
    pub content: Content,
}

/// Model selection hints; forwarded opaquely to the client's sampler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Opaque preference payload (cost/speed/quality hints, model hints).
    #[serde(flatten)]
    pub hints: Value,
}

/// `sampling/createMessage` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageParams {
    /// Conversation turns to sample from.
    pub messages: Vec<SamplingMessage>,
    /// Model selection hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
    /// Optional system prompt prepended to the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// `sampling/createMessage` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageResult {
    /// Role of the generated message (always `Assistant` in practice).
    pub role: Role,
    /// Generated content.
    pub content: Content,
    /// Name of the model that produced this message.
    pub model: String,
    /// Why generation stopped, when the sampler reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_ordering_matches_spec() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Notice);
        assert!(LogLevel::Notice < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert!(LogLevel::Critical < LogLevel::Alert);
        assert!(LogLevel::Alert < LogLevel::Emergency);
    }

    #[test]
    fn completion_ref_registry_key() {
        let prompt_ref = CompletionRef::Prompt { name: "greeting".to_string() };
        assert_eq!(prompt_ref.registry_key(), ("prompt", "greeting".to_string()));
        let resource_ref = CompletionRef::Resource { uri: "file:///a".to_string() };
        assert_eq!(resource_ref.registry_key(), ("resource", "file:///a".to_string()));
    }

    #[test]
    fn initialize_params_round_trip() {
        let params = InitializeParams {
            protocol_version: "2024-11-05".to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "x".to_string(),
                version: "1".to_string(),
            },
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
        let back: InitializeParams = serde_json::from_value(value).unwrap();
        assert_eq!(back.client_info.name, "x");
    }
}
