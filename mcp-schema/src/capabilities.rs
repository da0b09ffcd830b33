// mcp-schema/src/capabilities.rs
// ============================================================================
// Module: Capabilities
// Description: Client and server capability structs negotiated at initialize.
// Purpose: Let the protocol layer gate operations locally before any wire
//          traffic is sent.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Both peers publish a capability set at `initialize`. Each capability is
//! an optional sub-object; its *presence* enables the feature family it
//! names. Absent sub-objects decode as `None` and are omitted on encode, so
//! a peer that never mentions `resources` is indistinguishable on the wire
//! from one that mentions it with all flags `false` — only presence gates,
//! not flag values (except for the per-feature `listChanged`/`subscribe`
//! flags those sub-objects carry, which only affect notification behavior).

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Client Capabilities
// ============================================================================

/// Capabilities the client advertises at `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Enables `roots/list` and `notifications/roots/list_changed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
    /// Enables `sampling/createMessage`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
    /// Experimental, unspecified feature flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

/// Roots capability sub-object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootsCapability {
    /// Whether the client emits `notifications/roots/list_changed`.
    #[serde(default)]
    pub list_changed: bool,
}

/// Sampling capability sub-object. Presently carries no flags; its presence
/// alone enables `sampling/createMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingCapability {}

// ============================================================================
// SECTION: Server Capabilities
// ============================================================================

/// Capabilities the server advertises at `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Enables `tools/list` and `tools/call`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    /// Enables `resources/*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    /// Enables `prompts/*`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
    /// Enables `logging/setLevel` and `notifications/message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
    /// Enables `completion/complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<CompletionsCapability>,
    /// Experimental, unspecified feature flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

/// Tools capability sub-object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether the server emits `notifications/tools/list_changed`.
    #[serde(default)]
    pub list_changed: bool,
}

/// Resources capability sub-object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesCapability {
    /// Whether `resources/subscribe` and `resources/unsubscribe` are supported.
    #[serde(default)]
    pub subscribe: bool,
    /// Whether the server emits `notifications/resources/list_changed`.
    #[serde(default)]
    pub list_changed: bool,
}

/// Prompts capability sub-object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsCapability {
    /// Whether the server emits `notifications/prompts/list_changed`.
    #[serde(default)]
    pub list_changed: bool,
}

/// Logging capability sub-object. Presence alone enables `logging/setLevel`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Completions capability sub-object. Presence alone enables `completion/complete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionsCapability {}
