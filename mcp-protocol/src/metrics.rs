// mcp-protocol/src/metrics.rs
// ============================================================================
// Module: Protocol Metrics
// Description: Dependency-light observability hooks for request dispatch.
// Purpose: Let embedders plug in a metrics backend without the protocol
//          layer depending on one.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! A small `Copy` label enum per method family, an outcome enum, one event
//! struct carrying both, and a trait with `record_request`/`record_latency`.
//! [`NoopMetrics`] is the default so wiring a sink is opt-in.

use std::time::Duration;

/// Classifies an inbound method for metric labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    /// `initialize`.
    Initialize,
    /// `ping`.
    Ping,
    /// `tools/list`.
    ToolsList,
    /// `tools/call`.
    ToolsCall,
    /// `resources/list`.
    ResourcesList,
    /// `resources/read`.
    ResourcesRead,
    /// `resources/templates/list`.
    ResourceTemplatesList,
    /// `resources/subscribe` or `resources/unsubscribe`.
    ResourcesSubscription,
    /// `prompts/list`.
    PromptsList,
    /// `prompts/get`.
    PromptsGet,
    /// `completion/complete`.
    Completion,
    /// `logging/setLevel`.
    LoggingSetLevel,
    /// `roots/list`.
    RootsList,
    /// `sampling/createMessage`.
    SamplingCreateMessage,
    /// A method name not covered by the dedicated variants.
    Other,
}

impl McpMethod {
    /// Classifies a wire method name.
    #[must_use]
    pub fn classify(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "resources/read" => Self::ResourcesRead,
            "resources/templates/list" => Self::ResourceTemplatesList,
            "resources/subscribe" | "resources/unsubscribe" => Self::ResourcesSubscription,
            "prompts/list" => Self::PromptsList,
            "prompts/get" => Self::PromptsGet,
            "completion/complete" => Self::Completion,
            "logging/setLevel" => Self::LoggingSetLevel,
            "roots/list" => Self::RootsList,
            "sampling/createMessage" => Self::SamplingCreateMessage,
            _ => Self::Other,
        }
    }

    /// Stable label for this method classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::ResourcesList => "resources/list",
            Self::ResourcesRead => "resources/read",
            Self::ResourceTemplatesList => "resources/templates/list",
            Self::ResourcesSubscription => "resources/subscribe",
            Self::PromptsList => "prompts/list",
            Self::PromptsGet => "prompts/get",
            Self::Completion => "completion/complete",
            Self::LoggingSetLevel => "logging/setLevel",
            Self::RootsList => "roots/list",
            Self::SamplingCreateMessage => "sampling/createMessage",
            Self::Other => "other",
        }
    }
}

/// Outcome of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpOutcome {
    /// The handler returned a successful result.
    Ok,
    /// The handler returned an error, or dispatch failed locally.
    Error,
}

/// One dispatch event: method, outcome, and the JSON-RPC error code when
/// the outcome was [`McpOutcome::Error`].
#[derive(Debug, Clone)]
pub struct McpMetricEvent {
    /// Method classification.
    pub method: McpMethod,
    /// Dispatch outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code, present only when `outcome` is `Error`.
    pub error_code: Option<i64>,
}

/// Metrics sink for protocol-layer dispatch.
pub trait McpMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: McpMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: McpMetricEvent, latency: Duration);
}

/// Discards every event; the default sink.
pub struct NoopMetrics;

impl McpMetrics for NoopMetrics {
    fn record_request(&self, _event: McpMetricEvent) {}
    fn record_latency(&self, _event: McpMetricEvent, _latency: Duration) {}
}
