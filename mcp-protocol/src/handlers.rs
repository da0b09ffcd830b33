// mcp-protocol/src/handlers.rs
// ============================================================================
// Module: Server Handler Traits
// Description: The four capability-family handler shapes an embedder
//              implements and registers with an [`crate::server::McpServer`].
// Purpose: Keep dispatch generic over "what a tool/resource/prompt/
//          completion handler actually does".
// Dependencies: async-trait, mcp-schema
// ============================================================================

//! ## Overview
//! Each trait answers exactly one request shape and receives the calling
//! [`Exchange`] so it can make reverse calls or emit log notifications.
//! Handlers return a typed result or an [`McpError`]; dispatch converts the
//! error to a JSON-RPC error body.

use async_trait::async_trait;
use mcp_schema::McpError;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::CompletionArgument;
use mcp_schema::methods::CompletionValues;
use mcp_schema::methods::GetPromptResult;
use mcp_schema::methods::ReadResourceResult;
use serde_json::Value;

use crate::exchange::Exchange;

/// Answers `tools/call` for one registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Executes the tool against validated `arguments`.
    ///
    /// # Errors
    ///
    /// Returns an [`McpError`] for protocol-level failure. A tool that ran
    /// but failed its own task should instead return
    /// `Ok(CallToolResult { is_error: true, .. })`.
    async fn call(&self, exchange: &Exchange, arguments: Value) -> Result<CallToolResult, McpError>;
}

/// Answers `resources/read` for one registered resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Reads the resource's current contents.
    ///
    /// # Errors
    ///
    /// Returns an [`McpError`] if the read fails.
    async fn read(&self, exchange: &Exchange, uri: &str) -> Result<ReadResourceResult, McpError>;
}

/// Answers `prompts/get` for one registered prompt.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Renders the prompt with the caller-supplied argument values.
    ///
    /// # Errors
    ///
    /// Returns an [`McpError`] if rendering fails (e.g. a required argument
    /// is missing).
    async fn get(&self, exchange: &Exchange, arguments: Option<Value>) -> Result<GetPromptResult, McpError>;
}

/// Answers `completion/complete` for one registered prompt or resource.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Produces completion candidates for the partially-typed `argument`.
    ///
    /// # Errors
    ///
    /// Returns an [`McpError`] if completion generation fails.
    async fn complete(&self, exchange: &Exchange, argument: &CompletionArgument) -> Result<CompletionValues, McpError>;
}
