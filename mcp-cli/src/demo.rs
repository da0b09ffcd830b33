// mcp-cli/src/demo.rs
// ============================================================================
// Module: Demo Handlers
// Description: Sample tool, resource, and prompt registered on every
//              `mcp-cli` server so the binary is runnable and exercisable
//              end to end without an embedder supplying its own handlers.
// Purpose: Give a newly-checked-out `mcp-cli` something to call: `echo`
//          exercises `tools/call`, `demo://greeting` exercises
//          `resources/read`, and `greet` exercises `prompts/get`.
// Dependencies: async-trait, mcp-protocol, mcp-schema, serde_json
// ============================================================================

use async_trait::async_trait;
use mcp_protocol::Exchange;
use mcp_protocol::PromptHandler;
use mcp_protocol::ResourceHandler;
use mcp_protocol::ToolHandler;
use mcp_schema::McpError;
use mcp_schema::methods::CallToolResult;
use mcp_schema::methods::Content;
use mcp_schema::methods::GetPromptResult;
use mcp_schema::methods::LogLevel;
use mcp_schema::methods::PromptMessage;
use mcp_schema::methods::ReadResourceResult;
use mcp_schema::methods::ResourceContents;
use mcp_schema::methods::Role;
use serde_json::Value;

/// Echoes back its `text` argument as a single text content block.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, exchange: &Exchange, arguments: Value) -> Result<CallToolResult, McpError> {
        let Some(text) = arguments.get("text").and_then(Value::as_str) else {
            return Ok(CallToolResult {
                content: vec![Content::Text { text: "missing required argument: text".to_string() }],
                is_error: true,
            });
        };
        let _ = exchange.notify_log(LogLevel::Info, Some("mcp-cli::demo".to_string()), serde_json::json!({ "tool": "echo", "len": text.len() })).await;
        Ok(CallToolResult {
            content: vec![Content::Text { text: text.to_string() }],
            is_error: false,
        })
    }
}

/// Serves a fixed greeting as `demo://greeting`.
pub struct GreetingResource;

#[async_trait]
impl ResourceHandler for GreetingResource {
    async fn read(&self, _exchange: &Exchange, uri: &str) -> Result<ReadResourceResult, McpError> {
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: Some("hello from mcp-cli".to_string()),
                blob: None,
            }],
        })
    }
}

/// Renders a one-message `greet` prompt taking an optional `name` argument.
pub struct GreetPrompt;

#[async_trait]
impl PromptHandler for GreetPrompt {
    async fn get(&self, _exchange: &Exchange, arguments: Option<Value>) -> Result<GetPromptResult, McpError> {
        let name = arguments.as_ref().and_then(|value| value.get("name")).and_then(Value::as_str).unwrap_or("there");
        Ok(GetPromptResult {
            description: Some("Greets the named user.".to_string()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::Text { text: format!("Say hello to {name}.") },
            }],
        })
    }
}
