// mcp-cli/src/error.rs
// ============================================================================
// Module: CLI Errors
// Description: Top-level error type unifying config, server, and transport
//              failures into one exit-code decision.
// Purpose: Keep `main` a thin match over one error enum that wraps every
//          fallible subsystem the CLI touches.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

use crate::config::ConfigError;

/// Top-level `mcp-cli` error.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The HTTP+SSE provider failed to bind or serve.
    #[error("server error: {0}")]
    Server(#[from] mcp_server::McpServerError),
    /// A handler registration or transport connect call failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] mcp_schema::McpError),
}

/// CLI result alias for fallible operations.
pub type CliResult<T> = Result<T, CliError>;
