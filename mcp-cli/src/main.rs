// mcp-cli/src/main.rs
// ============================================================================
// Module: MCP CLI Entry Point
// Description: Reference embedder wiring the MCP runtime (C1-C5) over
//              either stdio or HTTP+SSE.
// Purpose: Give the workspace a runnable binary: load configuration, build
//          the shared handler registries, register the demo tool/resource/
//          prompt, and start the configured transport until signaled to
//          stop.
// Dependencies: clap, mcp-protocol, mcp-schema, mcp-server, mcp-session,
//               mcp-transport, tokio, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `mcp-cli serve` loads a [`config::McpConfig`], builds one shared
//! [`mcp_protocol::ServerHandlers`] registered with the demo tool/resource/
//! prompt, and starts either a single [`mcp_session::Session`] over
//! [`mcp_transport::stdio::StdioServerTransport`] or an
//! [`mcp_server::HttpSseProvider`] accepting any number of concurrent SSE
//! connections, each its own session. `SIGINT`/`SIGTERM` trigger
//! `close_gracefully` on whatever is running.

mod config;
mod demo;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mcp_protocol::ServerHandlersBuilder;
use mcp_protocol::ServerSession;
use mcp_schema::methods::ToolDefinition;
use mcp_server::HttpSseProvider;
use mcp_session::Session;
use mcp_session::SessionOptions;
use mcp_transport::Transport;
use mcp_transport::stdio::StdioServerTransport;

use crate::config::McpConfig;
use crate::config::TransportKind;
use crate::error::CliError;
use crate::error::CliResult;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mcp-cli", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP server over the configured transport.
    Serve(ServeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to `mcp.toml` or `MCP_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,
}

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    match run().await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "mcp-cli exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
    }
}

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = McpConfig::load(command.config.as_deref())?;
    let handlers = build_handlers(&config)?;

    match config.transport.kind {
        TransportKind::Stdio => serve_stdio(&config, handlers).await,
        TransportKind::Http => serve_http(&config, handlers).await,
    }
}

/// Builds the shared handler registries and registers the demo tool,
/// resource, and prompt so the binary is exercisable out of the box.
fn build_handlers(config: &McpConfig) -> CliResult<Arc<mcp_protocol::ServerHandlers>> {
    let mut builder = ServerHandlersBuilder::new(config.server.name.clone(), config.server.version.clone());
    if let Some(instructions) = &config.server.instructions {
        builder = builder.instructions(instructions.clone());
    }
    if config.server.enable_logging {
        builder = builder.enable_logging();
    }
    if config.server.enable_resource_subscribe {
        builder = builder.enable_resource_subscribe();
    }
    let handlers = builder.build();

    let echo_schema = serde_json::json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"],
    });
    handlers
        .add_tool(
            ToolDefinition {
                name: "echo".to_string(),
                description: Some("Echoes back the given text.".to_string()),
                input_schema: echo_schema,
            },
            Arc::new(demo::EchoTool),
        )
        .map_err(CliError::from)?;
    handlers
        .add_resource(
            mcp_schema::methods::ResourceDefinition {
                uri: "demo://greeting".to_string(),
                name: "Greeting".to_string(),
                description: Some("A fixed greeting string.".to_string()),
                mime_type: Some("text/plain".to_string()),
            },
            Arc::new(demo::GreetingResource),
        )
        .map_err(CliError::from)?;
    handlers
        .add_prompt(
            mcp_schema::methods::PromptDefinition {
                name: "greet".to_string(),
                description: Some("Greets the named user.".to_string()),
                arguments: vec![mcp_schema::methods::PromptArgument {
                    name: "name".to_string(),
                    description: Some("Who to greet.".to_string()),
                    required: false,
                }],
            },
            Arc::new(demo::GreetPrompt),
        )
        .map_err(CliError::from)?;

    Ok(handlers)
}

/// Runs a single stdio-bound session until the process receives a shutdown
/// signal or the transport reports the peer went away.
async fn serve_stdio(config: &McpConfig, handlers: Arc<mcp_protocol::ServerHandlers>) -> CliResult<ExitCode> {
    let server_session = ServerSession::with_initialization_timeout(handlers, config.timeouts.initialization_timeout());
    let transport: Arc<dyn Transport> = Arc::new(StdioServerTransport::new());
    let session = Session::new(
        Arc::clone(&transport),
        Arc::clone(&server_session) as Arc<dyn mcp_session::RequestHandler>,
        Arc::clone(&server_session) as Arc<dyn mcp_session::NotificationHandler>,
        SessionOptions { default_timeout: config.timeouts.request_timeout(), ..SessionOptions::default() },
    );
    server_session.bind(Arc::downgrade(&session));
    session.connect().await.map_err(CliError::from)?;
    tracing::info!("mcp-cli listening on stdio");

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, closing stdio session");
    session.close_gracefully().await;
    Ok(ExitCode::SUCCESS)
}

/// Runs the multi-session HTTP+SSE provider until the process receives a
/// shutdown signal.
async fn serve_http(config: &McpConfig, handlers: Arc<mcp_protocol::ServerHandlers>) -> CliResult<ExitCode> {
    let transport = &config.transport;
    let bind = transport.bind.clone().ok_or_else(|| config::ConfigError::Invalid("transport.bind is required for http transport".to_string()))?;
    let provider = HttpSseProvider::new(transport.base_url.clone(), transport.sse_endpoint.clone(), transport.message_endpoint.clone());

    let initialization_timeout = config.timeouts.initialization_timeout();
    let default_timeout = config.timeouts.request_timeout();
    provider
        .set_session_factory(Arc::new(move |inbound: Arc<dyn Transport>| {
            let server_session = ServerSession::with_initialization_timeout(Arc::clone(&handlers), initialization_timeout);
            let session = Session::new(
                inbound,
                Arc::clone(&server_session) as Arc<dyn mcp_session::RequestHandler>,
                Arc::clone(&server_session) as Arc<dyn mcp_session::NotificationHandler>,
                SessionOptions { default_timeout, ..SessionOptions::default() },
            );
            server_session.bind(Arc::downgrade(&session));
            session
        }))
        .map_err(CliError::from)?;

    tracing::info!(bind = %bind, base_url = %transport.base_url, "mcp-cli listening on http+sse");
    tokio::select! {
        result = Arc::clone(&provider).serve(&bind) => {
            result.map_err(CliError::from)?;
        }
        () = wait_for_shutdown_signal() => {
            tracing::info!("shutdown signal received, closing all sessions");
            provider.close_gracefully().await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolves once `SIGINT` (or, on Unix, `SIGTERM`) is received.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;
        use tokio::signal::unix::signal;
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler, watching SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
