// mcp-cli/src/config.rs
// ============================================================================
// Module: CLI Configuration
// Description: TOML configuration loading and validation for the `mcp-cli`
//              embedder binary.
// Purpose: Provide strict, fail-closed config parsing: a `load` entry point
//          that resolves the file to read, and a `validate` pass that runs
//          once at startup over the MCP runtime's own recognized options.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a hard size limit and
//! validated exactly once at startup.
//! Missing or invalid configuration fails closed rather than falling back to
//! partially-applied defaults.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mcp_schema::methods::Implementation;
use serde::Deserialize;
use thiserror::Error;

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mcp.toml";
/// Environment variable used to override the config path.
const CONFIG_ENV_VAR: &str = "MCP_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default per-request timeout in milliseconds (`requestTimeoutMs`).
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 20_000;
/// Default initialization handshake timeout in milliseconds.
const DEFAULT_INITIALIZATION_TIMEOUT_MS: u64 = 20_000;
/// Default SSE connect timeout in milliseconds (client transport only).
const DEFAULT_SSE_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Top-level `mcp-cli` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    /// Server identity and behavior.
    #[serde(default)]
    pub server: ServerConfig,
    /// Transport selection and endpoint shape.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Timeout overrides.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            transport: TransportConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl McpConfig {
    /// Loads configuration from disk using the default resolution rules: an
    /// explicit `path`, else `MCP_CONFIG`, else `./mcp.toml` if present, else
    /// built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the resolved file exists but cannot be
    /// read, exceeds the size limit, or fails to parse or validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let Some(resolved) = resolved else {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        };

        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.transport.validate()?;
        self.timeouts.validate()?;
        Ok(())
    }
}

/// Server identity and feature toggles.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Name advertised in `initialize`'s `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Version advertised in `initialize`'s `serverInfo`.
    #[serde(default = "default_server_version")]
    pub version: String,
    /// Free-form usage instructions returned at `initialize`.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Whether to enable the `logging` capability family.
    #[serde(default = "default_true")]
    pub enable_logging: bool,
    /// Whether to enable `resources/subscribe` and `resources/unsubscribe`.
    #[serde(default)]
    pub enable_resource_subscribe: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            instructions: None,
            enable_logging: true,
            enable_resource_subscribe: false,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("server.name must be non-empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid("server.version must be non-empty".to_string()));
        }
        Ok(())
    }

    /// Returns the implementation identity this config advertises.
    #[must_use]
    pub fn implementation(&self) -> Implementation {
        Implementation {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Default `server.name` when the config omits it.
fn default_server_name() -> String {
    "mcp-cli".to_string()
}

/// Default `server.version`: this crate's own version.
fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Serde default helper returning `true`.
const fn default_true() -> bool {
    true
}

/// Transport binding selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Line-delimited JSON over this process's own stdio.
    #[default]
    Stdio,
    /// Multi-session HTTP+SSE provider.
    Http,
}

/// Transport configuration: which binding to use and, for HTTP, where.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// Which transport binding to start.
    #[serde(default)]
    pub kind: TransportKind,
    /// Socket address to bind when `kind` is `http`, e.g. `"127.0.0.1:8080"`.
    #[serde(default)]
    pub bind: Option<String>,
    /// Base URL advertised in the `endpoint` discovery event, e.g.
    /// `"http://127.0.0.1:8080"` (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path serving the SSE stream.
    #[serde(default = "default_sse_endpoint")]
    pub sse_endpoint: String,
    /// Path accepting posted client messages.
    #[serde(default = "default_message_endpoint")]
    pub message_endpoint: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            bind: None,
            base_url: default_base_url(),
            sse_endpoint: default_sse_endpoint(),
            message_endpoint: default_message_endpoint(),
        }
    }
}

impl TransportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            TransportKind::Stdio => Ok(()),
            TransportKind::Http => {
                let bind = self.bind.as_deref().ok_or_else(|| ConfigError::Invalid("transport.bind is required for http transport".to_string()))?;
                let _: SocketAddr = bind.parse().map_err(|err| ConfigError::Invalid(format!("transport.bind is not a valid socket address: {err}")))?;
                if self.base_url.trim().is_empty() {
                    return Err(ConfigError::Invalid("transport.baseUrl must be non-empty for http transport".to_string()));
                }
                if !self.sse_endpoint.starts_with('/') {
                    return Err(ConfigError::Invalid("transport.sseEndpoint must start with '/'".to_string()));
                }
                if !self.message_endpoint.starts_with('/') {
                    return Err(ConfigError::Invalid("transport.messageEndpoint must start with '/'".to_string()));
                }
                Ok(())
            }
        }
    }
}

/// Default `transport.baseUrl`.
fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// Default `transport.sseEndpoint`.
fn default_sse_endpoint() -> String {
    "/sse".to_string()
}

/// Default `transport.messageEndpoint`.
fn default_message_endpoint() -> String {
    "/message".to_string()
}

/// Timeout overrides (`requestTimeoutMs`/`initializationTimeoutMs`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Default per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a mid-handshake request waits for `notifications/initialized`.
    #[serde(default = "default_initialization_timeout_ms")]
    pub initialization_timeout_ms: u64,
    /// How long the SSE client transport waits for the `endpoint` event.
    #[serde(default = "default_sse_connect_timeout_ms")]
    pub sse_connect_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            initialization_timeout_ms: default_initialization_timeout_ms(),
            sse_connect_timeout_ms: default_sse_connect_timeout_ms(),
        }
    }
}

impl TimeoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.requestTimeoutMs must be positive".to_string()));
        }
        if self.initialization_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.initializationTimeoutMs must be positive".to_string()));
        }
        if self.sse_connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.sseConnectTimeoutMs must be positive".to_string()));
        }
        Ok(())
    }

    /// Default per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Initialization handshake timeout as a [`Duration`].
    #[must_use]
    pub const fn initialization_timeout(&self) -> Duration {
        Duration::from_millis(self.initialization_timeout_ms)
    }
}

/// Default `timeouts.requestTimeoutMs`.
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default `timeouts.initializationTimeoutMs`.
fn default_initialization_timeout_ms() -> u64 {
    DEFAULT_INITIALIZATION_TIMEOUT_MS
}

/// Default `timeouts.sseConnectTimeoutMs`.
fn default_sse_connect_timeout_ms() -> u64 {
    DEFAULT_SSE_CONNECT_TIMEOUT_MS
}

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading the configuration file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Resolves the config path: explicit argument, then `MCP_CONFIG`, then
/// `./mcp.toml` if it exists. Returns `None` when none apply, meaning
/// built-in defaults should be used.
fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    default_path.exists().then_some(default_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let mut config = McpConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn http_transport_requires_bind() {
        let mut config = McpConfig {
            transport: TransportConfig {
                kind: TransportKind::Http,
                ..TransportConfig::default()
            },
            ..McpConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn http_transport_rejects_unparseable_bind() {
        let mut config = McpConfig {
            transport: TransportConfig {
                kind: TransportKind::Http,
                bind: Some("not-an-address".to_string()),
                ..TransportConfig::default()
            },
            ..McpConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = McpConfig {
            timeouts: TimeoutConfig {
                request_timeout_ms: 0,
                ..TimeoutConfig::default()
            },
            ..McpConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_falls_back_to_defaults_when_no_path_resolves() {
        assert!(env::var(CONFIG_ENV_VAR).is_err(), "test process must not inherit MCP_CONFIG");
        let config = McpConfig::load(None).expect("defaults must validate");
        assert_eq!(config.server.name, "mcp-cli");
    }

    #[test]
    fn load_reads_file_and_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nname = \"demo-server\"\n").expect("write config");
        let config = McpConfig::load(Some(&path)).expect("load must succeed");
        assert_eq!(config.server.name, "demo-server");
    }

    #[test]
    fn load_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("huge.toml");
        let oversized = "x".repeat(MAX_CONFIG_FILE_SIZE + 1);
        fs::write(&path, format!("# {oversized}\n")).expect("write config");
        assert!(matches!(McpConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));
    }
}
