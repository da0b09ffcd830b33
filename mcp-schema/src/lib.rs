// mcp-schema/src/lib.rs
// ============================================================================
// Module: MCP Schema
// Description: Wire-level JSON-RPC 2.0 envelope and MCP data model.
// Purpose: Give every other crate in the workspace one shared vocabulary for
//          messages, capabilities, and errors so transports and the session
//          layer never need to know about method-specific payload shapes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `mcp-schema` is the leaf crate of the workspace: the JSON-RPC 2.0 envelope
//! (request/response/notification), the MCP capability structs, the typed
//! request/result pairs for every method in the method surface, and the
//! shared [`McpError`] enum all live here with no dependency on tokio, axum,
//! or any transport. Nothing in this crate performs I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capabilities;
pub mod envelope;
pub mod error;
pub mod methods;
pub mod pagination;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capabilities::ClientCapabilities;
pub use capabilities::RootsCapability;
pub use capabilities::SamplingCapability;
pub use capabilities::ServerCapabilities;
pub use envelope::Envelope;
pub use envelope::JsonRpcError;
pub use envelope::Notification;
pub use envelope::Request;
pub use envelope::RequestId;
pub use envelope::Response;
pub use error::McpError;
pub use pagination::Cursor;
pub use pagination::Page;

/// JSON-RPC protocol version literal carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";
