// mcp-schema/src/envelope.rs
// ============================================================================
// Module: JSON-RPC Envelope
// Description: Request/response/notification envelope and the discrimination
//              rule that tells them apart on decode.
// Purpose: Give the session layer (mcp-session) a single decoded shape to
//          route on.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`Envelope`] is one of three shapes sharing a literal `jsonrpc: "2.0"`
//! field: [`Request`], [`Response`], or [`Notification`]. Discrimination on
//! decode follows the order fixed by the protocol: presence of `id` +
//! `method` means a request; `id` + (`result` | `error`) means a response;
//! `method` alone means a notification. Anything else is not classifiable
//! and decode returns [`crate::McpError::InvalidRequest`].

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::JSONRPC_VERSION;
use crate::error::McpError;

// ============================================================================
// SECTION: Request Id
// ============================================================================

/// A JSON-RPC request id: either a string or an integer, never a float or
/// `null`. Responses MUST carry the same id type as their request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String-valued id (used by session-generated ids, e.g. `"c3f1a9-7"`).
    Str(String),
    /// Integer-valued id.
    Int(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

// ============================================================================
// SECTION: Envelope Shapes
// ============================================================================

/// A JSON-RPC request: expects exactly one matching response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request identifier, unique for the lifetime of the session.
    pub id: RequestId,
    /// Method name, e.g. `"tools/call"`.
    pub method: String,
    /// Opaque method parameters, forwarded without interpretation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC response: carries exactly one of `result`/`error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this response answers.
    pub id: RequestId,
    /// Successful result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload; mutually exclusive with `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    /// Builds a successful response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC notification: fire-and-forget, never elicits a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Method name, e.g. `"notifications/initialized"`.
    pub method: String,
    /// Opaque method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code. Reserved codes are in [`JsonRpcError`]'s associated
    /// constants; application-defined codes propagate unchanged.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Structured error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Reserved JSON-RPC code: malformed inbound bytes.
    pub const PARSE_ERROR: i64 = -32700;
    /// Reserved JSON-RPC code: envelope well-formed but not classifiable.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Reserved JSON-RPC code: no handler registered for the method.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Reserved JSON-RPC code: handler rejected its own parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Reserved JSON-RPC code: handler failed internally.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Builds an error with no structured `data`.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Builds an error carrying structured `data`.
    #[must_use]
    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Builds the `method_not_found` shape used for known-but-unsupported
    /// methods, carrying a `{ reason }` hint in `data` (e.g. a reverse call
    /// against a peer that never advertised the matching capability).
    #[must_use]
    pub fn method_not_found_with_reason(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_data(
            Self::METHOD_NOT_FOUND,
            message,
            serde_json::json!({ "reason": reason.into() }),
        )
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// The union of the three message shapes. Classification happens once, at
/// decode time; downstream code matches on this enum rather than probing
/// raw JSON.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// A request awaiting a response.
    Request(Request),
    /// A response to a previously issued request.
    Response(Response),
    /// A fire-and-forget notification.
    Notification(Notification),
}

impl Envelope {
    /// Wraps a [`Request`].
    #[must_use]
    pub fn request(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self::Request(Request {
            id,
            method: method.into(),
            params,
        })
    }

    /// Wraps a [`Notification`].
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::Notification(Notification {
            method: method.into(),
            params,
        })
    }
}

/// Intermediate shape used to apply the discrimination rule before picking
/// a concrete variant to deserialize into.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        match self {
            Self::Request(req) => {
                map.serialize_entry("id", &req.id)?;
                map.serialize_entry("method", &req.method)?;
                if let Some(params) = &req.params {
                    map.serialize_entry("params", params)?;
                }
            }
            Self::Response(resp) => {
                map.serialize_entry("id", &resp.id)?;
                if let Some(result) = &resp.result {
                    map.serialize_entry("result", result)?;
                }
                if let Some(error) = &resp.error {
                    map.serialize_entry("error", error)?;
                }
            }
            Self::Notification(notif) => {
                map.serialize_entry("method", &notif.method)?;
                if let Some(params) = &notif.params {
                    map.serialize_entry("params", params)?;
                }
            }
        }
        map.end()
    }
}

/// Classifies a decoded value into a request, response, or notification.
///
/// # Errors
///
/// Returns [`McpError::InvalidRequest`] when the shape matches none of the
/// three (e.g. an `id` with neither `method` nor `result`/`error`).
fn classify(raw: RawEnvelope) -> Result<Envelope, McpError> {
    match (raw.id, raw.method, raw.result, raw.error) {
        (Some(id), Some(method), _, _) => Ok(Envelope::Request(Request { id, method, params: raw.params })),
        (Some(id), None, result, error) if result.is_some() || error.is_some() => {
            Ok(Envelope::Response(Response { id, result, error }))
        }
        (None, Some(method), _, _) => Ok(Envelope::Notification(Notification { method, params: raw.params })),
        _ => Err(McpError::InvalidRequest("envelope matches no known shape".to_string())),
    }
}

/// Encodes an envelope to canonical JSON bytes.
///
/// # Errors
///
/// Returns [`McpError::Codec`] if serialization fails (practically
/// unreachable for well-formed envelopes, but payloads may contain
/// non-finite floats from an embedder).
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, McpError> {
    serde_json::to_vec(envelope).map_err(|err| McpError::Codec(err.to_string()))
}

/// Decodes bytes into a classified envelope.
///
/// # Errors
///
/// Returns [`McpError::ParseError`] for malformed JSON, or
/// [`McpError::InvalidRequest`] for well-formed JSON that matches none of
/// the three envelope shapes.
pub fn decode(bytes: &[u8]) -> Result<Envelope, McpError> {
    let raw: RawEnvelope =
        serde_json::from_slice(bytes).map_err(|err| McpError::ParseError(err.to_string()))?;
    classify(raw)
}

/// Decodes `raw` into a caller-chosen type, tolerating unknown fields for
/// forward compatibility. Used by the session layer to turn `params` or
/// `result` payloads into typed records on demand.
///
/// # Errors
///
/// Returns [`McpError::Codec`] when `raw` does not match `T`'s shape.
pub fn unmarshal<T>(raw: &Value) -> Result<T, McpError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(raw.clone()).map_err(|err| McpError::Codec(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_request() {
        let bytes = br#"{"jsonrpc":"2.0","id":"c-0","method":"initialize","params":{}}"#;
        match decode(bytes).unwrap() {
            Envelope::Request(req) => {
                assert_eq!(req.method, "initialize");
                assert_eq!(req.id, RequestId::Str("c-0".to_string()));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn classifies_response_with_result() {
        let bytes = br#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
        match decode(bytes).unwrap() {
            Envelope::Response(resp) => {
                assert_eq!(resp.id, RequestId::Int(1));
                assert!(resp.result.is_some());
                assert!(resp.error.is_none());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn classifies_response_with_error() {
        let bytes = br#"{"jsonrpc":"2.0","id":"s-3","error":{"code":-32601,"message":"nope"}}"#;
        match decode(bytes).unwrap() {
            Envelope::Response(resp) => {
                assert!(resp.error.is_some());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn classifies_notification() {
        let bytes = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        match decode(bytes).unwrap() {
            Envelope::Notification(notif) => assert_eq!(notif.method, "notifications/initialized"),
            other => panic!("expected notification, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unclassifiable_shape() {
        let bytes = br#"{"jsonrpc":"2.0"}"#;
        assert!(matches!(decode(bytes), Err(McpError::InvalidRequest(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let bytes = b"{not json";
        assert!(matches!(decode(bytes), Err(McpError::ParseError(_))));
    }

    #[test]
    fn encode_escapes_embedded_newlines() {
        let envelope = Envelope::Response(Response::success(
            RequestId::Str("r-1".to_string()),
            serde_json::json!({ "text": "line1\nline2" }),
        ));
        let bytes = encode(&envelope).unwrap();
        assert!(!bytes.contains(&b'\n'));
        assert!(!bytes.contains(&b'\r'));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("line1\\nline2"));
    }

    #[test]
    fn unmarshal_tolerates_unknown_fields() {
        #[derive(Deserialize)]
        struct Narrow {
            name: String,
        }
        let value = serde_json::json!({ "name": "demo", "extra": 1 });
        let narrow: Narrow = unmarshal(&value).unwrap();
        assert_eq!(narrow.name, "demo");
    }
}
