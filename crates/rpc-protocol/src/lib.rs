//! rpc-protocol: JSON-RPC 2.0 wire types and camera control-plane contracts.
//!
//! Request/response envelopes follow the JSON-RPC 2.0 specification with one
//! addition used throughout this codebase's WS surfaces: every response
//! carries an optional `metadata` object, and every error carries a
//! `suggestion` hint string alongside the standard `code`/`message`/`data`.

use serde::{Deserialize, Serialize};

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const AUTHENTICATION_REQUIRED: i64 = -32001;
    pub const RATE_LIMIT_EXCEEDED: i64 = -32002;
    pub const INSUFFICIENT_PERMISSIONS: i64 = -32003;
    pub const CAMERA_NOT_FOUND: i64 = -32010;
}

// ---------------------------------------------------------------------------
// Request id
// ---------------------------------------------------------------------------

/// A JSON-RPC request id. `Null` models an explicit `"id": null`, which this
/// protocol treats the same as a missing id: the request is a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

impl RequestId {
    pub fn is_notification(&self) -> bool {
        matches!(self, RequestId::Null)
    }
}

// ---------------------------------------------------------------------------
// Inbound request envelope
// ---------------------------------------------------------------------------

/// The raw shape accepted off the wire before envelope validation.
///
/// Deliberately permissive (`id`/`jsonrpc` are `Option`) so the codec can
/// distinguish "missing field" from "wrong type" and assign the correct
/// error code rather than failing generic JSON deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// A validated JSON-RPC request, ready for dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub id: RequestId,
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_notification()
    }
}

// ---------------------------------------------------------------------------
// Outbound response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: f64,
    pub server_timestamp: String,
    pub request_id: RequestId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl Response {
    pub fn success(id: RequestId, result: serde_json::Value, metadata: ResponseMetadata) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn failure(id: RequestId, error: ErrorBody, metadata: ResponseMetadata) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
            metadata: Some(metadata),
        }
    }

    /// A parse-error response has no valid request to correlate with, so the
    /// id is always the synthetic `null` and there is no processing-time
    /// metadata to report.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: RequestId::Null,
            result: None,
            error: Some(ErrorBody {
                code: error_codes::PARSE_ERROR,
                message: message.into(),
                data: None,
                suggestion: Some("Verify the request is well-formed JSON".to_owned()),
            }),
            metadata: None,
        }
    }
}

/// A server-initiated event notification: `{"jsonrpc":"2.0","method":topic,"params":payload}`.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: serde_json::Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Roles are totally ordered by privilege: `Viewer < Operator < Admin`.
/// Derived `Ord` relies on declaration order matching that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Operator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Operator => "operator",
            Role::Admin => "admin",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Viewer => &["view"],
            Role::Operator => &["view", "control"],
            Role::Admin => &["view", "control", "admin"],
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "viewer" => Some(Role::Viewer),
            "operator" => Some(Role::Operator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event topics
// ---------------------------------------------------------------------------

/// The closed set of topics this control plane publishes on. Subscriptions
/// to unknown topic strings are still accepted (forward compatibility) --
/// this enum is used by publishers internal to the server, not by the
/// subscribe_events parameter parser, which takes raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CameraConnected,
    CameraDisconnected,
    CameraStatusChange,
    RecordingStarted,
    RecordingStopped,
    StreamStarted,
    StreamStopped,
    SystemStartup,
    SystemShutdown,
    SystemHealth,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CameraConnected => "camera.connected",
            Topic::CameraDisconnected => "camera.disconnected",
            Topic::CameraStatusChange => "camera.status_change",
            Topic::RecordingStarted => "recording.started",
            Topic::RecordingStopped => "recording.stopped",
            Topic::StreamStarted => "stream.started",
            Topic::StreamStopped => "stream.stopped",
            Topic::SystemStartup => "system.startup",
            Topic::SystemShutdown => "system.shutdown",
            Topic::SystemHealth => "system.health",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Camera identifier syntax
// ---------------------------------------------------------------------------

/// Validates a camera identifier against the accepted syntaxes. Mapping an
/// identifier to a real device path is entirely the media controller's
/// responsibility; this function only checks shape.
pub fn validate_camera_identifier(id: &str) -> bool {
    is_numbered_camera(id)
        || is_prefixed_dotted_quad(id, "ip_camera_")
        || is_prefixed_dotted_quad(id, "http_camera_")
        || is_network_camera(id)
        || is_file_camera(id)
}

fn is_numbered_camera(id: &str) -> bool {
    id.strip_prefix("camera")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// `ip_camera_X_X_X_X` / `http_camera_X_X_X_X` -- four underscore-separated
/// octets after the prefix, each a valid u8.
fn is_prefixed_dotted_quad(id: &str, prefix: &str) -> bool {
    let Some(rest) = id.strip_prefix(prefix) else {
        return false;
    };
    let parts: Vec<&str> = rest.split('_').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok())
}

/// `network_camera_X_X_X_X_X` -- five underscore-separated segments, each
/// numeric (the extra segment over the IP-style cameras models a port or
/// channel index; the controller interprets it).
fn is_network_camera(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("network_camera_") else {
        return false;
    };
    let parts: Vec<&str> = rest.split('_').collect();
    parts.len() == 5 && parts.iter().all(|p| !p.is_empty() && p.parse::<u32>().is_ok())
}

/// `file_camera_<alnum_>` -- prefix followed by one or more alphanumeric or
/// underscore characters.
fn is_file_camera(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("file_camera_") else {
        return false;
    };
    !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
