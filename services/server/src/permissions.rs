//! Static per-method policy tables consulted by the middleware pipeline
//! (§4.D): minimum role, whether authentication is required, and the
//! documented result fields the response-shape assertion checks for.

use rpc_protocol::Role;

/// Minimum role required to invoke `method`. `None` means no role is
/// required (but authentication may still be, per [`requires_auth`]).
pub fn minimum_role(method: &str) -> Option<Role> {
    match method {
        "get_metrics" | "set_retention_policy" | "cleanup_old_files" | "delete_recording"
        | "delete_snapshot" => Some(Role::Admin),

        "take_snapshot" | "start_recording" | "stop_recording" | "start_streaming"
        | "stop_streaming" => Some(Role::Operator),

        "ping" | "authenticate" | "get_subscription_stats" => None,

        // Reserved server-to-client notification names (§4.E): never
        // dispatched as a request, but must still reach the terminal
        // `method_not_found` handler rather than being turned away by a
        // role check first.
        "camera_status_update" | "recording_status_update" => None,

        _ => Some(Role::Viewer),
    }
}

/// Whether `method` requires the caller to be authenticated at all,
/// independent of role. `ping_requires_auth` plugs in the configurable
/// open question from §9.
pub fn requires_auth(method: &str, ping_requires_auth: bool) -> bool {
    match method {
        "authenticate" => false,
        "ping" => ping_requires_auth,
        "get_subscription_stats" => false,
        "camera_status_update" | "recording_status_update" => false,
        _ => true,
    }
}

/// Documented top-level result fields for the response-shape assertion
/// (§6). Dev-only: a missing field is logged, never surfaced to the client.
pub fn required_result_fields(method: &str) -> &'static [&'static str] {
    match method {
        "get_camera_status" => &["device", "status", "name", "resolution", "fps", "streams", "metrics"],
        "get_camera_list" => &["cameras", "total", "connected"],
        "get_stream_url" => &["device", "stream_name", "stream_url", "available"],
        "get_stream_status" => &["device", "stream_name", "status", "ready"],
        "take_snapshot" => &["device", "filename", "status", "timestamp", "file_size"],
        "start_recording" => &["device", "session_id", "filename", "status", "start_time", "duration", "format"],
        "stop_recording" => &["session_id", "device", "status"],
        "start_streaming" => &["device", "stream_name", "stream_url", "status", "start_time"],
        "stop_streaming" => &["device", "stream_name", "status", "end_time", "duration"],
        "list_recordings" | "list_snapshots" => &["files", "total", "limit", "offset"],
        "get_storage_info" => &[
            "total_space",
            "used_space",
            "available_space",
            "usage_percentage",
            "recordings_size",
            "snapshots_size",
            "low_space_warning",
        ],
        _ => &[],
    }
}
