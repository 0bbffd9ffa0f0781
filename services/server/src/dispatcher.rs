//! Per-connection dispatch (§4.E): parse one inbound frame, validate the
//! envelope, run it through the pipeline, and produce the reply frame (or
//! nothing, for a notification). The WebSocket read loop in `ws.rs` calls
//! `dispatch_frame` once per inbound text frame; this module has no
//! knowledge of the socket itself.

use crate::connection::ClientRecord;
use crate::error;
use crate::middleware::Pipeline;
use chrono::Utc;
use rpc_protocol::{RawRequest, Request, RequestId, Response, ResponseMetadata};
use std::sync::Arc;

/// Parses and dispatches one inbound text frame. Returns `Some(Response)`
/// for requests (always exactly one, per §3's global invariant); returns
/// `None` for notifications, which never produce a response even on error.
pub async fn dispatch_frame(text: &str, pipeline: &Pipeline, client: &Arc<ClientRecord>) -> Option<Response> {
    let raw: RawRequest = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => return Some(Response::parse_error(e.to_string())),
    };

    let request = match validate_envelope(raw) {
        Ok(request) => request,
        Err((id, message)) => {
            return Some(Response::failure(
                id.clone(),
                error::invalid_request(message),
                ResponseMetadata {
                    processing_time_ms: 0.0,
                    server_timestamp: Utc::now().to_rfc3339(),
                    request_id: id,
                },
            ))
        }
    };

    client.touch().await;
    let is_notification = request.is_notification();
    let params = request.params.unwrap_or(serde_json::Value::Null);

    let (result, duration) = pipeline.dispatch(&request.method, params, client).await;

    if is_notification {
        if let Err(err) = result {
            tracing::warn!(method = %request.method, error = %err.message, "notification handler failed");
        }
        return None;
    }

    let metadata = ResponseMetadata {
        processing_time_ms: duration.as_secs_f64() * 1000.0,
        server_timestamp: Utc::now().to_rfc3339(),
        request_id: request.id.clone(),
    };
    Some(match result {
        Ok(value) => Response::success(request.id, value, metadata),
        Err(body) => Response::failure(request.id, body, metadata),
    })
}

/// Validates the envelope fields the codec is responsible for (§4.A):
/// `jsonrpc` must be exactly `"2.0"`, `method` must be a non-empty string.
/// `id` absent or explicit `null` means notification; string/number ids
/// name a request.
fn validate_envelope(raw: RawRequest) -> Result<Request, (RequestId, String)> {
    let id = raw.id.clone().unwrap_or(RequestId::Null);

    match raw.jsonrpc.as_deref() {
        Some("2.0") => {}
        Some(other) => return Err((id, format!("unsupported jsonrpc version '{other}'"))),
        None => return Err((id, "missing 'jsonrpc' field".to_owned())),
    }

    let method = match raw.method {
        Some(m) if !m.is_empty() => m,
        Some(_) => return Err((id, "'method' must not be empty".to_owned())),
        None => return Err((id, "missing 'method' field".to_owned())),
    };

    Ok(Request {
        method,
        id,
        params: raw.params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionRegistry;
    use crate::metrics::Metrics;
    use crate::rate_limit::RateLimiter;
    use crate::registry::{Handler, MethodRegistry};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    struct PongHandler;

    #[async_trait]
    impl Handler for PongHandler {
        async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, crate::error::RpcError> {
            Ok(Value::String("pong".to_owned()))
        }
    }

    async fn test_pipeline() -> (Pipeline, Arc<ClientRecord>) {
        let registry = MethodRegistry::new();
        registry.register("ping", "1.0", Arc::new(PongHandler)).await;
        let pipeline = Pipeline::new(registry, RateLimiter::new(Duration::from_secs(1), 100), Arc::new(Metrics::new()), false);
        let conn_registry = ConnectionRegistry::new();
        let client = conn_registry.register("client-1".to_owned(), "127.0.0.1:1".to_owned()).await;
        (pipeline, client)
    }

    #[tokio::test]
    async fn malformed_json_yields_parse_error_with_null_id() {
        let (pipeline, client) = test_pipeline().await;
        let response = dispatch_frame("not json at all", &pipeline, &client).await.unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, rpc_protocol::error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn missing_jsonrpc_field_is_invalid_request() {
        let (pipeline, client) = test_pipeline().await;
        let frame = r#"{"method":"ping","id":1}"#;
        let response = dispatch_frame(frame, &pipeline, &client).await.unwrap();
        assert_eq!(response.error.unwrap().code, rpc_protocol::error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn valid_request_round_trips_with_matching_id() {
        let (pipeline, client) = test_pipeline().await;
        let frame = r#"{"jsonrpc":"2.0","method":"ping","id":"abc"}"#;
        let response = dispatch_frame(frame, &pipeline, &client).await.unwrap();
        assert_eq!(response.id, RequestId::String("abc".to_owned()));
        assert_eq!(response.result.unwrap(), Value::String("pong".to_owned()));
        assert!(response.metadata.is_some());
    }

    #[tokio::test]
    async fn notification_with_null_id_produces_no_response() {
        let (pipeline, client) = test_pipeline().await;
        let frame = r#"{"jsonrpc":"2.0","method":"ping","id":null}"#;
        let response = dispatch_frame(frame, &pipeline, &client).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn notification_without_id_field_produces_no_response() {
        let (pipeline, client) = test_pipeline().await;
        let frame = r#"{"jsonrpc":"2.0","method":"ping"}"#;
        let response = dispatch_frame(frame, &pipeline, &client).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn unknown_method_still_produces_a_response_for_a_request() {
        let (pipeline, client) = test_pipeline().await;
        let frame = r#"{"jsonrpc":"2.0","method":"does_not_exist","id":5}"#;
        let response = dispatch_frame(frame, &pipeline, &client).await.unwrap();
        assert_eq!(response.error.unwrap().code, rpc_protocol::error_codes::METHOD_NOT_FOUND);
    }
}
