//! Self-contained system methods (§4.H): `ping`, `authenticate`,
//! `get_metrics`, `get_status`, `get_server_info`. Unlike the other
//! submodules these don't delegate to the `MediaController`; they read the
//! shared collaborators directly.

use super::{parse_params, HandlerContext};
use crate::connection::ClientRecord;
use crate::error::RpcError;
use crate::registry::{Handler, MethodRegistry};
use crate::thresholds;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn register(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    registry.register("ping", "1.0", Arc::new(Ping)).await;
    registry.register("authenticate", "1.0", Arc::new(Authenticate { ctx: ctx.clone() })).await;
    registry.register("get_metrics", "1.0", Arc::new(GetMetrics { ctx: ctx.clone() })).await;
    registry.register("get_status", "1.0", Arc::new(GetStatus { ctx: ctx.clone() })).await;
    registry.register("get_server_info", "1.0", Arc::new(GetServerInfo { ctx })).await;
}

struct Ping;

#[async_trait]
impl Handler for Ping {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        Ok(Value::String("pong".to_owned()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct AuthenticateParams {
    #[serde(default)]
    auth_token: String,
}

struct Authenticate {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for Authenticate {
    async fn invoke(&self, params: Value, client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: AuthenticateParams = parse_params(params)?;
        if params.auth_token.is_empty() {
            return Err(RpcError::InvalidParams("'auth_token' is required".to_owned()));
        }
        let claims = self
            .ctx
            .token_validator
            .validate_token(&params.auth_token)
            .await
            .map_err(|e| RpcError::AuthenticationRequired(e.to_string()))?;

        client.authenticate(claims.user_id, claims.role, "jwt").await;
        Ok(json!({
            "authenticated": true,
            "role": claims.role.as_str(),
            "permissions": claims.role.permissions(),
            "expires_at": claims.expires_at.to_rfc3339(),
            "session_id": client.client_id,
        }))
    }
}

struct GetMetrics {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetMetrics {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let snapshot = self.ctx.metrics.snapshot();
        let memory_percent = read_memory_percent();
        thresholds::check_performance(&self.ctx.events, &self.ctx.metrics, &self.ctx.config.performance_thresholds, &snapshot, memory_percent).await;
        Ok(json!({
            "total_requests": snapshot.total_requests,
            "total_errors": snapshot.total_errors,
            "active_connections": snapshot.active_connections,
            "events_dropped": snapshot.events_dropped,
            "error_rate_percent": snapshot.error_rate_percent,
            "avg_response_time_ms": snapshot.avg_response_time_ms,
            "per_method": snapshot.per_method,
            "memory_percent": memory_percent,
        }))
    }
}

struct GetStatus {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetStatus {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let health = self.ctx.controller.health().await?;
        Ok(json!({
            "status": health.status,
            "uptime_secs": health.uptime_secs,
            "active_connections": self.ctx.connections.count().await,
        }))
    }
}

struct GetServerInfo {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetServerInfo {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        Ok(json!({
            "name": "camera-ws-control-plane",
            "version": env!("CARGO_PKG_VERSION"),
            "ws_path": self.ctx.config.ws_path,
            "ping_requires_auth": self.ctx.config.ping_requires_auth,
        }))
    }
}

/// Best-effort resident-memory-vs-total-memory reading for the performance
/// threshold check (§4.G). No crate pulled in solely for this -- `/proc` is
/// parsed directly on Linux; any other platform or parse failure reports
/// `0.0` rather than failing the call.
#[cfg(target_os = "linux")]
fn read_memory_percent() -> f64 {
    fn field(contents: &str, key: &str) -> Option<u64> {
        contents
            .lines()
            .find(|line| line.starts_with(key))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|v| v.parse().ok())
    }

    let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
        return 0.0;
    };
    let (Some(total_kb), Some(available_kb)) = (field(&meminfo, "MemTotal:"), field(&meminfo, "MemAvailable:")) else {
        return 0.0;
    };
    if total_kb == 0 {
        return 0.0;
    }
    let used_kb = total_kb.saturating_sub(available_kb);
    (used_kb as f64 / total_kb as f64) * 100.0
}

#[cfg(not(target_os = "linux"))]
fn read_memory_percent() -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_context;
    use super::*;
    use crate::connection::ConnectionRegistry;
    use crate::registry::MethodRegistry;
    use chrono::{Duration as ChronoDuration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use rpc_protocol::Role;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        role: String,
        exp: i64,
    }

    fn token(role: Role) -> String {
        let claims = Claims {
            sub: "user-1".to_owned(),
            role: role.as_str().to_owned(),
            exp: (Utc::now() + ChronoDuration::hours(1)).timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
    }

    async fn client() -> Arc<ClientRecord> {
        ConnectionRegistry::new().register("c1".to_owned(), "127.0.0.1:1".to_owned()).await
    }

    #[tokio::test]
    async fn ping_returns_the_literal_pong_string() {
        let registry = MethodRegistry::new();
        register(&registry, test_context()).await;
        let result = registry.lookup("ping").await.unwrap().invoke(Value::Null, &client().await).await.unwrap();
        assert_eq!(result, Value::String("pong".to_owned()));
    }

    #[tokio::test]
    async fn authenticate_with_a_valid_token_sets_client_role_and_returns_documented_shape() {
        let registry = MethodRegistry::new();
        register(&registry, test_context()).await;
        let c = client().await;
        let result = registry
            .lookup("authenticate")
            .await
            .unwrap()
            .invoke(json!({"auth_token": token(Role::Viewer)}), &c)
            .await
            .unwrap();
        assert_eq!(result["authenticated"], true);
        assert_eq!(result["role"], "viewer");
        assert_eq!(result["session_id"], c.client_id);
        assert!(c.is_authenticated().await);
        assert_eq!(c.role().await, Some(Role::Viewer));
    }

    #[tokio::test]
    async fn authenticate_with_a_malformed_token_is_authentication_required() {
        let registry = MethodRegistry::new();
        register(&registry, test_context()).await;
        let err = registry
            .lookup("authenticate")
            .await
            .unwrap()
            .invoke(json!({"auth_token": "not-a-jwt"}), &client().await)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::AuthenticationRequired(_)));
    }

    #[tokio::test]
    async fn get_status_reports_health_and_connection_count() {
        let registry = MethodRegistry::new();
        register(&registry, test_context()).await;
        let result = registry.lookup("get_status").await.unwrap().invoke(Value::Null, &client().await).await.unwrap();
        assert_eq!(result["status"], "healthy");
    }

    #[tokio::test]
    async fn get_server_info_reports_the_configured_ws_path() {
        let registry = MethodRegistry::new();
        register(&registry, test_context()).await;
        let result = registry.lookup("get_server_info").await.unwrap().invoke(Value::Null, &client().await).await.unwrap();
        assert_eq!(result["ws_path"], "/ws");
    }

    #[tokio::test]
    async fn get_metrics_reports_request_counters() {
        let ctx = test_context();
        ctx.metrics.record_request("ping", 1.0, false);
        let registry = MethodRegistry::new();
        register(&registry, ctx).await;
        let result = registry.lookup("get_metrics").await.unwrap().invoke(Value::Null, &client().await).await.unwrap();
        assert_eq!(result["total_requests"], 1);
    }
}
