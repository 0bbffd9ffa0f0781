//! The middleware pipeline (§4.D): the ordered gates wrapped around every
//! registered handler. A single `Pipeline` struct owns the gate order rather
//! than composing `Handler` instances into `Handler`, which keeps ordering
//! explicit and makes the one documented deviation from §4.D's literal
//! ordering (see `dispatch` below) visible in one place.

use crate::connection::ClientRecord;
use crate::error::{self, RpcError};
use crate::metrics::Metrics;
use crate::permissions;
use crate::rate_limit::RateLimiter;
use crate::registry::MethodRegistry;
use rpc_protocol::ErrorBody;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct Pipeline {
    registry: MethodRegistry,
    rate_limiter: RateLimiter,
    metrics: Arc<Metrics>,
    ping_requires_auth: bool,
    handler_deadline: Duration,
}

impl Pipeline {
    pub fn new(
        registry: MethodRegistry,
        rate_limiter: RateLimiter,
        metrics: Arc<Metrics>,
        ping_requires_auth: bool,
    ) -> Self {
        Self::with_handler_deadline(registry, rate_limiter, metrics, ping_requires_auth, Duration::from_secs(10))
    }

    /// Same as [`Pipeline::new`] but with an explicit handler deadline (§5
    /// timeouts) instead of the 10-second fallback used by callers that don't
    /// thread a `ServerConfig` through.
    pub fn with_handler_deadline(
        registry: MethodRegistry,
        rate_limiter: RateLimiter,
        metrics: Arc<Metrics>,
        ping_requires_auth: bool,
        handler_deadline: Duration,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            metrics,
            ping_requires_auth,
            handler_deadline,
        }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Runs the full gate sequence for one request and returns the result
    /// alongside how long the call took (handler time only; the gates
    /// themselves are cheap and not separately timed).
    ///
    /// §4.D lists the order rate-limit -> permission -> auth-required, but
    /// §8's testable invariant requires every auth-required method to answer
    /// `AUTHENTICATION_REQUIRED` for an unauthenticated caller regardless of
    /// role. Evaluating permission first would instead yield
    /// `INSUFFICIENT_PERMISSIONS` for an unauthenticated client calling a
    /// role-gated method (role `None` never meets any minimum). This
    /// implementation checks authentication before permission so the
    /// invariant holds; the outward gate order (rate limit, then
    /// auth/permission, then logging/metrics/shape) is otherwise unchanged.
    pub async fn dispatch(&self, method: &str, params: Value, client: &std::sync::Arc<ClientRecord>) -> (Result<Value, ErrorBody>, Duration) {
        let start = Instant::now();

        if !self.rate_limiter.check_and_record(&client.client_id) {
            warn!(client_id = %client.client_id, method, "rate limit exceeded");
            return (Err(error::rate_limit_exceeded()), start.elapsed());
        }

        let Some(handler) = self.registry.lookup(method).await else {
            return (Err(error::method_not_found(method)), start.elapsed());
        };

        if permissions::requires_auth(method, self.ping_requires_auth) && !client.is_authenticated().await {
            warn!(client_id = %client.client_id, method, "authentication required");
            let duration = start.elapsed();
            self.metrics.record_request(method, duration.as_secs_f64() * 1000.0, true);
            return (Err(error::authentication_required()), duration);
        }

        if let Some(minimum) = permissions::minimum_role(method) {
            let role = client.role().await;
            if role.map_or(true, |r| r < minimum) {
                warn!(client_id = %client.client_id, method, required = minimum.as_str(), "insufficient permissions");
                let duration = start.elapsed();
                self.metrics.record_request(method, duration.as_secs_f64() * 1000.0, true);
                return (Err(error::insufficient_permissions(minimum.as_str())), duration);
            }
        }

        let result = match tokio::time::timeout(self.handler_deadline, handler.invoke(params, client)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Internal(format!("handler for '{method}' exceeded its deadline"))),
        };
        let duration = start.elapsed();
        let duration_ms = duration.as_secs_f64() * 1000.0;

        match &result {
            Ok(value) => {
                info!(client_id = %client.client_id, method, duration_ms, "call succeeded");
                self.metrics.record_request(method, duration_ms, false);
                assert_response_shape(method, value);
            }
            Err(err) => {
                warn!(client_id = %client.client_id, method, duration_ms, error = %err, "call failed");
                self.metrics.record_request(method, duration_ms, true);
            }
        }

        (result.map_err(RpcError::into_body), duration)
    }
}

/// Dev-only response-shape assertion (§4.D.6): logs a warning if a
/// documented top-level field is missing. Never alters or fails the
/// response.
fn assert_response_shape(method: &str, value: &Value) {
    let required = permissions::required_result_fields(method);
    if required.is_empty() {
        return;
    }
    let Some(object) = value.as_object() else {
        warn!(method, "response-shape assertion: result is not an object");
        return;
    };
    for field in required {
        if !object.contains_key(*field) {
            warn!(method, field, "response-shape assertion: missing documented field");
        }
    }
}
