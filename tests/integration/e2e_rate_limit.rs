//! A client that exceeds the configured request rate gets
//! `RATE_LIMIT_EXCEEDED` instead of the method running.

mod common;

use camera_ws_server::config::{RateLimitConfig, ServerConfig};
use common::{start_server_with_config, RpcClient};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn bursting_past_the_window_limit_yields_rate_limit_exceeded() {
    let mut config = ServerConfig::default();
    config.rate_limit = RateLimitConfig {
        window: Duration::from_secs(2),
        max_requests: 3,
    };
    let addr = start_server_with_config(config).await;
    let mut client = RpcClient::connect(addr, "/ws").await;

    let mut saw_rate_limit = false;
    for _ in 0..10 {
        let response = client.call("ping", json!(null)).await;
        if response.get("error").map(|e| e["code"]) == Some(json!(rpc_protocol::error_codes::RATE_LIMIT_EXCEEDED)) {
            saw_rate_limit = true;
            break;
        }
    }

    assert!(saw_rate_limit, "expected at least one call to be rejected by the rate limiter");
    client.close().await;
}
