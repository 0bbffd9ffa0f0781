//! Closing a connection unregisters it from the connection registry so the
//! active connection count reported to other clients drops accordingly.

mod common;

use common::{sign_token, start_server, RpcClient};
use rpc_protocol::Role;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn disconnecting_a_client_decrements_active_connections() {
    let addr = start_server().await;

    let mut watcher = RpcClient::connect(addr, "/ws").await;
    watcher.call("authenticate", json!({"auth_token": sign_token(Role::Viewer)})).await;

    let mut transient = RpcClient::connect(addr, "/ws").await;
    transient.call("authenticate", json!({"auth_token": sign_token(Role::Viewer)})).await;

    let before = watcher.call("get_status", json!(null)).await;
    let count_before = before["result"]["active_connections"].as_u64().unwrap();
    assert!(count_before >= 2);

    transient.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = watcher.call("get_status", json!(null)).await;
    let count_after = after["result"]["active_connections"].as_u64().unwrap();
    assert_eq!(count_after, count_before - 1);

    watcher.close().await;
}
