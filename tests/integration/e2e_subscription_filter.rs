//! A subscription filter restricts delivery to events whose payload matches
//! every filter key exactly; a non-matching publish never reaches the
//! client's queue.

mod common;

use common::{sign_token, start_server, RpcClient};
use rpc_protocol::Role;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn filtered_subscription_only_sees_the_matching_device() {
    let addr = start_server().await;

    let mut viewer = RpcClient::connect(addr, "/ws").await;
    viewer.call("authenticate", json!({"auth_token": sign_token(Role::Viewer)})).await;
    viewer
        .call(
            "subscribe_events",
            json!({"topics": ["recording.started"], "filter": {"device": "camera1"}}),
        )
        .await;

    let mut operator = RpcClient::connect(addr, "/ws").await;
    operator.call("authenticate", json!({"auth_token": sign_token(Role::Operator)})).await;

    let non_matching = operator.call("start_recording", json!({"device": "camera0"})).await;
    assert_eq!(non_matching["result"]["status"], "RECORDING");

    let nothing_yet = tokio::time::timeout(Duration::from_millis(150), viewer.recv_notification()).await;
    assert!(nothing_yet.is_err(), "a non-matching publish must not be delivered");

    let matching = operator.call("start_recording", json!({"device": "camera1"})).await;
    assert_eq!(matching["result"]["status"], "RECORDING");

    let notification = viewer.recv_notification().await;
    assert_eq!(notification["method"], "recording.started");
    assert_eq!(notification["params"]["device"], "camera1");

    viewer.close().await;
    operator.close().await;
}
