//! Two subscribers to the same topic each receive their own copy of a
//! notification published as a side effect of an RPC call from a third
//! connection.

mod common;

use common::{sign_token, start_server, RpcClient};
use rpc_protocol::Role;
use serde_json::json;

#[tokio::test]
async fn both_subscribers_receive_the_recording_started_notification() {
    let addr = start_server().await;

    let mut viewer_a = RpcClient::connect(addr, "/ws").await;
    viewer_a.call("authenticate", json!({"auth_token": sign_token(Role::Viewer)})).await;
    let subscribed_a = viewer_a.call("subscribe_events", json!({"topics": ["recording.started"]})).await;
    assert_eq!(subscribed_a["result"]["subscribed"], json!(["recording.started"]));

    let mut viewer_b = RpcClient::connect(addr, "/ws").await;
    viewer_b.call("authenticate", json!({"auth_token": sign_token(Role::Viewer)})).await;
    viewer_b.call("subscribe_events", json!({"topics": ["recording.started"]})).await;

    let mut operator = RpcClient::connect(addr, "/ws").await;
    operator.call("authenticate", json!({"auth_token": sign_token(Role::Operator)})).await;
    let started = operator.call("start_recording", json!({"device": "camera0"})).await;
    assert_eq!(started["result"]["status"], "RECORDING");

    let notification_a = viewer_a.recv_notification().await;
    assert_eq!(notification_a["method"], "recording.started");
    assert_eq!(notification_a["params"]["device"], "camera0");

    let notification_b = viewer_b.recv_notification().await;
    assert_eq!(notification_b["method"], "recording.started");
    assert_eq!(notification_b["params"]["device"], "camera0");

    viewer_a.close().await;
    viewer_b.close().await;
    operator.close().await;
}
