//! A fresh connection can call `ping` before authenticating, is turned away
//! from a role-gated method until it authenticates, and gains access once
//! `authenticate` elevates its role.

mod common;

use common::{sign_token, start_server, RpcClient};
use rpc_protocol::Role;
use serde_json::json;

#[tokio::test]
async fn unauthenticated_ping_then_authenticate_then_viewer_method() {
    let addr = start_server().await;
    let mut client = RpcClient::connect(addr, "/ws").await;

    let pong = client.call("ping", json!(null)).await;
    assert_eq!(pong["result"], "pong");

    let denied = client.call("get_camera_list", json!(null)).await;
    assert_eq!(denied["error"]["code"], rpc_protocol::error_codes::AUTHENTICATION_REQUIRED);

    let token = sign_token(Role::Viewer);
    let auth = client.call("authenticate", json!({"auth_token": token})).await;
    assert_eq!(auth["result"]["authenticated"], true);
    assert_eq!(auth["result"]["role"], "viewer");

    let cameras = client.call("get_camera_list", json!(null)).await;
    assert_eq!(cameras["result"]["total"], 2);
    assert_eq!(cameras["result"]["connected"], 2);

    client.close().await;
}
