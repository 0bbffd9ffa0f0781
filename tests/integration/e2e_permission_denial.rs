//! An admin-only method answers `AUTHENTICATION_REQUIRED` for an
//! unauthenticated caller, `INSUFFICIENT_PERMISSIONS` for an authenticated
//! viewer, and succeeds for an authenticated admin.

mod common;

use common::{sign_token, start_server, RpcClient};
use rpc_protocol::Role;
use serde_json::json;

#[tokio::test]
async fn admin_only_method_is_gated_by_authentication_then_role() {
    let addr = start_server().await;

    let mut anonymous = RpcClient::connect(addr, "/ws").await;
    let denied = anonymous.call("get_metrics", json!(null)).await;
    assert_eq!(denied["error"]["code"], rpc_protocol::error_codes::AUTHENTICATION_REQUIRED);
    anonymous.close().await;

    let mut viewer = RpcClient::connect(addr, "/ws").await;
    let viewer_token = sign_token(Role::Viewer);
    viewer.call("authenticate", json!({"auth_token": viewer_token})).await;
    let insufficient = viewer.call("get_metrics", json!(null)).await;
    assert_eq!(insufficient["error"]["code"], rpc_protocol::error_codes::INSUFFICIENT_PERMISSIONS);
    viewer.close().await;

    let mut admin = RpcClient::connect(addr, "/ws").await;
    let admin_token = sign_token(Role::Admin);
    admin.call("authenticate", json!({"auth_token": admin_token})).await;
    let allowed = admin.call("get_metrics", json!(null)).await;
    assert!(allowed.get("error").is_none(), "admin should reach the handler: {allowed:?}");
    assert!(allowed["result"]["total_requests"].is_u64());
    admin.close().await;
}
