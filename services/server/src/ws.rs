//! The WebSocket upgrade handler (§4.B): mints a client record, wires it
//! into the connection registry and the event bus, then runs the read loop
//! and write pump side by side in one `tokio::select!` for the life of the
//! connection. Grounded in the teacher's `ws_forwarder` handler (upgrade ->
//! `on_upgrade` -> per-session loop combining a timed `socket.recv()` with a
//! heartbeat tick), generalized here to also drain a per-client event queue
//! instead of a single command channel.
//!
//! Unlike the teacher's forwarder socket, which requires a bearer token at
//! upgrade time, this control plane's upgrade is anonymous: a client
//! connects, then elevates its role in-band by calling the `authenticate`
//! method like any other RPC call. Gating happens entirely in the
//! middleware pipeline, not at the transport boundary.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use rpc_protocol::Notification;
use std::net::SocketAddr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote_addr))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, remote_addr: SocketAddr) {
    let client_id = Uuid::new_v4().simple().to_string();
    let client = state.ctx.connections.register(client_id.clone(), remote_addr.to_string()).await;
    let events = state.ctx.events.register_client(&client_id).await;
    state.ctx.metrics.connection_opened();
    info!(client_id = %client_id, remote = %remote_addr, "client connected");

    let config = &state.ctx.config;
    let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = tokio::time::timeout(config.read_deadline, socket.recv()) => {
                match frame {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        if let Some(response) = crate::dispatcher::dispatch_frame(&text, &state.pipeline, &client).await {
                            let Ok(json) = serde_json::to_string(&response) else { continue };
                            if send_with_deadline(&mut socket, json, config.write_deadline).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Some(Ok(Message::Ping(data)))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                        info!(client_id = %client_id, "client disconnected");
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(e))) => {
                        warn!(client_id = %client_id, error = %e, "websocket error");
                        break;
                    }
                    Err(_) => {
                        warn!(client_id = %client_id, "read deadline exceeded, closing connection");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                let notification = Notification::new(event.topic.clone(), event.payload_with_timestamp());
                let Ok(json) = serde_json::to_string(&notification) else { continue };
                if send_with_deadline(&mut socket, json, config.write_deadline).await.is_err() {
                    break;
                }
            }
        }
    }

    state.ctx.connections.unregister(&client_id).await;
    state.ctx.events.remove_client(&client_id).await;
    state.pipeline.rate_limiter().remove_client(&client_id);
    state.ctx.metrics.connection_closed();
    info!(client_id = %client_id, "connection cleaned up");
}

async fn send_with_deadline(socket: &mut WebSocket, text: String, deadline: std::time::Duration) -> Result<(), ()> {
    match tokio::time::timeout(deadline, socket.send(Message::Text(text.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) | Err(_) => Err(()),
    }
}
