//! Method implementations (§4.H): ~30 registered JSON-RPC handlers. Each
//! submodule groups a related set of methods the way the teacher's
//! `http/` resource modules are split (`races.rs`, `admin.rs`,
//! `forwarder_config.rs`); every handler here implements
//! [`crate::registry::Handler`] instead of an axum extractor signature,
//! since the transport is the WebSocket dispatcher, not HTTP routing.

mod cameras;
mod files;
mod recording;
mod subscriptions;
mod system;

use crate::auth::TokenValidator;
use crate::config::ServerConfig;
use crate::connection::ConnectionRegistry;
use crate::controller::MediaController;
use crate::error::RpcError;
use crate::events::EventManager;
use crate::metrics::Metrics;
use crate::registry::{MethodRegistry, ReservedHandler};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Shared collaborators every handler needs a subset of. Handlers hold an
/// `Arc<HandlerContext>` rather than individual fields so registering thirty
/// methods doesn't thirty-way duplicate the same five `Arc::clone` calls.
pub struct HandlerContext {
    pub controller: Arc<dyn MediaController>,
    pub token_validator: Arc<dyn TokenValidator>,
    pub events: Arc<EventManager>,
    pub metrics: Arc<Metrics>,
    pub connections: Arc<ConnectionRegistry>,
    pub config: Arc<ServerConfig>,
}

/// Deserializes `params` into `T`, treating a missing/null params object as
/// an empty one so methods with all-optional fields don't require callers
/// to send `"params": {}` explicitly.
pub fn parse_params<T: DeserializeOwned + Default>(params: Value) -> Result<T, RpcError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

/// Registers every built-in method (§4.C) against `registry`. Called once
/// at startup before the router starts accepting connections.
pub async fn register_all(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    system::register(registry, ctx.clone()).await;
    cameras::register(registry, ctx.clone()).await;
    recording::register(registry, ctx.clone()).await;
    files::register(registry, ctx.clone()).await;
    subscriptions::register(registry, ctx).await;

    for name in ["camera_status_update", "recording_status_update"] {
        registry
            .register(name, "1.0", Arc::new(ReservedHandler { name: name.to_owned() }))
            .await;
    }
}
