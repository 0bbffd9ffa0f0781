pub mod auth;
pub mod config;
pub mod connection;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod methods;
pub mod metrics;
pub mod middleware;
pub mod permissions;
pub mod rate_limit;
pub mod registry;
pub mod state;
pub mod thresholds;
pub mod ws;

pub use state::AppState;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Assembles the router (§4.J): the WebSocket upgrade endpoint at
/// `state.ctx.config.ws_path`, plus the `/healthz`/`/readyz` operational
/// surface every service in this codebase family carries regardless of
/// feature non-goals. No browsable HTTP API beyond that (Non-goal, §1).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(&state.ctx.config.ws_path, get(ws::ws_handler))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

mod health {
    use axum::response::IntoResponse;
    pub async fn healthz() -> impl IntoResponse {
        "ok"
    }
    pub async fn readyz() -> impl IntoResponse {
        "ok"
    }
}
