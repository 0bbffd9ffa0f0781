use camera_ws_server::auth::JwtTokenValidator;
use camera_ws_server::controller::InMemoryMediaController;
use camera_ws_server::methods::{self, HandlerContext};
use camera_ws_server::middleware::Pipeline;
use camera_ws_server::rate_limit::RateLimiter;
use camera_ws_server::registry::MethodRegistry;
use camera_ws_server::{config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = config::load().expect("failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // The cryptographic token issuer and a production MediaController are out
    // of scope for this core (§1); these are the bundled reference
    // implementations a real deployment substitutes behind the same trait
    // objects.
    let jwt_secret = std::env::var("CAMERA_WS_JWT_SECRET").unwrap_or_else(|_| "camera-ws-control-plane-dev-secret".to_owned());
    let controller = Arc::new(InMemoryMediaController::new());
    let token_validator = Arc::new(JwtTokenValidator::new(jwt_secret.as_bytes()));

    let config = Arc::new(config);
    let ctx = Arc::new(HandlerContext {
        controller,
        token_validator,
        events: Arc::new(camera_ws_server::events::EventManager::new(config.event_queue_capacity)),
        metrics: Arc::new(camera_ws_server::metrics::Metrics::new()),
        connections: Arc::new(camera_ws_server::connection::ConnectionRegistry::new()),
        config: config.clone(),
    });

    let registry = MethodRegistry::new();
    methods::register_all(&registry, ctx.clone()).await;

    let pipeline = Pipeline::with_handler_deadline(
        registry,
        RateLimiter::new(config.rate_limit.window, config.rate_limit.max_requests),
        ctx.metrics.clone(),
        config.ping_requires_auth,
        config.handler_deadline,
    );

    let events = ctx.events.clone();
    let state = AppState::new(pipeline, ctx);
    let router = camera_ws_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %config.bind_addr, ws_path = %config.ws_path, "server listening");

    events.publish(rpc_protocol::Topic::SystemStartup.as_str(), serde_json::json!({})).await;

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    events.publish(rpc_protocol::Topic::SystemShutdown.as_str(), serde_json::json!({})).await;
    info!("server shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
