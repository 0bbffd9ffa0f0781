//! Application state (§4.B): the axum `State` extractor target shared by
//! every WebSocket connection. Wraps the dispatch pipeline and the handler
//! collaborators behind `Arc` so cloning it per-connection is cheap.

use crate::methods::HandlerContext;
use crate::middleware::Pipeline;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub ctx: Arc<HandlerContext>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, ctx: Arc<HandlerContext>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            ctx,
        }
    }
}
