use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod transport;

use http::handlers::{MESSAGES_PATH, STREAM_PATH};
use transport::{ProtocolServer, TransportRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TransportRegistry>,
    pub server: Arc<dyn ProtocolServer>,
}

impl AppState {
    pub fn new(registry: Arc<TransportRegistry>, server: Arc<dyn ProtocolServer>) -> Self {
        Self { registry, server }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(STREAM_PATH, get(http::handlers::open_stream))
        .route(MESSAGES_PATH, post(http::handlers::post_message))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
