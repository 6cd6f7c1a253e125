use crate::core::pipeline::Pipeline;
use crate::server::handler::{cryptos, welcome};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api", get(welcome))
        .route("/api/cryptos", get(cryptos))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}
