use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

pub mod client_id;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod load_balancer;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod search;
pub mod state;
pub mod sweeper;

use handlers::{health_handler, metrics_handler, search_handler, search_method_not_allowed};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/search",
            post(search_handler).get(search_method_not_allowed),
        )
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
