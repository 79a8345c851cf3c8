pub mod webhook_handler;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::app_state::AppState;
use webhook_handler::{method_not_allowed, webhook_handler};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/webhook",
            post(webhook_handler).fallback(method_not_allowed),
        )
        .route("/", get(|| async { "Template repo configurator" }))
        .with_state(state)
}
