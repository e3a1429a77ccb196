//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(timer_handler))
        .route("/timer/start", post(timer_start_handler))
        .route("/timer/stop", post(timer_stop_handler))
        .route(
            "/logs",
            get(list_logs_handler)
                .post(add_log_handler)
                .delete(clear_logs_handler),
        )
        .route("/logs/:id", put(update_log_handler).delete(delete_log_handler))
        .route("/dashboard/week", get(week_handler))
        .route("/dashboard/month", get(month_handler))
        .route("/dashboard/heatmap", get(heatmap_handler))
        .route("/calendar/week", get(calendar_week_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
