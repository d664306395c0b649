//! HTTP API module
//! 
//! The command surface, the host endpoints that feed tab and notification
//! events into the engine, and their response structures.

pub mod commands;
pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/command", post(command_handler))
        .route("/tabs", get(list_tabs_handler).post(open_tab_handler))
        .route("/tabs/:tab_id", delete(remove_tab_handler))
        .route("/notifications", get(notifications_handler))
        .route(
            "/notifications/:notification_id/buttons/:button_index",
            post(notification_button_handler),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
