// src/api/mod.rs

pub mod error;
pub mod handler;

pub use error::ApiError;

use crate::models::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/projects",
            post(handler::create_project).get(handler::list_projects),
        )
        .route("/projects/{project_id}", delete(handler::delete_project))
        .route("/projects/{project_id}/status", get(handler::project_status))
        .route("/projects/{project_id}/snapshots", post(handler::push_snapshot))
        .route("/projects/{project_id}/results", get(handler::project_results))
        .route("/projects/{project_id}/export", get(handler::export_report))
        .route("/projects/{project_id}/cancel", post(handler::cancel_project))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
