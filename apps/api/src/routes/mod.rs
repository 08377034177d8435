pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::catalog::handlers as catalog;
use crate::deploy::handlers as deploy;
use crate::generation::handlers as sites;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Largest accepted request body (resume uploads).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resumes
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload).get(resumes::handle_list),
        )
        .route(
            "/api/v1/resumes/:id",
            axum::routing::delete(resumes::handle_delete),
        )
        // Template catalog
        .route(
            "/api/v1/templates",
            get(catalog::handle_list).post(catalog::handle_create),
        )
        .route("/api/v1/templates/:id", patch(catalog::handle_update))
        // Generated sites
        .route(
            "/api/v1/sites",
            post(sites::handle_generate).get(sites::handle_list),
        )
        .route(
            "/api/v1/sites/:id",
            axum::routing::delete(sites::handle_delete),
        )
        .route("/api/v1/sites/:id/status", get(sites::handle_status))
        .route("/api/v1/sites/:id/view", get(sites::handle_view))
        .route("/api/v1/sites/:id/html", put(sites::handle_edit_html))
        .route("/api/v1/sites/:id/deploy", post(deploy::handle_deploy))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
