pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;
use crate::{geocode, images, photos, prompt, reports, session};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Credential + session
        .route("/api/v1/key/validate", post(session::handlers::handle_validate_key))
        .route(
            "/api/v1/session/context",
            patch(session::handlers::handle_update_context),
        )
        .route(
            "/api/v1/session/model",
            patch(session::handlers::handle_select_model),
        )
        .route("/api/v1/session/reset", post(session::handlers::handle_reset))
        // Image sources
        .route(
            "/api/v1/images/files",
            put(images::handlers::handle_upload_files),
        )
        .route(
            "/api/v1/images/urls",
            post(images::handlers::handle_add_urls).delete(images::handlers::handle_clear_urls),
        )
        .route(
            "/api/v1/images/picked",
            put(images::handlers::handle_set_picked)
                .delete(images::handlers::handle_clear_picked),
        )
        // Collaborators
        .route("/api/v1/photos", get(photos::handle_list_photos))
        .route("/api/v1/geocode/search", post(geocode::handle_search))
        .route("/api/v1/prompt/template", post(prompt::handle_load_template))
        // Reports
        .route(
            "/api/v1/reports/generate",
            post(reports::handlers::handle_generate),
        )
        .route(
            "/api/v1/reports/confirm",
            post(reports::handlers::handle_confirm),
        )
        .route(
            "/api/v1/reports/cancel",
            post(reports::handlers::handle_cancel),
        )
        .route("/api/v1/reports", get(reports::handlers::handle_list_reports))
        .with_state(state)
}
