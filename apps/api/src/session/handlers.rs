//! Axum route handlers for session state: credential validation, context
//! fields, model selection, and session reset.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::gemini::default_model;
use crate::session::Context;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateKeyResponse {
    pub models: Vec<String>,
    pub selected_model: String,
}

/// POST /api/v1/key/validate
///
/// Validates the key against the model-listing endpoint. On success the
/// session stores the key, the vision-model list, and the default selection
/// (flash tier preferred).
pub async fn handle_validate_key(
    State(state): State<AppState>,
    Json(request): Json<ValidateKeyRequest>,
) -> Result<Json<ValidateKeyResponse>, AppError> {
    let models = state.generator.list_models(&request.api_key).await?;
    let selected = default_model(&models)
        .cloned()
        .unwrap_or_default();
    info!("API key validated; {} vision models available", models.len());

    let mut session = state.lock_session();
    session.api_key = request.api_key;
    session.key_validated = true;
    session.available_models = models.clone();
    session.selected_model = selected.clone();

    Ok(Json(ValidateKeyResponse {
        models,
        selected_model: selected,
    }))
}

/// Partial context update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateContextRequest {
    pub address: Option<String>,
    pub latlon: Option<String>,
    pub field_memo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: Context,
}

/// PATCH /api/v1/session/context
pub async fn handle_update_context(
    State(state): State<AppState>,
    Json(request): Json<UpdateContextRequest>,
) -> Json<ContextResponse> {
    let mut session = state.lock_session();
    if let Some(address) = request.address {
        session.context.address = address;
    }
    if let Some(latlon) = request.latlon {
        session.context.latlon = latlon;
    }
    if let Some(field_memo) = request.field_memo {
        session.context.field_memo = field_memo;
    }
    Json(ContextResponse {
        context: session.context.clone(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

/// PATCH /api/v1/session/model
///
/// The selected model must be a member of the last-fetched model list.
pub async fn handle_select_model(
    State(state): State<AppState>,
    Json(request): Json<SelectModelRequest>,
) -> Result<Json<ValidateKeyResponse>, AppError> {
    let mut session = state.lock_session();
    if !session.key_validated {
        return Err(AppError::Validation(
            "validate the API key before selecting a model".to_string(),
        ));
    }
    if !session.available_models.contains(&request.model) {
        return Err(AppError::Validation(format!(
            "model '{}' is not in the available model list",
            request.model
        )));
    }
    session.selected_model = request.model;

    Ok(Json(ValidateKeyResponse {
        models: session.available_models.clone(),
        selected_model: session.selected_model.clone(),
    }))
}

/// POST /api/v1/session/reset
///
/// Restores the initial session state, as a page reload does in the UI.
pub async fn handle_reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.lock_session().reset();
    info!("session reset");
    Json(serde_json::json!({ "status": "reset" }))
}
