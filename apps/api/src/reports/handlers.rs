//! Axum route handlers for the report generation API.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::reports::orchestrator::SubmitOutcome;
use crate::reports::Report;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerateResponse {
    Completed { report: Report },
    ConfirmationRequired { model: String, message: String },
    Cancelled,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
}

/// POST /api/v1/reports/generate
///
/// Submits a generation run for the selected model. Either returns the
/// finished report, or asks for confirmation when the model already has one.
pub async fn handle_generate(
    State(state): State<AppState>,
) -> Result<Json<GenerateResponse>, AppError> {
    match state.orchestrator.submit().await? {
        SubmitOutcome::Completed(report) => Ok(Json(GenerateResponse::Completed { report })),
        SubmitOutcome::ConfirmationRequired { model } => {
            let message = format!(
                "A report generated with '{model}' already exists. Run again and overwrite it?"
            );
            Ok(Json(GenerateResponse::ConfirmationRequired { model, message }))
        }
    }
}

/// POST /api/v1/reports/confirm
///
/// Proceeds with the pending overwrite: clears the old report, re-runs the
/// full pipeline, and returns the new report.
pub async fn handle_confirm(
    State(state): State<AppState>,
) -> Result<Json<GenerateResponse>, AppError> {
    let report = state.orchestrator.confirm().await?;
    Ok(Json(GenerateResponse::Completed { report }))
}

/// POST /api/v1/reports/cancel
///
/// Dismisses the pending overwrite confirmation. Nothing is generated.
pub async fn handle_cancel(
    State(state): State<AppState>,
) -> Result<Json<GenerateResponse>, AppError> {
    state.orchestrator.cancel()?;
    Ok(Json(GenerateResponse::Cancelled))
}

/// GET /api/v1/reports
///
/// The report collection, sorted by model identifier.
pub async fn handle_list_reports(State(state): State<AppState>) -> Json<ReportsResponse> {
    let reports = state.lock_session().reports.all().to_vec();
    Json(ReportsResponse { reports })
}
