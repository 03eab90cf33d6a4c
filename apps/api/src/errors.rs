use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// The taxonomy mirrors how a failed generation run is reported to the user:
/// validation problems keep the session untouched, credential problems block
/// progress until the key is fixed, aggregation problems abort before any
/// generation call, transport problems carry whatever the provider said, and
/// a blocked generation carries the provider's stated finish reason.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Image aggregation failed: {0}")]
    Aggregation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A generation run is already in flight for this session")]
    GenerationInFlight,

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("The AI returned no usable text (block reason: {reason})")]
    ContentBlocked { reason: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Credential(msg) => (StatusCode::UNAUTHORIZED, "CREDENTIAL_ERROR", msg.clone()),
            AppError::Aggregation(msg) => {
                tracing::error!("Aggregation error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "AGGREGATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::GenerationInFlight => (
                StatusCode::CONFLICT,
                "GENERATION_IN_FLIGHT",
                self.to_string(),
            ),
            AppError::Transport(msg) => {
                tracing::error!("Transport error: {msg}");
                (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR", msg.clone())
            }
            AppError::ContentBlocked { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CONTENT_BLOCKED",
                self.to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_blocked_message_carries_reason() {
        let err = AppError::ContentBlocked {
            reason: "SAFETY".to_string(),
        };
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::Validation("bad input".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_in_flight_maps_to_409() {
        let response = AppError::GenerationInFlight.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transport_maps_to_502() {
        let response = AppError::Transport("HTTP 500".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
