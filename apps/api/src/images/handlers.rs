//! Axum route handlers for the three image sources.
//!
//! Uploaded files are spooled to a fresh temp directory and replace the
//! previous upload batch wholesale; remote URLs merge-deduplicate; picked
//! media is replaced wholesale on every picker confirmation.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::images::{LocalImage, PickedMedia};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImageCountResponse {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ImageUrlsResponse {
    pub urls: Vec<String>,
}

/// PUT /api/v1/images/files
///
/// Replaces the uploaded-file set with the parts of this request, spooling
/// the bytes for re-reading at submission time. An empty upload clears the
/// set.
pub async fn handle_upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageCountResponse>, AppError> {
    let spool = tempfile::tempdir()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("could not create spool dir: {e}")))?;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed upload: {e}")))?
    {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or("image/jpeg").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read upload '{file_name}': {e}")))?;

        let path = spool.path().join(format!("{:03}", images.len()));
        tokio::fs::write(&path, &data).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("could not spool '{file_name}': {e}"))
        })?;

        images.push(LocalImage {
            file_name,
            mime_type,
            path,
        });
    }

    let count = images.len();
    info!("uploaded file set replaced ({count} files)");

    let mut session = state.lock_session();
    if count == 0 {
        session.clear_local_images();
    } else {
        session.replace_local_images(spool, images);
    }

    Ok(Json(ImageCountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct AddUrlsRequest {
    pub urls: Vec<String>,
}

/// POST /api/v1/images/urls
///
/// Merges new remote image URLs into the set (blanks and duplicates dropped).
pub async fn handle_add_urls(
    State(state): State<AppState>,
    Json(request): Json<AddUrlsRequest>,
) -> Json<ImageUrlsResponse> {
    let mut session = state.lock_session();
    session.add_image_urls(request.urls);
    Json(ImageUrlsResponse {
        urls: session.image_urls.clone(),
    })
}

/// DELETE /api/v1/images/urls
pub async fn handle_clear_urls(State(state): State<AppState>) -> Json<ImageUrlsResponse> {
    let mut session = state.lock_session();
    session.clear_image_urls();
    Json(ImageUrlsResponse { urls: Vec::new() })
}

#[derive(Debug, Deserialize)]
pub struct SetPickedRequest {
    pub items: Vec<PickedMedia>,
}

/// PUT /api/v1/images/picked
///
/// Replaces the picked-media set with this picker confirmation.
pub async fn handle_set_picked(
    State(state): State<AppState>,
    Json(request): Json<SetPickedRequest>,
) -> Json<ImageCountResponse> {
    let count = request.items.len();
    let mut session = state.lock_session();
    session.set_picked_media(request.items);
    Json(ImageCountResponse { count })
}

/// DELETE /api/v1/images/picked
pub async fn handle_clear_picked(State(state): State<AppState>) -> Json<ImageCountResponse> {
    let mut session = state.lock_session();
    session.clear_picked_media();
    Json(ImageCountResponse { count: 0 })
}
