//! Google Photos library collaborator.
//!
//! Holds the process-wide cached access token: minted on first need via the
//! refresh-token grant, reused while more than a minute of life remains,
//! invalidated on a 401/403 from the media service (with exactly one
//! re-auth retry for the listing call), and never persisted beyond the
//! session. Media downloads request the full-resolution variant; a failed
//! download is the caller's silent-drop case, so it surfaces here as a
//! plain error with no retry.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PhotosOauthConfig;
use crate::errors::AppError;
use crate::images::aggregator::PickedImageFetcher;
use crate::images::PickedMedia;
use crate::state::AppState;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Tokens are reused only while this much life remains.
const REUSE_MARGIN: Duration = Duration::from_secs(60);

const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh_at(&self, now: Instant) -> bool {
        self.expires_at.saturating_duration_since(now) > REUSE_MARGIN
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemsResponse {
    media_items: Option<Vec<RawMediaItem>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMediaItem {
    id: String,
    base_url: String,
    #[serde(default)]
    filename: String,
}

impl From<RawMediaItem> for PickedMedia {
    fn from(raw: RawMediaItem) -> Self {
        PickedMedia {
            id: raw.id,
            base_url: raw.base_url,
            filename: raw.filename,
        }
    }
}

/// One page of the library listing, as shown in the picker.
#[derive(Debug, Serialize)]
pub struct MediaPage {
    pub items: Vec<PickedMedia>,
    pub next_page_token: Option<String>,
}

pub struct PhotosClient {
    http: reqwest::Client,
    oauth: Option<PhotosOauthConfig>,
    token: Mutex<Option<CachedToken>>,
}

impl PhotosClient {
    pub fn new(http: reqwest::Client, oauth: Option<PhotosOauthConfig>) -> Self {
        PhotosClient {
            http,
            oauth,
            token: Mutex::new(None),
        }
    }

    /// Returns a usable access token, minting a fresh one when the cache is
    /// empty or about to expire.
    async fn access_token(&self) -> Result<String, AppError> {
        let oauth = self.oauth.as_ref().ok_or_else(|| {
            AppError::Credential(
                "GOOGLE_OAUTH_CLIENT_ID is not set; the photo library is unavailable".to_string(),
            )
        })?;

        if let Some(cached) = self.token.lock().expect("token cache poisoned").as_ref() {
            if cached.is_fresh_at(Instant::now()) {
                return Ok(cached.value.clone());
            }
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", oauth.client_id.as_str()),
                ("client_secret", oauth.client_secret.as_str()),
                ("refresh_token", oauth.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Credential(format!(
                "photo library token refresh was rejected (HTTP {status})"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("could not parse token response: {e}")))?;

        let minted = CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        let value = minted.value.clone();
        *self.token.lock().expect("token cache poisoned") = Some(minted);
        Ok(value)
    }

    fn invalidate_token(&self) {
        *self.token.lock().expect("token cache poisoned") = None;
    }

    /// Lists library items for the picker. A 401/403 invalidates the cached
    /// token and retries exactly once with a fresh one.
    pub async fn list_media_items(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<MediaPage, AppError> {
        let size = clamp_page_size(page_size);
        let mut retried = false;

        loop {
            let token = self.access_token().await?;
            let mut request = self
                .http
                .get(format!("{PHOTOS_API_BASE}/mediaItems"))
                .query(&[("pageSize", size.to_string())])
                .bearer_auth(&token);
            if let Some(page_token) = page_token {
                request = request.query(&[("pageToken", page_token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::Transport(e.to_string()))?;
            let status = response.status();

            if (status.as_u16() == 401 || status.as_u16() == 403) && !retried {
                warn!("photo library listing returned {status}; refreshing token and retrying");
                self.invalidate_token();
                retried = true;
                continue;
            }

            if !status.is_success() {
                return Err(AppError::Transport(format!(
                    "photo library listing failed: HTTP {status}"
                )));
            }

            let listing: MediaItemsResponse = response.json().await.map_err(|e| {
                AppError::Transport(format!("could not parse media listing: {e}"))
            })?;

            return Ok(MediaPage {
                items: listing
                    .media_items
                    .unwrap_or_default()
                    .into_iter()
                    .map(PickedMedia::from)
                    .collect(),
                next_page_token: listing.next_page_token,
            });
        }
    }
}

#[async_trait]
impl PickedImageFetcher for PhotosClient {
    async fn fetch_item(&self, item: &PickedMedia) -> anyhow::Result<(Bytes, String)> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(download_url(&item.base_url))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("media download returned HTTP {}", response.status());
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());
        let bytes = response.bytes().await?;
        Ok((bytes, mime))
    }
}

fn clamp_page_size(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100)
}

/// The `=d` suffix requests the original-resolution download variant.
fn download_url(base_url: &str) -> String {
    format!("{base_url}=d")
}

#[derive(Debug, Deserialize)]
pub struct PhotosQuery {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

/// GET /api/v1/photos
///
/// One page of the photo library for the picker UI.
pub async fn handle_list_photos(
    State(state): State<AppState>,
    Query(query): Query<PhotosQuery>,
) -> Result<Json<MediaPage>, AppError> {
    let page = state
        .photos
        .list_media_items(query.page_size, query.page_token.as_deref())
        .await?;
    Ok(Json(page))
}
