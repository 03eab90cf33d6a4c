//! Image source aggregation.
//!
//! Merges the three image sources into one ordered payload:
//! uploaded files first, then remote URLs, then picked library items, each
//! group preserving its selection order. Failure policy is asymmetric and
//! deliberate: an unreadable uploaded file aborts the whole aggregation
//! before any network call, while a remote URL or picked item that fails to
//! fetch is logged and dropped — those sources are optional enrichments.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::images::share_link::resolve_share_link;
use crate::images::{EncodedImage, LocalImage, PickedMedia};

/// Fetches raw image bytes (plus mime type) for a pasted URL.
/// Carried as `Arc<dyn RemoteImageFetcher>` so aggregation is testable
/// without a network.
#[async_trait]
pub trait RemoteImageFetcher: Send + Sync {
    async fn fetch_url(&self, url: &str) -> anyhow::Result<(Bytes, String)>;
}

/// Fetches full-resolution bytes for an item picked from the photo library.
#[async_trait]
pub trait PickedImageFetcher: Send + Sync {
    async fn fetch_item(&self, item: &PickedMedia) -> anyhow::Result<(Bytes, String)>;
}

/// Produces the ordered `EncodedImage` sequence for one generation run.
///
/// Uploaded files are read and encoded first; any read failure is fatal and
/// surfaces before a single network call is made. Remote URLs and picked
/// items are then fetched concurrently; per-item failures are dropped.
/// An empty result is not an error — the caller decides whether zero images
/// is acceptable.
pub async fn aggregate(
    locals: &[LocalImage],
    urls: &[String],
    picked: &[PickedMedia],
    remote: &dyn RemoteImageFetcher,
    photos: &dyn PickedImageFetcher,
) -> Result<Vec<EncodedImage>, AppError> {
    let mut images = Vec::with_capacity(locals.len() + urls.len() + picked.len());

    let reads = join_all(locals.iter().map(|img| tokio::fs::read(&img.path))).await;
    for (img, read) in locals.iter().zip(reads) {
        let bytes = read.map_err(|e| {
            AppError::Aggregation(format!(
                "could not read uploaded file '{}': {e}",
                img.file_name
            ))
        })?;
        images.push(EncodedImage::from_bytes(&bytes, &img.mime_type));
    }

    let (from_urls, from_picker) = tokio::join!(
        join_all(urls.iter().map(|url| async move {
            match remote.fetch_url(url).await {
                Ok((bytes, mime)) => Some(EncodedImage::from_bytes(&bytes, &mime)),
                Err(e) => {
                    warn!("dropping remote image URL '{url}': {e:#}");
                    None
                }
            }
        })),
        join_all(picked.iter().map(|item| async move {
            match photos.fetch_item(item).await {
                Ok((bytes, mime)) => Some(EncodedImage::from_bytes(&bytes, &mime)),
                Err(e) => {
                    warn!("dropping picked media item '{}': {e:#}", item.id);
                    None
                }
            }
        })),
    );

    images.extend(from_urls.into_iter().flatten());
    images.extend(from_picker.into_iter().flatten());

    debug!(
        "aggregated {} images ({} uploaded, {} urls, {} picked requested)",
        images.len(),
        locals.len(),
        urls.len(),
        picked.len()
    );
    Ok(images)
}

/// Production `RemoteImageFetcher`: resolves share links, fetches over HTTP,
/// and takes the mime type from the response, defaulting to a generic image
/// type when the source does not report one.
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        HttpImageFetcher { http }
    }
}

#[async_trait]
impl RemoteImageFetcher for HttpImageFetcher {
    async fn fetch_url(&self, url: &str) -> anyhow::Result<(Bytes, String)> {
        let fetch_url = resolve_share_link(url);
        let response = self.http.get(&fetch_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("image fetch returned HTTP {}", response.status());
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
