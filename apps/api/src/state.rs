use std::sync::{Arc, MutexGuard};

use crate::gemini::GenerationBackend;
use crate::geocode::KakaoGeocoder;
use crate::photos::PhotosClient;
use crate::reports::orchestrator::Orchestrator;
use crate::session::{Session, SharedSession};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single inspector session this process serves. Owned exclusively
    /// here; collaborators receive copies of its values, never the lock.
    pub session: SharedSession,
    /// Generation backend seam. Production: `GeminiClient`.
    pub generator: Arc<dyn GenerationBackend>,
    pub photos: Arc<PhotosClient>,
    /// Address search collaborator; `None` when no Kakao key is configured.
    pub geocoder: Option<Arc<KakaoGeocoder>>,
    pub orchestrator: Arc<Orchestrator>,
    /// Shared HTTP client for plain fetches (template URL).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session mutex poisoned")
    }
}
