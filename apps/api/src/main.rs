mod config;
mod errors;
mod gemini;
mod geocode;
mod images;
mod photos;
mod prompt;
mod reports;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::geocode::KakaoGeocoder;
use crate::images::aggregator::HttpImageFetcher;
use crate::photos::PhotosClient;
use crate::reports::orchestrator::Orchestrator;
use crate::routes::build_router;
use crate::session::Session;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fieldscope API v{}", env!("CARGO_PKG_VERSION"));

    // One shared HTTP client for every outbound call. No per-request timeout
    // is imposed on generation beyond this transport-level ceiling.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .expect("Failed to build HTTP client");

    let generator = Arc::new(GeminiClient::new(http.clone()));
    info!("Generation gateway initialized");

    let photos = Arc::new(PhotosClient::new(http.clone(), config.photos_oauth.clone()));
    if config.photos_oauth.is_some() {
        info!("Photo library collaborator initialized");
    } else {
        info!("Photo library collaborator disabled (no OAuth client configured)");
    }

    let geocoder = config
        .kakao_rest_api_key
        .clone()
        .map(|key| Arc::new(KakaoGeocoder::new(http.clone(), key)));
    if geocoder.is_none() {
        info!("Address search collaborator disabled (no Kakao key configured)");
    }

    let session = Arc::new(Mutex::new(Session::new()));
    let orchestrator = Arc::new(Orchestrator::new(
        session.clone(),
        generator.clone(),
        Arc::new(HttpImageFetcher::new(http.clone())),
        photos.clone(),
    ));

    let state = AppState {
        session,
        generator,
        photos,
        geocoder,
        orchestrator,
        http,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
