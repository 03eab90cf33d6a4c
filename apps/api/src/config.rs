use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// The Gemini API key is deliberately NOT part of the config: the inspector
/// supplies it per session and validates it through the key-validation
/// endpoint, so the server never holds a long-lived generation credential.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// REST key for the Kakao local (address search) API.
    /// Address search is unavailable, not fatal, when unset.
    pub kakao_rest_api_key: Option<String>,
    /// OAuth client for the Google Photos library collaborator.
    /// Photo picking is unavailable, not fatal, when unset.
    pub photos_oauth: Option<PhotosOauthConfig>,
}

/// Refresh-token OAuth client used to mint Google Photos access tokens.
#[derive(Debug, Clone)]
pub struct PhotosOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let photos_oauth = match std::env::var("GOOGLE_OAUTH_CLIENT_ID") {
            Ok(client_id) if !client_id.trim().is_empty() => Some(PhotosOauthConfig {
                client_id,
                client_secret: require_env("GOOGLE_OAUTH_CLIENT_SECRET")?,
                refresh_token: require_env("GOOGLE_OAUTH_REFRESH_TOKEN")?,
            }),
            _ => None,
        };

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            kakao_rest_api_key: std::env::var("KAKAO_REST_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            photos_oauth,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
