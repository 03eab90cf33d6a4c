//! Prompt template handling.
//!
//! The base template is either the built-in default or the verbatim text of
//! a user-supplied URL; composition appends the site-information block with
//! the current context fields. A template fetch failure never aborts the
//! flow — the default template is used instead.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::session::Context;
use crate::state::AppState;

/// Built-in review-report template, used whenever no external template URL
/// is configured or the external fetch fails.
pub const DEFAULT_TEMPLATE: &str = r#"# Role and objective
You are a senior road-traffic safety specialist. Using the provided photographs and site information, produce a review report on the installation of an automated speed-enforcement camera. Your judgement must be strictly consistent and follow the explicit rules below, never intuition.

# Analysis procedure (follow this order exactly)
## Step 1: Visual survey
- Examine every photograph and record only objective findings for: road alignment, lane characteristics, traffic-safety facilities, surroundings.
## Step 2: Key risk factors
- From the Step 1 findings, identify the dominant crash-risk factors.
## Step 3: Root-cause determination (most important)
- Rule 1: if a clear structural defect is identified (sharp curve, insufficient deceleration lane, steep grade), the root cause is "road structure".
- Rule 2: if Rule 1 does not apply and speeding is still expected on an otherwise sound road, the root cause is "driver speeding".
## Step 4: Report
- If the root cause is "road structure": conclude "installation not appropriate" and propose concrete safety facilities (rumble strips, chevron alignment signs, etc.) under improvement recommendations.
- If the root cause is "driver speeding": conclude "installation appropriate" and omit improvement recommendations.

# Report format (use this layout and wording verbatim)
* Geometry and traffic conditions
-
* Review result
-
* Improvement recommendations
-
[Begin analysis]
"#;

/// Appends the site-information block to the base template.
///
/// Address and coordinates render as `-` when empty; the field memo renders
/// as its literal text on its own line when present, `-` otherwise.
/// Pure and deterministic.
pub fn compose(base: &str, context: &Context) -> String {
    let address = non_empty_or_dash(&context.address);
    let latlon = non_empty_or_dash(&context.latlon);
    let memo = if context.field_memo.trim().is_empty() {
        "-".to_string()
    } else {
        format!("\n{}", context.field_memo)
    };

    format!(
        "{base}\n\n[Site information]\n- Location: {address}\n- Coordinates: {latlon}\n- Field memo: {memo}\n"
    )
}

fn non_empty_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Fetches the template at `url`, falling back to the default on an empty
/// URL, a non-success status, or any transport failure. The fallback is
/// logged, never surfaced.
pub async fn fetch_template(http: &reqwest::Client, url: &str) -> String {
    if url.trim().is_empty() {
        return DEFAULT_TEMPLATE.to_string();
    }

    match fetch_template_text(http, url).await {
        Ok(text) => text,
        Err(e) => {
            warn!("template fetch from '{url}' failed, using default: {e:#}");
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

async fn fetch_template_text(http: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("template fetch returned HTTP {}", response.status());
    }
    Ok(response.text().await?)
}

#[derive(Debug, Deserialize)]
pub struct LoadTemplateRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LoadTemplateResponse {
    pub url: String,
    pub template: String,
}

/// POST /api/v1/prompt/template
///
/// Loads the template at the given URL (or the default for an empty URL)
/// and makes it the session's base prompt.
pub async fn handle_load_template(
    State(state): State<AppState>,
    Json(request): Json<LoadTemplateRequest>,
) -> Result<Json<LoadTemplateResponse>, AppError> {
    let template = fetch_template(&state.http, &request.url).await;
    info!("base prompt template set ({} chars)", template.len());

    let mut session = state.lock_session();
    session.prompt_url = request.url;
    session.base_prompt = template;

    Ok(Json(LoadTemplateResponse {
        url: session.prompt_url.clone(),
        template: session.base_prompt.clone(),
    }))
}
