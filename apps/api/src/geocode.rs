//! Address search collaborator (Kakao local API).
//!
//! The core only consumes the selected hit's display text and its
//! `"<lat>, <lon>"` string; map rendering stays in the client.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

const ADDRESS_SEARCH_URL: &str = "https://dapi.kakao.com/v2/local/search/address.json";

#[derive(Debug, Deserialize)]
struct KakaoResponse {
    documents: Vec<KakaoDocument>,
}

#[derive(Debug, Deserialize)]
struct KakaoDocument {
    address_name: String,
    /// Longitude, then latitude — the provider's axis order.
    x: String,
    y: String,
    road_address: Option<KakaoSubAddress>,
    address: Option<KakaoSubAddress>,
}

#[derive(Debug, Deserialize)]
struct KakaoSubAddress {
    address_name: String,
}

/// The first search hit, reduced to what the report flow needs.
#[derive(Debug, Clone, Serialize)]
pub struct AddressHit {
    pub display_address: String,
    pub road_address: Option<String>,
    pub lat: String,
    pub lon: String,
    /// Pre-formatted `"<lat>, <lon>"` string for the coordinates field.
    pub latlon: String,
}

impl AddressHit {
    fn from_document(doc: KakaoDocument) -> Self {
        let display_address = doc
            .address
            .map(|a| a.address_name)
            .unwrap_or_else(|| doc.address_name.clone());
        AddressHit {
            display_address,
            road_address: doc.road_address.map(|a| a.address_name),
            latlon: format!("{}, {}", doc.y, doc.x),
            lat: doc.y,
            lon: doc.x,
        }
    }
}

pub struct KakaoGeocoder {
    http: reqwest::Client,
    api_key: String,
}

impl KakaoGeocoder {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        KakaoGeocoder { http, api_key }
    }

    /// Searches for `keyword` and returns the first hit, or a not-found
    /// error when the provider has no result for it.
    pub async fn search(&self, keyword: &str) -> Result<AddressHit, AppError> {
        if keyword.trim().is_empty() {
            return Err(AppError::Validation(
                "enter an address keyword to search for".to_string(),
            ));
        }

        let response = self
            .http
            .get(ADDRESS_SEARCH_URL)
            .query(&[("query", keyword)])
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "address search failed: HTTP {status}"
            )));
        }

        let parsed: KakaoResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("could not parse address search: {e}")))?;

        parsed
            .documents
            .into_iter()
            .next()
            .map(AddressHit::from_document)
            .ok_or_else(|| AppError::NotFound(format!("no address found for '{keyword}'")))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keyword: String,
}

/// POST /api/v1/geocode/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<AddressHit>, AppError> {
    let geocoder = state.geocoder.as_ref().ok_or_else(|| {
        AppError::Credential("KAKAO_REST_API_KEY is not set; address search is unavailable".to_string())
    })?;

    let hit = geocoder.search(&request.keyword).await?;
    Ok(Json(hit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_prefers_lot_number_address_and_formats_latlon() {
        let json = r#"{
            "documents": [{
                "address_name": "Seoul Gangnam-gu Yeoksam-dong 825",
                "x": "127.0365",
                "y": "37.5002",
                "road_address": {"address_name": "Seoul Gangnam-gu Teheran-ro 152"},
                "address": {"address_name": "Seoul Gangnam-gu Yeoksam-dong 825"}
            }]
        }"#;

        let parsed: KakaoResponse = serde_json::from_str(json).unwrap();
        let hit = AddressHit::from_document(parsed.documents.into_iter().next().unwrap());

        assert_eq!(hit.display_address, "Seoul Gangnam-gu Yeoksam-dong 825");
        assert_eq!(
            hit.road_address.as_deref(),
            Some("Seoul Gangnam-gu Teheran-ro 152")
        );
        // Latitude first, matching the coordinates field format.
        assert_eq!(hit.latlon, "37.5002, 127.0365");
    }

    #[test]
    fn test_hit_falls_back_to_top_level_address_name() {
        let json = r#"{
            "documents": [{
                "address_name": "Busan Haeundae-gu",
                "x": "129.16",
                "y": "35.16",
                "road_address": null,
                "address": null
            }]
        }"#;

        let parsed: KakaoResponse = serde_json::from_str(json).unwrap();
        let hit = AddressHit::from_document(parsed.documents.into_iter().next().unwrap());

        assert_eq!(hit.display_address, "Busan Haeundae-gu");
        assert!(hit.road_address.is_none());
    }
}
