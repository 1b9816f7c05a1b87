use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Url;
use crate::config::{Config, ProviderKind};
use crate::helpers::errors::PlacesError;
use crate::models::cafe::{CafeDetails, CafeSuggestion, Coordinates};
use crate::services::fetcher::JsonFetcher;

pub mod geoapify;
pub mod google;
pub mod nominatim;

/// The part of the world searches are restricted to.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchArea {
    pub city: String,
    pub centre: Coordinates,
    /// Metres.
    pub radius: u32,
}

impl SearchArea {
    pub fn from_config(config: &Config) -> Self {
        Self {
            city: config.city_name.clone(),
            centre: Coordinates {
                lat: config.city_lat,
                lon: config.city_lon,
            },
            radius: config.search_radius,
        }
    }
}

/// A places backend that can answer the cafe queries in one normalized shape.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn top_cafes(&self, limit: usize) -> Result<Vec<CafeDetails>, PlacesError>;

    async fn cafe_details(&self, place_id: &str) -> Result<CafeDetails, PlacesError>;

    async fn search_by_text(&self, query: &str, limit: usize) -> Result<Vec<CafeDetails>, PlacesError>;

    async fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<CafeSuggestion>, PlacesError>;

    async fn cafes_near(&self, at: Coordinates, limit: usize) -> Result<Vec<CafeDetails>, PlacesError>;
}

pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<String, PlacesError> {
    Url::parse_with_params(base, params)
        .map(|url| url.to_string())
        .map_err(|e| PlacesError::InvalidIdentifier(format!("could not build request url: {}", e)))
}

/// Accepts ids that arrive as JSON strings or numbers.
pub fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coordinates that arrive as JSON numbers or numeric strings.
pub fn coordinate(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One fetcher per vendor, each with its own pacing and cache admission.
#[derive(Clone)]
pub struct Fetchers {
    pub geoapify: Arc<dyn JsonFetcher>,
    pub google: Arc<dyn JsonFetcher>,
    pub nominatim: Arc<dyn JsonFetcher>,
}

pub fn build_provider(kind: ProviderKind, config: &Config, fetchers: &Fetchers) -> Arc<dyn PlacesProvider> {
    let area = SearchArea::from_config(config);
    match kind {
        ProviderKind::Geoapify => Arc::new(geoapify::GeoapifyProvider::new(
            fetchers.geoapify.clone(),
            config.geoapify_api_key.clone(),
            area,
        )),
        ProviderKind::Google => Arc::new(google::GooglePlacesProvider::new(
            fetchers.google.clone(),
            config.google_api_key.clone(),
            area,
        )),
        ProviderKind::Nominatim => Arc::new(nominatim::NominatimProvider::new(fetchers.nominatim.clone(), area)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_parameters_are_encoded() {
        let url = build_url(
            "https://api.example/places",
            &[("name", "Café & Co".to_string()), ("limit", "5".to_string())],
        )
        .unwrap();

        assert!(url.starts_with("https://api.example/places?name=Caf"));
        assert!(url.contains("%26"));
        assert!(url.ends_with("limit=5"));
    }

    #[test]
    fn ids_and_coordinates_accept_strings_and_numbers() {
        assert_eq!(id_string(&json!(12345)), Some("12345".to_string()));
        assert_eq!(id_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(coordinate(&json!("9.30")), Some(9.30));
        assert_eq!(coordinate(&json!(123.3)), Some(123.3));
        assert_eq!(coordinate(&json!(null)), None);
    }
}
