use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use crate::helpers::errors::PlacesError;
use crate::models::cafe::{CafeDetails, CafeSuggestion, Coordinates};
use crate::services::fetcher::JsonFetcher;
use crate::services::normalize::{geoapify_amenities, join_address, open_status_from_structured, parse_price_level};
use crate::services::providers::{build_url, coordinate, id_string, PlacesProvider, SearchArea};

const PLACES_API: &str = "https://api.geoapify.com/v2/places";
const AUTOCOMPLETE_API: &str = "https://api.geoapify.com/v1/geocode/autocomplete";
const CATEGORIES: &str = "catering.cafe,commercial.food_and_drink";

pub struct GeoapifyProvider {
    fetcher: Arc<dyn JsonFetcher>,
    api_key: String,
    area: SearchArea,
}

impl GeoapifyProvider {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, api_key: String, area: SearchArea) -> Self {
        Self {
            fetcher,
            api_key,
            area,
        }
    }

    fn circle_params(&self, at: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("categories", CATEGORIES.to_string()),
            ("filter", format!("circle:{},{},{}", at.lon, at.lat, self.area.radius)),
            ("bias", format!("proximity:{},{}", at.lon, at.lat)),
        ]
    }

    async fn features(&self, base: &str, mut params: Vec<(&'static str, String)>) -> Result<Vec<Value>, PlacesError> {
        params.push(("apiKey", self.api_key.clone()));
        let url = build_url(base, &params)?;
        let body = self.fetcher.fetch_json(&url).await?;

        match body.get("features") {
            Some(Value::Array(features)) => Ok(features.clone()),
            Some(_) => Err(PlacesError::Decode("`features` is not a list".to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn cafes(&self, params: Vec<(&'static str, String)>, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let now = OffsetDateTime::now_utc();
        let cafes = self
            .features(PLACES_API, params)
            .await?
            .iter()
            .take(limit)
            .map(|feature| feature_to_cafe(feature, &self.area.city, now))
            .collect::<Vec<CafeDetails>>();

        debug!("Geoapify returned {} cafes", cafes.len());
        Ok(cafes)
    }
}

/// Normalizes one GeoJSON feature of the places API.
pub fn feature_to_cafe(feature: &Value, city: &str, now: OffsetDateTime) -> CafeDetails {
    let properties = &feature["properties"];
    let place_id = id_string(&properties["place_id"])
        .or_else(|| id_string(&feature["id"]))
        .unwrap_or_default();
    let name = properties["name"].as_str().unwrap_or("Unknown Cafe");

    let address = match properties["formatted"].as_str() {
        Some(formatted) if !formatted.trim().is_empty() => formatted.to_string(),
        _ => join_address(
            &[
                properties["housenumber"].as_str(),
                properties["street"].as_str(),
                Some(properties["city"].as_str().unwrap_or(city)),
            ],
            city,
        ),
    };

    let mut cafe = CafeDetails::new(place_id, name, address);
    cafe.rating = properties["rating"].as_f64();
    cafe.amenities = geoapify_amenities(properties);
    cafe.lat = coordinate(&properties["lat"]);
    cafe.lon = coordinate(&properties["lon"]);
    cafe.phone_number = properties["contact"]["phone"].as_str().map(str::to_string);
    cafe.website = properties["contact"]["website"]
        .as_str()
        .or_else(|| properties["website"].as_str())
        .map(str::to_string);
    cafe.open_now = open_status_from_structured(&properties["opening_hours"], now);
    cafe.price_level = parse_price_level(&properties["price_level"]);
    cafe.description = properties["description"].as_str().map(str::to_string);
    cafe.with_placeholder_photo()
}

fn feature_to_suggestion(feature: &Value) -> Option<CafeSuggestion> {
    let properties = &feature["properties"];
    let name = properties["name"]
        .as_str()
        .or_else(|| properties["formatted"].as_str())
        .unwrap_or("Unknown Place");
    let place_id = id_string(&properties["place_id"]).or_else(|| id_string(&feature["id"]))?;

    Some(CafeSuggestion {
        name: name.to_string(),
        place_id,
        lat: coordinate(&properties["lat"])?,
        lon: coordinate(&properties["lon"])?,
    })
}

#[async_trait]
impl PlacesProvider for GeoapifyProvider {
    fn name(&self) -> &'static str {
        "geoapify"
    }

    async fn top_cafes(&self, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let mut params = self.circle_params(self.area.centre);
        params.push(("limit", limit.to_string()));
        self.cafes(params, limit).await
    }

    async fn cafe_details(&self, place_id: &str) -> Result<CafeDetails, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::InvalidIdentifier("empty place id".to_string()));
        }

        let params = vec![
            ("categories", CATEGORIES.to_string()),
            ("filter", format!("place:{}", place_id)),
        ];
        self.cafes(params, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PlacesError::NotFound(format!("place {}", place_id)))
    }

    async fn search_by_text(&self, query: &str, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let mut params = self.circle_params(self.area.centre);
        params.push(("name", query.to_string()));
        params.push(("limit", limit.to_string()));
        self.cafes(params, limit).await
    }

    async fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<CafeSuggestion>, PlacesError> {
        let centre = self.area.centre;
        let params = vec![
            ("text", query.to_string()),
            ("type", "amenity".to_string()),
            ("filter", format!("circle:{},{},{}", centre.lon, centre.lat, self.area.radius)),
            ("limit", limit.to_string()),
        ];

        Ok(self
            .features(AUTOCOMPLETE_API, params)
            .await?
            .iter()
            .filter_map(feature_to_suggestion)
            .take(limit)
            .collect())
    }

    async fn cafes_near(&self, at: Coordinates, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let mut params = self.circle_params(at);
        params.push(("limit", limit.to_string()));
        self.cafes(params, limit).await
    }
}
