use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use crate::helpers::errors::PlacesError;
use crate::models::cafe::{CafeDetails, CafeSuggestion, Coordinates};
use crate::services::fetcher::JsonFetcher;
use crate::services::normalize::{high_res_photo, join_address, open_status_from_osm, osm_amenities, parse_price_level, PHOTO_SIZE};
use crate::services::providers::{build_url, coordinate, id_string, PlacesProvider, SearchArea};

const NOMINATIM_API: &str = "https://nominatim.openstreetmap.org";
/// Half-width of the search viewbox in degrees.
const VIEWBOX_SPAN: f64 = 0.05;

/// OpenStreetMap search. Expects a fetcher that honours Nominatim's one
/// request per second usage policy.
pub struct NominatimProvider {
    fetcher: Arc<dyn JsonFetcher>,
    area: SearchArea,
}

impl NominatimProvider {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, area: SearchArea) -> Self {
        Self { fetcher, area }
    }

    fn viewbox(at: Coordinates) -> String {
        format!(
            "{},{},{},{}",
            at.lon - VIEWBOX_SPAN,
            at.lat - VIEWBOX_SPAN,
            at.lon + VIEWBOX_SPAN,
            at.lat + VIEWBOX_SPAN
        )
    }

    async fn results(&self, endpoint: &str, params: Vec<(&'static str, String)>) -> Result<Vec<Value>, PlacesError> {
        let url = build_url(&format!("{}/{}", NOMINATIM_API, endpoint), &params)?;
        match self.fetcher.fetch_json(&url).await? {
            Value::Array(results) => Ok(results),
            _ => Err(PlacesError::Decode("expected a list of places".to_string())),
        }
    }

    async fn search(&self, query: String, at: Coordinates, limit: usize) -> Result<Vec<Value>, PlacesError> {
        let params = vec![
            ("q", query),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("addressdetails", "1".to_string()),
            ("extratags", "1".to_string()),
            ("bounded", "1".to_string()),
            ("viewbox", Self::viewbox(at)),
        ];
        self.results("search", params).await
    }

    fn to_cafes(&self, results: &[Value], limit: usize) -> Vec<CafeDetails> {
        let now = OffsetDateTime::now_utc();
        results
            .iter()
            .take(limit)
            .map(|result| osm_result_to_cafe(result, &self.area.city, now))
            .collect()
    }
}

fn display_head(result: &Value) -> Option<&str> {
    result["display_name"]
        .as_str()
        .and_then(|display| display.split(',').next())
        .map(str::trim)
        .filter(|head| !head.is_empty())
}

/// Normalizes one Nominatim search or lookup result.
pub fn osm_result_to_cafe(result: &Value, city: &str, now: OffsetDateTime) -> CafeDetails {
    let tags = &result["extratags"];
    let address = &result["address"];

    let name = result["name"]
        .as_str()
        .filter(|name| !name.is_empty())
        .or_else(|| display_head(result))
        .unwrap_or("Unknown Cafe");
    let locality = address["city"]
        .as_str()
        .or_else(|| address["town"].as_str())
        .or_else(|| address["village"].as_str())
        .unwrap_or(city);
    let joined = join_address(
        &[
            address["house_number"].as_str().or_else(|| tags["addr:housenumber"].as_str()),
            address["road"].as_str().or_else(|| tags["addr:street"].as_str()),
            Some(locality),
        ],
        city,
    );

    let mut cafe = CafeDetails::new(id_string(&result["osm_id"]).unwrap_or_default(), name, joined);
    cafe.lat = coordinate(&result["lat"]);
    cafe.lon = coordinate(&result["lon"]);
    cafe.amenities = osm_amenities(tags);
    cafe.phone_number = tags["phone"]
        .as_str()
        .or_else(|| tags["contact:phone"].as_str())
        .map(str::to_string);
    cafe.website = tags["website"]
        .as_str()
        .or_else(|| tags["contact:website"].as_str())
        .map(str::to_string);
    cafe.open_now = tags["opening_hours"].as_str().and_then(|hours| open_status_from_osm(hours, now));
    cafe.price_level = parse_price_level(&tags["price_level"]);
    cafe.description = tags["description"].as_str().map(str::to_string);
    cafe.photos = tags["image"]
        .as_str()
        .map(|image| high_res_photo(Some(image), PHOTO_SIZE))
        .into_iter()
        .collect();
    cafe.with_placeholder_photo()
}

#[async_trait]
impl PlacesProvider for NominatimProvider {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn top_cafes(&self, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let query = format!("cafe in {}", self.area.city);
        let results = self.search(query, self.area.centre, limit).await?;
        Ok(self.to_cafes(&results, limit))
    }

    async fn cafe_details(&self, place_id: &str) -> Result<CafeDetails, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() || !place_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(PlacesError::InvalidIdentifier(format!("not an OSM node id: {:?}", place_id)));
        }

        let params = vec![
            ("osm_ids", format!("N{}", place_id)),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("extratags", "1".to_string()),
        ];
        let results = self.results("lookup", params).await?;
        self.to_cafes(&results, 1)
            .into_iter()
            .next()
            .ok_or_else(|| PlacesError::NotFound(format!("place {}", place_id)))
    }

    async fn search_by_text(&self, query: &str, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let query = format!("{} cafe {}", query.trim(), self.area.city);
        let results = self.search(query, self.area.centre, limit).await?;
        Ok(self.to_cafes(&results, limit))
    }

    async fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<CafeSuggestion>, PlacesError> {
        let query = format!("{} {}", query.trim(), self.area.city);
        let results = self.search(query, self.area.centre, limit).await?;

        Ok(results
            .iter()
            .filter_map(|result| {
                Some(CafeSuggestion {
                    name: display_head(result).unwrap_or("Unknown Place").to_string(),
                    place_id: id_string(&result["osm_id"])?,
                    lat: coordinate(&result["lat"])?,
                    lon: coordinate(&result["lon"])?,
                })
            })
            .take(limit)
            .collect())
    }

    async fn cafes_near(&self, at: Coordinates, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let results = self.search("cafe".to_string(), at, limit).await?;
        Ok(self.to_cafes(&results, limit))
    }
}
