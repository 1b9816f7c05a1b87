use std::sync::Arc;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};
use crate::helpers::errors::PlacesError;
use crate::models::cafe::{CafeDetails, CafeSuggestion, Coordinates};
use crate::models::review::Review;
use crate::services::fetcher::JsonFetcher;
use crate::services::normalize::google_type_amenities;
use crate::services::providers::{build_url, PlacesProvider, SearchArea};

const PLACES_API: &str = "https://maps.googleapis.com/maps/api/place";
const PHOTO_MAX_WIDTH: u32 = 400;
const LISTING_PHOTOS: usize = 3;
const DETAIL_FIELDS: &str = "place_id,name,formatted_address,vicinity,geometry,rating,photos,types,\
formatted_phone_number,website,opening_hours,price_level,editorial_summary";

#[derive(Deserialize, Debug, Default)]
struct GoogleEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<GooglePlace>,
    result: Option<GooglePlace>,
    #[serde(default)]
    candidates: Vec<GooglePlace>,
    #[serde(default)]
    predictions: Vec<GooglePrediction>,
    error_message: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct GooglePlace {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub vicinity: Option<String>,
    pub formatted_address: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub photos: Vec<GooglePhoto>,
    pub geometry: Option<GoogleGeometry>,
    #[serde(default)]
    pub types: Vec<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<GoogleOpeningHours>,
    pub price_level: Option<u8>,
    pub editorial_summary: Option<GoogleSummary>,
    #[serde(default)]
    pub reviews: Vec<GoogleReview>,
}

impl GooglePlace {
    pub fn location(&self) -> Option<Coordinates> {
        self.geometry.as_ref().map(|geometry| Coordinates {
            lat: geometry.location.lat,
            lon: geometry.location.lng,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct GooglePhoto {
    pub photo_reference: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GoogleGeometry {
    pub location: GoogleLatLng,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GoogleLatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GoogleOpeningHours {
    pub open_now: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GoogleSummary {
    pub overview: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GoogleReview {
    pub author_name: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub time: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
struct GooglePrediction {
    place_id: String,
    #[serde(default)]
    description: String,
}

/// Photos and reviews used to enrich a cafe found through another provider.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaceExtras {
    pub photos: Vec<String>,
    pub reviews: Vec<Review>,
}

pub struct GooglePlacesProvider {
    fetcher: Arc<dyn JsonFetcher>,
    api_key: String,
    area: SearchArea,
}

impl GooglePlacesProvider {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, api_key: String, area: SearchArea) -> Self {
        Self {
            fetcher,
            api_key,
            area,
        }
    }

    async fn call(&self, endpoint: &str, mut params: Vec<(&'static str, String)>) -> Result<GoogleEnvelope, PlacesError> {
        params.push(("key", self.api_key.clone()));
        let url = build_url(&format!("{}/{}/json", PLACES_API, endpoint), &params)?;
        let body = self.fetcher.fetch_json(&url).await?;
        let envelope: GoogleEnvelope = serde_json::from_value(body)
            .map_err(|e| PlacesError::Decode(e.to_string()))?;
        check_status(&envelope)?;
        Ok(envelope)
    }

    pub fn photo_url(&self, photo_reference: &str) -> String {
        format!(
            "{}/photo?maxwidth={}&photo_reference={}&key={}",
            PLACES_API, PHOTO_MAX_WIDTH, photo_reference, self.api_key
        )
    }

    fn to_cafe(&self, place: &GooglePlace) -> CafeDetails {
        let address = place
            .formatted_address
            .clone()
            .or_else(|| place.vicinity.clone())
            .unwrap_or_else(|| "Unknown address".to_string());
        let mut cafe = CafeDetails::new(
            place.place_id.clone().unwrap_or_default(),
            place.name.clone().unwrap_or_else(|| "Unknown Cafe".to_string()),
            address,
        );

        cafe.rating = place.rating;
        cafe.photos = place
            .photos
            .iter()
            .take(LISTING_PHOTOS)
            .map(|photo| self.photo_url(&photo.photo_reference))
            .collect();
        cafe.amenities = google_type_amenities(&place.types);
        if let Some(location) = place.location() {
            cafe.lat = Some(location.lat);
            cafe.lon = Some(location.lon);
        }
        cafe.phone_number = place.formatted_phone_number.clone();
        cafe.website = place.website.clone();
        cafe.open_now = place.opening_hours.as_ref().and_then(|hours| hours.open_now);
        cafe.price_level = place.price_level;
        cafe.description = place.editorial_summary.as_ref().and_then(|summary| summary.overview.clone());
        cafe.with_placeholder_photo()
    }

    fn location_params(&self, at: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("location", format!("{},{}", at.lat, at.lon)),
            ("radius", self.area.radius.to_string()),
        ]
    }

    async fn nearby(&self, at: Coordinates, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let mut params = self.location_params(at);
        params.push(("type", "cafe".to_string()));
        let envelope = self.call("nearbysearch", params).await?;

        Ok(envelope.results.iter().take(limit).map(|place| self.to_cafe(place)).collect())
    }

    /// Raw text-search hits, keeping Google `types` for tag matching.
    pub async fn text_search(&self, query: &str, radius: u32) -> Result<Vec<GooglePlace>, PlacesError> {
        let centre = self.area.centre;
        let params = vec![
            ("query", query.to_string()),
            ("location", format!("{},{}", centre.lat, centre.lon)),
            ("radius", radius.to_string()),
        ];
        Ok(self.call("textsearch", params).await?.results)
    }

    /// Full place record with every field the cafe page shows.
    pub async fn place(&self, place_id: &str) -> Result<GooglePlace, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::InvalidIdentifier("empty place id".to_string()));
        }

        let params = vec![
            ("place_id", place_id.to_string()),
            ("fields", DETAIL_FIELDS.to_string()),
        ];
        self.call("details", params)
            .await?
            .result
            .ok_or_else(|| PlacesError::NotFound(format!("place {}", place_id)))
    }

    pub fn place_to_cafe(&self, place: &GooglePlace) -> CafeDetails {
        self.to_cafe(place)
    }

    /// Resolves a Google place id from a free-text description, `None` when nothing matches.
    pub async fn find_place_id(&self, query: &str) -> Result<Option<String>, PlacesError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlacesError::InvalidIdentifier("empty cafe name".to_string()));
        }

        let params = vec![
            ("input", query.to_string()),
            ("inputtype", "textquery".to_string()),
            ("fields", "place_id".to_string()),
        ];
        let envelope = self.call("findplacefromtext", params).await?;
        Ok(envelope.candidates.into_iter().find_map(|candidate| candidate.place_id))
    }

    /// Up to `photo_limit` photo URLs and `review_limit` reviews of a Google place.
    pub async fn place_extras(
        &self,
        google_place_id: &str,
        photo_limit: usize,
        review_limit: usize,
    ) -> Result<PlaceExtras, PlacesError> {
        let params = vec![
            ("place_id", google_place_id.to_string()),
            ("fields", "photos,reviews".to_string()),
        ];
        let envelope = self.call("details", params).await?;
        let place = match envelope.result {
            Some(place) => place,
            None => return Ok(PlaceExtras::default()),
        };

        Ok(PlaceExtras {
            photos: place
                .photos
                .iter()
                .take(photo_limit)
                .map(|photo| self.photo_url(&photo.photo_reference))
                .collect(),
            reviews: parse_google_reviews(&place.reviews).into_iter().take(review_limit).collect(),
        })
    }

    pub async fn reviews(&self, google_place_id: &str) -> Result<Vec<Review>, PlacesError> {
        let google_place_id = google_place_id.trim();
        if google_place_id.is_empty() {
            return Err(PlacesError::InvalidIdentifier("empty place id".to_string()));
        }

        let params = vec![
            ("place_id", google_place_id.to_string()),
            ("fields", "reviews".to_string()),
        ];
        let envelope = self.call("details", params).await?;
        Ok(envelope
            .result
            .map(|place| parse_google_reviews(&place.reviews))
            .unwrap_or_default())
    }
}

fn check_status(envelope: &GoogleEnvelope) -> Result<(), PlacesError> {
    status_to_result(&envelope.status, envelope.error_message.as_deref())
}

/// Status check on a raw Places body. Google reports quota and request
/// errors with HTTP 200, so this runs before a body may be cached.
pub fn google_body_status(body: &Value) -> Result<(), PlacesError> {
    status_to_result(
        body["status"].as_str().unwrap_or_default(),
        body["error_message"].as_str(),
    )
}

fn status_to_result(status: &str, error_message: Option<&str>) -> Result<(), PlacesError> {
    let detail = || error_message.unwrap_or(status).to_string();

    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" | "REQUEST_DENIED" => Err(PlacesError::Quota(detail())),
        "NOT_FOUND" => Err(PlacesError::NotFound(detail())),
        "INVALID_REQUEST" => Err(PlacesError::InvalidIdentifier(detail())),
        "" => Err(PlacesError::Decode("missing `status`".to_string())),
        other => {
            warn!("Google Places answered with status: {}", other);
            Err(PlacesError::Vendor(detail()))
        }
    }
}

/// Converts raw reviews, clamping ratings into 1-5 and Unix seconds into RFC 3339.
pub fn parse_google_reviews(reviews: &[GoogleReview]) -> Vec<Review> {
    reviews
        .iter()
        .map(|review| {
            let author_name = review
                .author_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Anonymous".to_string());
            let text = review
                .text
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "No review text provided".to_string());
            let time = OffsetDateTime::from_unix_timestamp(review.time.unwrap_or(0))
                .unwrap_or(OffsetDateTime::UNIX_EPOCH)
                .format(&Rfc3339)
                .unwrap_or_default();

            Review {
                author_name,
                rating: review.rating.unwrap_or(0.0).clamp(1.0, 5.0),
                text,
                time,
            }
        })
        .collect()
}

#[async_trait]
impl PlacesProvider for GooglePlacesProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn top_cafes(&self, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        self.nearby(self.area.centre, limit).await
    }

    async fn cafe_details(&self, place_id: &str) -> Result<CafeDetails, PlacesError> {
        let place = self.place(place_id).await?;
        let mut cafe = self.to_cafe(&place);
        if cafe.place_id.is_empty() {
            cafe.place_id = place_id.trim().to_string();
        }
        Ok(cafe)
    }

    async fn search_by_text(&self, query: &str, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        let query = format!("{} cafe {}", query.trim(), self.area.city);
        let places = self.text_search(&query, self.area.radius).await?;
        Ok(places.iter().take(limit).map(|place| self.to_cafe(place)).collect())
    }

    async fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<CafeSuggestion>, PlacesError> {
        let mut params = self.location_params(self.area.centre);
        params.push(("input", query.to_string()));
        params.push(("types", "establishment".to_string()));
        params.push(("strictbounds", "true".to_string()));
        let predictions = self.call("autocomplete", params).await?.predictions;

        let lookups = predictions.iter().take(limit).map(|prediction| async move {
            let params = vec![
                ("place_id", prediction.place_id.clone()),
                ("fields", "name,geometry".to_string()),
            ];
            match self.call("details", params).await {
                Ok(envelope) => envelope.result.and_then(|place| {
                    let location = place.location()?;
                    Some(CafeSuggestion {
                        name: place.name.clone().unwrap_or_else(|| prediction.description.clone()),
                        place_id: prediction.place_id.clone(),
                        lat: location.lat,
                        lon: location.lon,
                    })
                }),
                Err(e) => {
                    debug!("Dropping suggestion {} due to: {}", prediction.place_id, e);
                    None
                }
            }
        });

        Ok(join_all(lookups).await.into_iter().flatten().collect())
    }

    async fn cafes_near(&self, at: Coordinates, limit: usize) -> Result<Vec<CafeDetails>, PlacesError> {
        self.nearby(at, limit).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use super::*;
    use crate::config::BackoffKind;
    use crate::services::cache::ResponseCache;
    use crate::services::fetcher::testing::StaticFetcher;
    use crate::services::fetcher::CachedFetcher;
    use crate::services::retry::{retry, RetryPolicy};
    use serde_json::json;

    fn provider(fetcher: Arc<StaticFetcher>) -> GooglePlacesProvider {
        GooglePlacesProvider::new(
            fetcher,
            "gkey".to_string(),
            SearchArea {
                city: "Dumaguete City".to_string(),
                centre: Coordinates { lat: 9.3076, lon: 123.3080 },
                radius: 5000,
            },
        )
    }

    #[test]
    fn reviews_are_clamped_and_defaulted() {
        let reviews = parse_google_reviews(&[
            GoogleReview {
                author_name: Some("Ana".to_string()),
                rating: Some(7.0),
                text: Some("Great brew".to_string()),
                time: Some(1_700_000_000),
            },
            GoogleReview::default(),
        ]);

        assert_eq!(reviews[0].rating, 5.0);
        assert_eq!(reviews[0].time, "2023-11-14T22:13:20Z");
        assert_eq!(reviews[1].author_name, "Anonymous");
        assert_eq!(reviews[1].text, "No review text provided");
        assert_eq!(reviews[1].rating, 1.0);
        assert_eq!(reviews[1].time, "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn nearby_results_are_normalized() {
        let fetcher = Arc::new(StaticFetcher::new().route(
            "nearbysearch",
            json!({
                "status": "OK",
                "results": [{
                    "place_id": "ChIJ1",
                    "name": "Sans Rival Bistro",
                    "vicinity": "San Jose St",
                    "rating": 4.5,
                    "types": ["cafe", "restaurant"],
                    "photos": [{ "photo_reference": "r1" }, { "photo_reference": "r2" }],
                    "geometry": { "location": { "lat": 9.3081, "lng": 123.3078 } },
                    "opening_hours": { "open_now": true }
                }, {
                    "place_id": "ChIJ2"
                }]
            }),
        ));
        let cafes = provider(fetcher).top_cafes(5).await.unwrap();

        assert_eq!(cafes.len(), 2);
        assert_eq!(cafes[0].address, "San Jose St");
        assert_eq!(cafes[0].photos.len(), 2);
        assert!(cafes[0].photos[0].contains("photo_reference=r1"));
        assert_eq!(cafes[0].open_now, Some(true));
        assert!(cafes[0].amenities.contains("Coffee"));
        assert!(cafes[0].amenities.contains("Food"));

        assert_eq!(cafes[1].name, "Unknown Cafe");
        assert_eq!(cafes[1].rating, None);
        assert_eq!(cafes[1].photos.len(), 1);
    }

    #[tokio::test]
    async fn vendor_statuses_become_errors() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .route("nearbysearch", json!({ "status": "OVER_QUERY_LIMIT", "error_message": "quota" }))
                .route("details", json!({ "status": "NOT_FOUND" })),
        );
        let provider = provider(fetcher);

        assert_eq!(provider.top_cafes(5).await, Err(PlacesError::Quota("quota".to_string())));
        assert!(matches!(provider.cafe_details("x").await, Err(PlacesError::NotFound(_))));
    }

    #[tokio::test]
    async fn request_denied_counts_as_quota() {
        let fetcher = Arc::new(StaticFetcher::new().route("textsearch", json!({ "status": "REQUEST_DENIED" })));

        let result = provider(fetcher).search_by_text("kava", 5).await;
        assert_eq!(result, Err(PlacesError::Quota("REQUEST_DENIED".to_string())));
        assert!(google_body_status(&json!({ "status": "REQUEST_DENIED" })).unwrap_err().is_transient());
    }

    #[test]
    fn body_status_accepts_only_answers() {
        assert!(google_body_status(&json!({ "status": "OK" })).is_ok());
        assert!(google_body_status(&json!({ "status": "ZERO_RESULTS" })).is_ok());
        assert!(google_body_status(&json!({ "status": "UNKNOWN_ERROR" })).is_err());
        assert!(google_body_status(&json!({ "status": "INVALID_REQUEST" })).is_err());
        assert!(google_body_status(&json!([])).is_err());
    }

    #[tokio::test]
    async fn quota_bodies_are_not_cached_and_every_attempt_reaches_google() {
        let upstream = Arc::new(StaticFetcher::new().route(
            "nearbysearch",
            json!({ "status": "OVER_QUERY_LIMIT", "error_message": "quota" }),
        ));
        let cache = Arc::new(ResponseCache::new(16, Some(Duration::from_secs(60))));
        let cached = CachedFetcher::new(upstream.clone(), cache.clone()).with_validator(google_body_status);
        let provider = GooglePlacesProvider::new(
            Arc::new(cached),
            "gkey".to_string(),
            SearchArea {
                city: "Dumaguete City".to_string(),
                centre: Coordinates { lat: 9.3076, lon: 123.3080 },
                radius: 5000,
            },
        );
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
            backoff: BackoffKind::Fixed,
        };

        let result = retry(&policy, "google top", || provider.top_cafes(5)).await;

        assert_eq!(result, Err(PlacesError::Quota("quota".to_string())));
        assert_eq!(upstream.call_count(), 3);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn zero_results_is_an_empty_list() {
        let fetcher = Arc::new(StaticFetcher::new().route("textsearch", json!({ "status": "ZERO_RESULTS", "results": [] })));
        assert!(provider(fetcher).search_by_text("nothing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_place_id_takes_first_candidate() {
        let fetcher = Arc::new(StaticFetcher::new().route(
            "findplacefromtext",
            json!({ "status": "OK", "candidates": [{ "place_id": "ChIJfirst" }, { "place_id": "ChIJsecond" }] }),
        ));
        let provider = provider(fetcher.clone());

        assert_eq!(provider.find_place_id("Kava, Dumaguete").await.unwrap(), Some("ChIJfirst".to_string()));
        assert!(fetcher.requested()[0].contains("inputtype=textquery"));
        assert!(provider.find_place_id(" ").await.is_err());
    }

    #[tokio::test]
    async fn extras_are_truncated() {
        let fetcher = Arc::new(StaticFetcher::new().route(
            "details",
            json!({ "status": "OK", "result": {
                "photos": [{ "photo_reference": "a" }, { "photo_reference": "b" }, { "photo_reference": "c" }],
                "reviews": [
                    { "author_name": "A", "rating": 5, "text": "x", "time": 1 },
                    { "author_name": "B", "rating": 4, "text": "y", "time": 2 },
                    { "author_name": "C", "rating": 3, "text": "z", "time": 3 },
                    { "author_name": "D", "rating": 2, "text": "w", "time": 4 }
                ]
            }}),
        ));
        let extras = provider(fetcher).place_extras("ChIJ1", 2, 3).await.unwrap();

        assert_eq!(extras.photos.len(), 2);
        assert_eq!(extras.reviews.len(), 3);
        assert_eq!(extras.reviews[2].author_name, "C");
    }

    #[tokio::test]
    async fn suggestions_resolve_coordinates() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .route("autocomplete", json!({ "status": "OK", "predictions": [
                    { "place_id": "p1", "description": "Kava, Dumaguete" }
                ]}))
                .route("details", json!({ "status": "OK", "result": {
                    "name": "Kava Modern Filipino",
                    "geometry": { "location": { "lat": 9.3, "lng": 123.3 } }
                }})),
        );
        let suggestions = provider(fetcher).suggestions("kava", 5).await.unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].place_id, "p1");
        assert_eq!(suggestions[0].name, "Kava Modern Filipino");
    }
}
