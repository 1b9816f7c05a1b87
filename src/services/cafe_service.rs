use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::helpers::errors::PlacesError;
use crate::models::cafe::{CafeDetails, CafeListing, CafeSuggestion, CafeView, Coordinates, DataOrigin};
use crate::models::review::Review;
use crate::services::fallback::{default_description, fallback_cafes, fallback_tag_cafes};
use crate::services::providers::google::{GooglePlace, GooglePlacesProvider, PlaceExtras};
use crate::services::providers::{PlacesProvider, SearchArea};
use crate::services::retry::{retry, RetryPolicy};
use crate::services::tags::{cafe_matches_tags, infer_tag_amenities, matches_tags, tag_query};

const DETAIL_BATCH: usize = 5;
const BATCH_STAGGER: Duration = Duration::from_millis(100);
const VIEW_PHOTOS: usize = 2;
const VIEW_REVIEWS: usize = 3;

#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub top: usize,
    pub search: usize,
    pub near: usize,
    pub tags: usize,
    pub suggestions: usize,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top: config.top_limit,
            search: config.search_limit,
            near: config.near_limit,
            tags: config.tag_limit,
            suggestions: config.search_limit,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            top: 5,
            search: 5,
            near: 30,
            tags: 15,
            suggestions: 5,
        }
    }
}

#[derive(Debug)]
enum ListingQuery {
    Top,
    Text(String),
    Near(Coordinates),
}

/// Entry point for everything cafe related: picks providers, retries,
/// falls back, and enriches results.
pub struct CafeService {
    primary: Arc<dyn PlacesProvider>,
    secondary: Option<Arc<dyn PlacesProvider>>,
    google: Option<Arc<GooglePlacesProvider>>,
    retry: RetryPolicy,
    limits: Limits,
    area: SearchArea,
}

impl CafeService {
    pub fn new(
        primary: Arc<dyn PlacesProvider>,
        secondary: Option<Arc<dyn PlacesProvider>>,
        google: Option<Arc<GooglePlacesProvider>>,
        retry: RetryPolicy,
        limits: Limits,
        area: SearchArea,
    ) -> Self {
        Self {
            primary,
            secondary,
            google,
            retry,
            limits,
            area,
        }
    }

    async fn query_provider(
        &self,
        provider: &dyn PlacesProvider,
        query: &ListingQuery,
    ) -> Result<Vec<CafeDetails>, PlacesError> {
        let label = format!("{} {:?}", provider.name(), query);
        retry(&self.retry, &label, || async move {
            match query {
                ListingQuery::Top => provider.top_cafes(self.limits.top).await,
                ListingQuery::Text(text) => provider.search_by_text(text, self.limits.search).await,
                ListingQuery::Near(at) => provider.cafes_near(*at, self.limits.near).await,
            }
        })
        .await
    }

    /// Primary, then secondary. With `empty_is_failure` an empty answer also
    /// moves on to the next source. Errs with the last failure seen.
    async fn provider_listing(&self, query: &ListingQuery, empty_is_failure: bool) -> Result<CafeListing, PlacesError> {
        let mut sources: Vec<(&dyn PlacesProvider, DataOrigin)> = vec![(self.primary.as_ref(), DataOrigin::Primary)];
        if let Some(secondary) = &self.secondary {
            sources.push((secondary.as_ref(), DataOrigin::Secondary));
        }

        let mut last_error = PlacesError::NotFound("No results found".to_string());
        for (provider, origin) in sources {
            match self.query_provider(provider, query).await {
                Ok(cafes) if cafes.is_empty() && empty_is_failure => {
                    info!("{} found no cafes for {:?}", provider.name(), query);
                    last_error = PlacesError::NotFound("No results found".to_string());
                }
                Ok(cafes) => return Ok(CafeListing::new(cafes, origin)),
                Err(e) => {
                    warn!("{} could not answer {:?} due to: {}", provider.name(), query, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// [`Self::provider_listing`], then the static list.
    async fn listing(&self, query: ListingQuery, empty_is_failure: bool) -> CafeListing {
        match self.provider_listing(&query, empty_is_failure).await {
            Ok(listing) => listing,
            Err(_) => {
                warn!("Serving fallback cafes for {:?}", query);
                CafeListing::new(fallback_cafes(&self.area.city, self.area.centre), DataOrigin::Fallback)
            }
        }
    }

    pub async fn fetch_top_cafes(&self) -> CafeListing {
        self.listing(ListingQuery::Top, true).await
    }

    pub async fn search_cafes_by_text(&self, query: &str) -> CafeListing {
        let query = query.trim();
        if query.is_empty() {
            return CafeListing::new(Vec::new(), DataOrigin::Primary);
        }
        self.listing(ListingQuery::Text(query.to_string()), false).await
    }

    pub async fn fetch_cafes_near_location(&self, lat: f64, lon: f64) -> Result<CafeListing, PlacesError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(PlacesError::InvalidIdentifier(format!("coordinates out of range: {}, {}", lat, lon)));
        }
        Ok(self.listing(ListingQuery::Near(Coordinates { lat, lon }), true).await)
    }

    pub async fn fetch_cafe_details(&self, place_id: &str) -> Result<CafeDetails, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::InvalidIdentifier("Invalid place ID".to_string()));
        }

        let label = format!("{} details {}", self.primary.name(), place_id);
        let primary = retry(&self.retry, &label, || self.primary.cafe_details(place_id)).await;
        let error = match primary {
            Ok(cafe) => return Ok(cafe.with_placeholder_photo()),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        match &self.secondary {
            Some(secondary) => {
                info!("Asking {} for place {} after: {}", secondary.name(), place_id, error);
                let label = format!("{} details {}", secondary.name(), place_id);
                retry(&self.retry, &label, || secondary.cafe_details(place_id))
                    .await
                    .map(CafeDetails::with_placeholder_photo)
            }
            None => Err(error),
        }
    }

    /// First text-search hit, resolved to full details when it came from the
    /// primary provider. Never answers with static fallback data.
    pub async fn search_cafe_and_get_details(&self, query: &str) -> Result<CafeDetails, PlacesError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlacesError::NotFound("No results found".to_string()));
        }

        let listing = self
            .provider_listing(&ListingQuery::Text(query.to_string()), false)
            .await?;
        let first = listing
            .cafes
            .into_iter()
            .next()
            .ok_or_else(|| PlacesError::NotFound("No results found".to_string()))?;

        match listing.origin {
            DataOrigin::Primary => self.fetch_cafe_details(&first.place_id).await,
            _ => Ok(first),
        }
    }

    pub async fn fetch_place_suggestions(&self, query: &str) -> Vec<CafeSuggestion> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut sources = vec![self.primary.clone()];
        sources.extend(self.secondary.clone());
        for provider in sources {
            let label = format!("{} suggestions", provider.name());
            let provider = provider.as_ref();
            match retry(&self.retry, &label, || provider.suggestions(query, self.limits.suggestions)).await {
                Ok(suggestions) => return suggestions,
                Err(e) => warn!("Error fetching suggestions from {}: {}", provider.name(), e),
            }
        }
        Vec::new()
    }

    fn tag_fallback(&self) -> CafeListing {
        CafeListing::new(fallback_tag_cafes(&self.area.city, self.area.centre), DataOrigin::Fallback)
    }

    pub async fn fetch_cafes_by_tags(&self, tags: &[String]) -> CafeListing {
        let google = match &self.google {
            Some(google) => google.clone(),
            None => {
                warn!("Tag search needs the Google provider, serving fallback cafes");
                return self.tag_fallback();
            }
        };

        let query = tag_query(tags, &self.area.city);
        let radius = self.area.radius;
        let hits = match retry(&self.retry, "google tag search", || google.text_search(&query, radius)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Error fetching cafes with query {:?}: {}", query, e);
                return self.tag_fallback();
            }
        };

        let candidates: Vec<GooglePlace> = hits
            .into_iter()
            .filter(|hit| hit.place_id.is_some())
            .filter(|hit| matches_tags(hit.name.as_deref().unwrap_or_default(), &hit.types, hit.rating, tags))
            .take(self.limits.tags)
            .collect();

        let mut detailed = Vec::with_capacity(candidates.len());
        for batch in candidates.chunks(DETAIL_BATCH) {
            let lookups = batch.iter().enumerate().map(|(index, hit)| {
                let google = google.clone();
                async move {
                    tokio::time::sleep(BATCH_STAGGER * index as u32).await;
                    self.enrich_tag_hit(&google, hit, tags).await
                }
            });
            detailed.extend(join_all(lookups).await);
        }

        let filtered: Vec<CafeDetails> = detailed
            .iter()
            .filter(|cafe| {
                let keep = cafe_matches_tags(cafe, tags);
                if !keep {
                    debug!("Cafe {:?} filtered out for tags {:?}", cafe.name, tags);
                }
                keep
            })
            .cloned()
            .collect();

        if !filtered.is_empty() {
            CafeListing::new(filtered, DataOrigin::Primary)
        } else if !detailed.is_empty() {
            CafeListing::new(detailed, DataOrigin::Primary)
        } else {
            self.tag_fallback()
        }
    }

    async fn enrich_tag_hit(&self, google: &GooglePlacesProvider, hit: &GooglePlace, tags: &[String]) -> CafeDetails {
        let place_id = hit.place_id.clone().unwrap_or_default();
        let details = match google.place(&place_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!("Error fetching details for place {}: {}", place_id, e);
                None
            }
        };

        let mut cafe = google.place_to_cafe(details.as_ref().unwrap_or(hit));
        cafe.place_id = place_id;
        cafe.name = hit.name.clone().unwrap_or_else(|| "Unknown Cafe".to_string());
        cafe.address = details
            .as_ref()
            .and_then(|details| details.formatted_address.clone())
            .or_else(|| hit.vicinity.clone())
            .unwrap_or_else(|| "Unknown address".to_string());
        cafe.rating = hit.rating;
        cafe.amenities = infer_tag_amenities(&hit.types, hit.rating, tags);
        let location = hit.location().unwrap_or(self.area.centre);
        cafe.lat = Some(location.lat);
        cafe.lon = Some(location.lon);
        cafe
    }

    fn primary_is_google(&self) -> bool {
        self.primary.name() == "google"
    }

    /// Google place id for a cafe, resolving by name and address when the
    /// cafe came from another provider.
    async fn google_place_id(
        &self,
        google: &GooglePlacesProvider,
        place_id: &str,
        name: &str,
        address: &str,
    ) -> Result<Option<String>, PlacesError> {
        if self.primary_is_google() && !place_id.trim().is_empty() {
            return Ok(Some(place_id.trim().to_string()));
        }

        let query = if address.trim().is_empty() {
            name.to_string()
        } else {
            format!("{}, {}", name, address)
        };
        retry(&self.retry, "google find place", || google.find_place_id(&query)).await
    }

    pub async fn fetch_reviews(&self, place_id: &str, name: Option<&str>) -> Result<Vec<Review>, PlacesError> {
        let google = self
            .google
            .clone()
            .ok_or_else(|| PlacesError::Vendor("Google Places is not configured".to_string()))?;

        let name = name.map(str::trim).filter(|name| !name.is_empty());
        let (name, address) = match name {
            Some(name) => (name.to_string(), String::new()),
            None if self.primary_is_google() => (String::new(), String::new()),
            None => {
                let cafe = self.fetch_cafe_details(place_id).await?;
                (cafe.name, cafe.address)
            }
        };
        if place_id.trim().is_empty() && name.is_empty() {
            return Err(PlacesError::InvalidIdentifier("Invalid Place ID".to_string()));
        }

        let google_id = self
            .google_place_id(&google, place_id, &name, &address)
            .await?
            .ok_or_else(|| PlacesError::NotFound("Could not find Place ID for the provided cafe name".to_string()))?;

        retry(&self.retry, "google reviews", || google.reviews(&google_id)).await
    }

    async fn view_extras(&self, cafe: &CafeDetails) -> PlaceExtras {
        let google = match &self.google {
            Some(google) => google.clone(),
            None => return PlaceExtras::default(),
        };

        let google_id = match self.google_place_id(&google, &cafe.place_id, &cafe.name, &cafe.address).await {
            Ok(Some(google_id)) => google_id,
            Ok(None) => {
                debug!("No Google match for {}", cafe.name);
                return PlaceExtras::default();
            }
            Err(e) => {
                warn!("Google Place ID error: {}", e);
                return PlaceExtras::default();
            }
        };

        match google.place_extras(&google_id, VIEW_PHOTOS, VIEW_REVIEWS).await {
            Ok(extras) => extras,
            Err(e) => {
                warn!("Google API error: {}", e);
                PlaceExtras::default()
            }
        }
    }

    pub async fn fetch_cafe_view(&self, place_id: &str) -> Result<CafeView, PlacesError> {
        let cafe = self.fetch_cafe_details(place_id).await?;
        let extras = self.view_extras(&cafe).await;

        let photos = if extras.photos.is_empty() {
            cafe.photos.clone()
        } else {
            extras.photos
        };
        let description = cafe
            .description
            .clone()
            .unwrap_or_else(|| default_description(&cafe.place_id).to_string());

        Ok(CafeView {
            cafe,
            photos,
            reviews: extras.reviews,
            description,
        })
    }
}
