use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use crate::models::review::Review;

pub const PLACEHOLDER_PHOTO: &str = "https://via.placeholder.com/400x300?text=No+Image";

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CafeDetails {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub photos: Vec<String>,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "openNow")]
    pub open_now: Option<bool>,
    #[serde(rename = "priceLevel")]
    pub price_level: Option<u8>,
    pub description: Option<String>,
}

impl CafeDetails {
    pub fn new(place_id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            name: name.into(),
            address: address.into(),
            rating: None,
            photos: Vec::new(),
            amenities: BTreeSet::new(),
            lat: None,
            lon: None,
            phone_number: None,
            website: None,
            open_now: None,
            price_level: None,
            description: None,
        }
    }

    /// UI-facing records always carry at least one photo.
    pub fn with_placeholder_photo(mut self) -> Self {
        self.photos.retain(|photo| !photo.trim().is_empty());
        if self.photos.is_empty() {
            self.photos.push(PLACEHOLDER_PHOTO.to_string());
        }
        self
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CafeSuggestion {
    pub name: String,
    pub place_id: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Primary,
    Secondary,
    Fallback,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CafeListing {
    pub cafes: Vec<CafeDetails>,
    pub origin: DataOrigin,
}

impl CafeListing {
    pub fn new(cafes: Vec<CafeDetails>, origin: DataOrigin) -> Self {
        Self {
            cafes: cafes.into_iter().map(CafeDetails::with_placeholder_photo).collect(),
            origin,
        }
    }
}

/// Everything the cafe page needs in one response.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CafeView {
    pub cafe: CafeDetails,
    pub photos: Vec<String>,
    pub reviews: Vec<Review>,
    pub description: String,
}
