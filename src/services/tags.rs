use std::collections::BTreeSet;
use crate::models::cafe::CafeDetails;
use crate::services::normalize::{COFFEE, WIFI};

const STUDY_SPOT: &str = "Study Spot";
const WORK_FRIENDLY: &str = "Work-Friendly";
const DATE_SPOT: &str = "Date Spot";
const DATE_SPOT_MIN_RATING: f64 = 4.0;

/// Search keywords for a tag. Unknown tags search for themselves.
pub fn tag_keywords(tag: &str) -> Vec<String> {
    let keywords: &[&str] = match tag {
        "Coffee" => &["coffee", "espresso", "latte"],
        "Brunch" => &["brunch", "breakfast", "lunch"],
        "Pastries" => &["bakery", "pastry", "dessert"],
        STUDY_SPOT => &["quiet", "wifi", "study"],
        DATE_SPOT => &["romantic", "cozy", "intimate"],
        WORK_FRIENDLY => &["wifi", "outlets", "workspace"],
        other => return vec![other.to_lowercase()],
    };
    keywords.iter().map(|k| k.to_string()).collect()
}

/// Text query used for a tag search, e.g. `cafe coffee espresso latte Dumaguete City`.
pub fn tag_query(tags: &[String], city: &str) -> String {
    let keywords = tags
        .iter()
        .flat_map(|tag| tag_keywords(tag))
        .collect::<Vec<String>>();

    if keywords.is_empty() {
        format!("cafe {}", city)
    } else {
        format!("cafe {} {}", keywords.join(" "), city)
    }
}

/// A raw search hit matches when any tag keyword appears in its types or name.
/// An empty tag list matches everything.
pub fn matches_tags(name: &str, types: &[String], rating: Option<f64>, tags: &[String]) -> bool {
    if tags.is_empty() {
        return true;
    }

    let name = name.to_lowercase();
    tags.iter().any(|tag| {
        if tag == DATE_SPOT && rating.unwrap_or(0.0) >= DATE_SPOT_MIN_RATING {
            return true;
        }
        tag_keywords(tag)
            .iter()
            .any(|keyword| types.iter().any(|t| t == keyword) || name.contains(keyword.as_str()))
    })
}

/// Amenities implied by Google place types, the requested tags and rating.
pub fn infer_tag_amenities(types: &[String], rating: Option<f64>, tags: &[String]) -> BTreeSet<String> {
    let has_type = |wanted: &str| types.iter().any(|t| t == wanted);
    let has_tag = |wanted: &str| tags.iter().any(|t| t == wanted);
    let well_rated = rating.unwrap_or(0.0) >= 4.0;
    let mut amenities = BTreeSet::new();

    if has_type("cafe") {
        amenities.insert(COFFEE.to_string());
    }
    if has_type("cafe") || has_type("coffee_shop") || has_tag(STUDY_SPOT) || has_tag(WORK_FRIENDLY) || well_rated {
        amenities.insert(WIFI.to_string());
    }
    if has_type("bakery") || has_type("cafe") || has_type("food") {
        amenities.insert("Pastries".to_string());
    }
    if has_type("breakfast") || has_type("restaurant") || has_type("food") {
        amenities.insert("Brunch".to_string());
    }
    if well_rated {
        amenities.insert("Cozy".to_string());
    }

    amenities
}

/// Final OR filter over enriched cafes.
pub fn cafe_matches_tags(cafe: &CafeDetails, tags: &[String]) -> bool {
    if tags.is_empty() {
        return true;
    }

    let name = cafe.name.to_lowercase();
    let has_wifi = cafe.amenities.contains(WIFI);
    tags.iter().any(|tag| {
        let keywords = tag_keywords(tag);
        cafe.amenities
            .iter()
            .any(|amenity| keywords.contains(&amenity.to_lowercase()))
            || name.contains(&tag.to_lowercase())
            || ((tag == STUDY_SPOT || tag == WORK_FRIENDLY) && has_wifi)
            || (tag == DATE_SPOT && cafe.rating.unwrap_or(0.0) >= DATE_SPOT_MIN_RATING)
    })
}

/// Splits a comma separated tag parameter, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}
