//! Field-mapping helpers shared by the provider adapters.
//!
//! Nothing here invents data: a value the provider does not supply stays
//! `None` (or is left out of the amenity set).

use std::collections::BTreeSet;
use serde_json::Value;
use time::{OffsetDateTime, Weekday};
use tracing::debug;

pub const COFFEE: &str = "Coffee";
pub const WIFI: &str = "Wi-Fi";
pub const TAKEAWAY: &str = "Takeaway";
pub const OUTDOOR_SEATING: &str = "Outdoor Seating";
pub const AIR_CONDITIONING: &str = "Air Conditioning";
pub const POWER_OUTLETS: &str = "Power Outlets";
pub const BREAKFAST: &str = "Breakfast";
pub const STUDY_FRIENDLY: &str = "Study-Friendly";
pub const PET_FRIENDLY: &str = "Pet-Friendly";
pub const FOOD: &str = "Food";

pub const PHOTO_SIZE: u32 = 400;

/// Joins the non-empty address parts, falling back to `city` when none are left.
pub fn join_address(parts: &[Option<&str>], city: &str) -> String {
    let joined = parts
        .iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join(", ");

    if joined.is_empty() {
        city.to_string()
    } else {
        joined
    }
}

fn is_yes(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

fn has_internet(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s == "wlan" || s == "yes",
        Some(Value::Bool(flag)) => *flag,
        _ => false,
    }
}

/// Amenities from Geoapify place properties.
pub fn geoapify_amenities(properties: &Value) -> BTreeSet<String> {
    let mut amenities = BTreeSet::new();

    let is_cafe = properties["categories"]
        .as_array()
        .map(|categories| categories.iter().any(|c| c.as_str() == Some("catering.cafe")))
        .unwrap_or(false);
    if is_cafe {
        amenities.insert(COFFEE.to_string());
    }
    if is_yes(properties.get("takeaway")) {
        amenities.insert(TAKEAWAY.to_string());
    }
    if is_yes(properties.get("outdoor_seating")) {
        amenities.insert(OUTDOOR_SEATING.to_string());
    }
    if has_internet(properties.get("internet_access")) {
        amenities.insert(WIFI.to_string());
    }
    if is_yes(properties.get("air_conditioning")) {
        amenities.insert(AIR_CONDITIONING.to_string());
    }

    amenities
}

/// Amenities from OpenStreetMap tags.
pub fn osm_amenities(tags: &Value) -> BTreeSet<String> {
    let mut amenities = BTreeSet::new();
    let cuisine = tags["cuisine"].as_str().unwrap_or_default();

    if cuisine == "coffee_shop" {
        amenities.insert(COFFEE.to_string());
    }
    if is_yes(tags.get("takeaway")) {
        amenities.insert(TAKEAWAY.to_string());
    }
    if cuisine.contains("breakfast") {
        amenities.insert(BREAKFAST.to_string());
    }
    if has_internet(tags.get("internet_access")) {
        amenities.insert(WIFI.to_string());
    }
    if is_yes(tags.get("outdoor_seating")) {
        amenities.insert(OUTDOOR_SEATING.to_string());
    }
    if is_yes(tags.get("socket:power")) {
        amenities.insert(POWER_OUTLETS.to_string());
    }
    if is_yes(tags.get("air_conditioning")) {
        amenities.insert(AIR_CONDITIONING.to_string());
    }
    if is_yes(tags.get("study")) {
        amenities.insert(STUDY_FRIENDLY.to_string());
    }
    if is_yes(tags.get("dog")) || is_yes(tags.get("pet")) {
        amenities.insert(PET_FRIENDLY.to_string());
    }

    amenities
}

/// Amenities from Google place `types`.
pub fn google_type_amenities(types: &[String]) -> BTreeSet<String> {
    let mut amenities = BTreeSet::new();
    for place_type in types {
        match place_type.as_str() {
            "meal_takeaway" => amenities.insert(TAKEAWAY.to_string()),
            "restaurant" => amenities.insert(FOOD.to_string()),
            "cafe" => amenities.insert(COFFEE.to_string()),
            _ => false,
        };
    }
    amenities
}

/// `"$$"` style price levels count the dollar signs; numeric strings parse directly.
pub fn parse_price_level(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) if s.contains('$') => {
            let count = s.matches('$').count();
            u8::try_from(count).ok()
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn minutes_of(clock: &str) -> Option<u32> {
    let (hour, minute) = clock.trim().split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    if hour > 24 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.trim().to_ascii_lowercase();
    let weekday = match lower.as_str() {
        "mo" | "monday" => Weekday::Monday,
        "tu" | "tuesday" => Weekday::Tuesday,
        "we" | "wednesday" => Weekday::Wednesday,
        "th" | "thursday" => Weekday::Thursday,
        "fr" | "friday" => Weekday::Friday,
        "sa" | "saturday" => Weekday::Saturday,
        "su" | "sunday" => Weekday::Sunday,
        _ => return None,
    };
    Some(weekday)
}

fn minute_of_day(now: OffsetDateTime) -> u32 {
    u32::from(now.hour()) * 60 + u32::from(now.minute())
}

fn within(current: u32, open: u32, close: u32) -> bool {
    if close <= open {
        // past midnight
        current >= open || current < close
    } else {
        current >= open && current < close
    }
}

/// Open status from structured hours: `{"monday": [{"open": "08:00", "close": "20:00"}]}`.
/// Plain strings are read as OpenStreetMap `opening_hours`.
pub fn open_status_from_structured(hours: &Value, now: OffsetDateTime) -> Option<bool> {
    if let Some(raw) = hours.as_str() {
        return open_status_from_osm(raw, now);
    }

    let days = hours.as_object()?;
    let current = minute_of_day(now);
    for (day, periods) in days {
        if weekday_from_name(day) != Some(now.weekday()) {
            continue;
        }

        let periods = periods.as_array()?;
        for period in periods {
            let open = minutes_of(period["open"].as_str()?)?;
            let close = minutes_of(period["close"].as_str()?)?;
            if within(current, open, close) {
                return Some(true);
            }
        }
        return Some(false);
    }
    None
}

/// `None` when the selector holds something other than weekdays (`PH`, `SH`, months).
fn days_match(days: &str, today: Weekday) -> Option<bool> {
    for part in days.split(',') {
        let part = part.trim();
        if let Some((from, to)) = part.split_once('-') {
            let from = weekday_from_name(from)?.number_days_from_monday();
            let to = weekday_from_name(to)?.number_days_from_monday();
            let day = today.number_days_from_monday();
            let hit = if from <= to {
                day >= from && day <= to
            } else {
                day >= from || day <= to
            };
            if hit {
                return Some(true);
            }
        } else if weekday_from_name(part)? == today {
            return Some(true);
        }
    }
    Some(false)
}

/// Open status from an OpenStreetMap `opening_hours` value such as
/// `"Mo-Fr 08:00-20:00; Sa 09:00-14:00"`. Unsupported syntax yields `None`.
pub fn open_status_from_osm(raw: &str, now: OffsetDateTime) -> Option<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw == "24/7" {
        return Some(true);
    }

    let current = minute_of_day(now);
    let mut matched_day = false;
    for rule in raw.split(';') {
        let rule = rule.trim();
        if rule.is_empty() {
            continue;
        }

        let (days, ranges) = match rule.split_once(' ') {
            Some((days, ranges)) if days.chars().next()?.is_ascii_alphabetic() => (days, ranges),
            _ => ("Mo-Su", rule),
        };
        match days_match(days, now.weekday()) {
            Some(true) => {}
            Some(false) => continue,
            None => {
                debug!("Skipping opening hours rule with unknown days: {:?}", rule);
                continue;
            }
        }
        matched_day = true;

        if ranges.trim().eq_ignore_ascii_case("off") {
            continue;
        }
        for range in ranges.split(',') {
            let (open, close) = range.trim().split_once('-')?;
            if within(current, minutes_of(open)?, minutes_of(close)?) {
                return Some(true);
            }
        }
    }

    if matched_day {
        Some(false)
    } else {
        None
    }
}

/// Rewrites the `=s{N}-c` size suffix of a hosted photo URL.
pub fn high_res_photo(url: Option<&str>, size: u32) -> String {
    let url = match url {
        Some(url) if !url.is_empty() => url,
        _ => return String::new(),
    };

    if let Some(index) = url.rfind("=s") {
        let suffix = &url[index + 2..];
        if let Some(digits) = suffix.strip_suffix("-c") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return format!("{}=s{}-c", &url[..index], size);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    // 2024-05-15 is a Wednesday.
    const WEDNESDAY_NOON: OffsetDateTime = datetime!(2024-05-15 12:00 UTC);
    const WEDNESDAY_LATE: OffsetDateTime = datetime!(2024-05-15 22:30 UTC);

    #[test]
    fn address_falls_back_to_city() {
        assert_eq!(join_address(&[None, Some(" "), None], "Dumaguete City"), "Dumaguete City");
        assert_eq!(
            join_address(&[Some("12"), Some("Rizal Blvd"), Some("Dumaguete")], "x"),
            "12, Rizal Blvd, Dumaguete"
        );
    }

    #[test]
    fn geoapify_amenities_come_from_properties_only() {
        let properties = json!({
            "categories": ["catering.cafe", "commercial.food_and_drink"],
            "takeaway": true,
            "internet_access": "wlan",
        });
        let amenities = geoapify_amenities(&properties);

        assert!(amenities.contains(COFFEE));
        assert!(amenities.contains(TAKEAWAY));
        assert!(amenities.contains(WIFI));
        assert_eq!(amenities.len(), 3);

        assert!(geoapify_amenities(&json!({})).is_empty());
    }

    #[test]
    fn osm_tags_map_to_amenities() {
        let tags = json!({
            "cuisine": "coffee_shop",
            "outdoor_seating": "yes",
            "socket:power": "yes",
            "dog": "yes",
            "internet_access": "no",
        });
        let amenities = osm_amenities(&tags);

        assert!(amenities.contains(COFFEE));
        assert!(amenities.contains(OUTDOOR_SEATING));
        assert!(amenities.contains(POWER_OUTLETS));
        assert!(amenities.contains(PET_FRIENDLY));
        assert!(!amenities.contains(WIFI));
    }

    #[test]
    fn google_types_map_to_amenities() {
        let types = vec!["cafe".to_string(), "meal_takeaway".to_string(), "point_of_interest".to_string()];
        let amenities = google_type_amenities(&types);
        assert_eq!(amenities.len(), 2);
    }

    #[test]
    fn price_levels() {
        assert_eq!(parse_price_level(&json!("$$")), Some(2));
        assert_eq!(parse_price_level(&json!("3")), Some(3));
        assert_eq!(parse_price_level(&json!(1)), Some(1));
        assert_eq!(parse_price_level(&json!(null)), None);
    }

    #[test]
    fn structured_hours() {
        let hours = json!({ "wednesday": [{ "open": "08:00", "close": "20:00" }] });
        assert_eq!(open_status_from_structured(&hours, WEDNESDAY_NOON), Some(true));
        assert_eq!(open_status_from_structured(&hours, WEDNESDAY_LATE), Some(false));

        let other_day = json!({ "monday": [{ "open": "08:00", "close": "20:00" }] });
        assert_eq!(open_status_from_structured(&other_day, WEDNESDAY_NOON), None);
    }

    #[test]
    fn osm_hours() {
        assert_eq!(open_status_from_osm("Mo-Fr 08:00-20:00", WEDNESDAY_NOON), Some(true));
        assert_eq!(open_status_from_osm("Mo-Fr 08:00-20:00", WEDNESDAY_LATE), Some(false));
        assert_eq!(open_status_from_osm("Sa,Su 09:00-17:00", WEDNESDAY_NOON), None);
        assert_eq!(open_status_from_osm("We off", WEDNESDAY_NOON), Some(false));
        assert_eq!(open_status_from_osm("18:00-02:00", WEDNESDAY_LATE), Some(true));
        assert_eq!(open_status_from_osm("24/7", WEDNESDAY_LATE), Some(true));
        assert_eq!(open_status_from_osm("sunrise-sunset", WEDNESDAY_NOON), None);
    }

    #[test]
    fn unknown_day_selectors_do_not_hide_known_rules() {
        assert_eq!(open_status_from_osm("Mo-Fr 08:00-20:00; PH off", WEDNESDAY_NOON), Some(true));
        assert_eq!(open_status_from_osm("PH off; Mo-Fr 08:00-20:00", WEDNESDAY_LATE), Some(false));
        assert_eq!(open_status_from_osm("PH 10:00-12:00", WEDNESDAY_NOON), None);
    }

    #[test]
    fn photo_size_rewrite() {
        assert_eq!(
            high_res_photo(Some("https://lh3.example/p/abc=s100-c"), 400),
            "https://lh3.example/p/abc=s400-c"
        );
        assert_eq!(high_res_photo(Some("https://img/plain.jpg"), 400), "https://img/plain.jpg");
        assert_eq!(high_res_photo(None, 400), "");
    }
}
