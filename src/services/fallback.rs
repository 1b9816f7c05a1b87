use crate::models::cafe::{CafeDetails, Coordinates};

const FALLBACK_PHOTO: &str = "/api/placeholder/200/150";

fn sample(place_id: &str, name: &str, address: &str, rating: f64, amenities: &[&str], at: Coordinates) -> CafeDetails {
    let mut cafe = CafeDetails::new(place_id, name, address);
    cafe.rating = Some(rating);
    cafe.amenities = amenities.iter().map(|a| a.to_string()).collect();
    cafe.lat = Some(at.lat);
    cafe.lon = Some(at.lon);
    cafe
}

/// Listing shown when every provider failed.
pub fn fallback_cafes(city: &str, centre: Coordinates) -> Vec<CafeDetails> {
    let entries: [(&str, &str, f64, &[&str]); 5] = [
        ("1", "Hemingway Cafe", 4.5, &["Wi-Fi", "Outdoor Seating"]),
        ("2", "Kava Modern Filipino", 4.2, &["Wi-Fi"]),
        ("3", "Mulat Cafe", 4.7, &["Outdoor Seating"]),
        ("4", "Tuesday Cafe", 4.0, &["Wi-Fi", "Power Outlets"]),
        ("5", "Overdose Coffee", 4.3, &["Breakfast"]),
    ];

    entries
        .iter()
        .map(|(id, name, rating, amenities)| {
            let mut cafe = sample(id, name, city, *rating, amenities, centre);
            cafe.photos = vec![FALLBACK_PHOTO.to_string()];
            cafe
        })
        .collect()
}

/// Listing shown when a tag search produced nothing at all.
pub fn fallback_tag_cafes(city: &str, centre: Coordinates) -> Vec<CafeDetails> {
    let mut first = sample(
        "fallback_1",
        "Fallback Cafe",
        &format!("123 Main St, {}", city),
        4.0,
        &["Wi-Fi", "Coffee"],
        centre,
    );
    first.photos = vec!["https://via.placeholder.com/400x300?text=Fallback+Cafe".to_string()];

    let mut second = sample(
        "fallback_2",
        "Another Cafe",
        &format!("456 Coastal Rd, {}", city),
        3.5,
        &["Wi-Fi", "Brunch"],
        Coordinates {
            lat: centre.lat + 0.01,
            lon: centre.lon + 0.01,
        },
    );
    second.photos = vec!["https://via.placeholder.com/400x300?text=Another+Cafe".to_string()];

    vec![first, second]
}

const DESCRIPTIONS: [&str; 5] = [
    "A cozy spot perfect for coffee lovers, offering a warm ambiance and friendly service.",
    "A vibrant cafe with a modern vibe, ideal for work or catching up with friends.",
    "A charming hideaway serving delicious brews and a relaxing atmosphere.",
    "A trendy cafe known for its artisanal drinks and welcoming environment.",
    "A quaint coffee shop with a focus on quality and community.",
];

/// Stable stand-in description for cafes whose provider has none.
pub fn default_description(place_id: &str) -> &'static str {
    let index = place_id.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    DESCRIPTIONS[index % DESCRIPTIONS.len()]
}
