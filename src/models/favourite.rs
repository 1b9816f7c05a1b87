use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Favourite {
    pub user_id: String,
    pub place_id: String,
    pub name: String,
    pub address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Favourite {
    pub fn new(user_id: &str, place_id: &str, name: &str, address: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            place_id: place_id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Document-store path of this record.
    pub fn document_path(&self) -> String {
        favourite_document_path(&self.user_id, &self.place_id)
    }
}

pub fn favourite_document_path(user_id: &str, place_id: &str) -> String {
    format!("users/{}/favorites/{}", user_id, place_id)
}
