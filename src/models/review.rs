use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Review {
    #[serde(rename = "authorName")]
    pub author_name: String,
    pub rating: f64,
    pub text: String,
    /// RFC 3339 timestamp.
    pub time: String,
}
