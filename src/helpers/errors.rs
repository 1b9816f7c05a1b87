use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures of the cafe aggregation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacesError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("provider responded with HTTP {0}")]
    Status(u16),

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("provider quota exceeded: {0}")]
    Quota(String),

    #[error("provider returned status {0}")]
    Vendor(String),
}

impl PlacesError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlacesError::Network(_) | PlacesError::Quota(_) => true,
            PlacesError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PlacesError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return PlacesError::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => PlacesError::Status(status.as_u16()),
            None => PlacesError::Network(e.to_string()),
        }
    }
}

impl IntoResponse for PlacesError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlacesError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            PlacesError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(PlacesError::Network("reset".into()).is_transient());
        assert!(PlacesError::Status(503).is_transient());
        assert!(PlacesError::Status(429).is_transient());
        assert!(PlacesError::Quota("OVER_QUERY_LIMIT".into()).is_transient());

        assert!(!PlacesError::Status(404).is_transient());
        assert!(!PlacesError::NotFound("place".into()).is_transient());
        assert!(!PlacesError::InvalidIdentifier("".into()).is_transient());
        assert!(!PlacesError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn errors_map_to_http_status() {
        assert_eq!(
            PlacesError::InvalidIdentifier("".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlacesError::NotFound("place".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PlacesError::Status(500).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
