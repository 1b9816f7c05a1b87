use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::controller::AppState;
use crate::services::cafe_service::CafeService;
use crate::services::debounce::Debouncer;
use crate::services::tags::parse_tags;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/top", get(retrieve_top_cafes))
        .route("/search", get(search_cafes))
        .route("/search/first", get(search_first_cafe))
        .route("/suggestions", get(retrieve_suggestions))
        .route("/near", get(retrieve_cafes_near))
        .route("/tags", get(retrieve_cafes_by_tags))
        .route("/:place_id", get(retrieve_cafe))
        .route("/:place_id/view", get(retrieve_cafe_view))
        .route("/:place_id/reviews", get(retrieve_reviews))
        .route_layer(Extension(app_state.cafe_service))
        .route_layer(Extension(app_state.debouncer))
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SearchCafeParam {
    #[serde(default)]
    pub query: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SuggestionParam {
    #[serde(default)]
    pub query: String,
    pub session: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NearParam {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TagsParam {
    #[serde(default)]
    pub tags: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ReviewsParam {
    pub name: Option<String>,
}

pub async fn retrieve_top_cafes(
    Extension(cafe_service): Extension<Arc<CafeService>>,
) -> impl IntoResponse {
    let listing = cafe_service.fetch_top_cafes().await;
    (StatusCode::OK, Json(listing)).into_response()
}

pub async fn search_cafes(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Query(query): Query<SearchCafeParam>,
) -> impl IntoResponse {
    let listing = cafe_service.search_cafes_by_text(&query.query).await;
    (StatusCode::OK, Json(listing)).into_response()
}

pub async fn search_first_cafe(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Query(query): Query<SearchCafeParam>,
) -> impl IntoResponse {
    return match cafe_service.search_cafe_and_get_details(&query.query).await {
        Ok(cafe) => (StatusCode::OK, Json(cafe)).into_response(),
        Err(e) => {
            warn!("Something went wrong searching for cafe {:?} due to: {}", query.query, e);
            e.into_response()
        }
    };
}

/// With a `session` the lookup is debounced per session; a superseded
/// request answers 204 and the newest one carries the suggestions.
pub async fn retrieve_suggestions(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Extension(debouncer): Extension<Arc<Debouncer>>,
    Query(query): Query<SuggestionParam>,
) -> impl IntoResponse {
    let session = query.session.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let suggestions = match session {
        Some(session) => {
            let lookup = debouncer
                .run(session, || cafe_service.fetch_place_suggestions(&query.query))
                .await;
            match lookup {
                Some(suggestions) => suggestions,
                None => {
                    debug!("Suggestions for session {} superseded", session);
                    return StatusCode::NO_CONTENT.into_response();
                }
            }
        }
        None => cafe_service.fetch_place_suggestions(&query.query).await,
    };

    (StatusCode::OK, Json(suggestions)).into_response()
}

pub async fn retrieve_cafes_near(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Query(query): Query<NearParam>,
) -> impl IntoResponse {
    return match cafe_service.fetch_cafes_near_location(query.lat, query.lon).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => {
            warn!("Something went wrong retrieving cafes near {}, {} due to: {}", query.lat, query.lon, e);
            e.into_response()
        }
    };
}

pub async fn retrieve_cafes_by_tags(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Query(query): Query<TagsParam>,
) -> impl IntoResponse {
    let tags = parse_tags(&query.tags);
    let listing = cafe_service.fetch_cafes_by_tags(&tags).await;
    (StatusCode::OK, Json(listing)).into_response()
}

pub async fn retrieve_cafe(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Path(place_id): Path<String>,
) -> impl IntoResponse {
    return match cafe_service.fetch_cafe_details(&place_id).await {
        Ok(cafe) => (StatusCode::OK, Json(cafe)).into_response(),
        Err(e) => {
            warn!("Something went wrong retrieving cafe {} due to: {}", place_id, e);
            e.into_response()
        }
    };
}

pub async fn retrieve_cafe_view(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Path(place_id): Path<String>,
) -> impl IntoResponse {
    return match cafe_service.fetch_cafe_view(&place_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => {
            warn!("Something went wrong building the view of cafe {} due to: {}", place_id, e);
            e.into_response()
        }
    };
}

pub async fn retrieve_reviews(
    Extension(cafe_service): Extension<Arc<CafeService>>,
    Path(place_id): Path<String>,
    Query(query): Query<ReviewsParam>,
) -> impl IntoResponse {
    return match cafe_service.fetch_reviews(&place_id, query.name.as_deref()).await {
        Ok(reviews) => (StatusCode::OK, Json(reviews)).into_response(),
        Err(e) => {
            warn!("Something went wrong retrieving reviews of cafe {} due to: {}", place_id, e);
            e.into_response()
        }
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use super::*;
    use crate::config::BackoffKind;
    use crate::controller::router_endpoints;
    use crate::models::cafe::Coordinates;
    use crate::repositories::memory_repo::InMemoryFavouritesRepo;
    use crate::services::cafe_service::Limits;
    use crate::services::fetcher::testing::StaticFetcher;
    use crate::services::providers::geoapify::GeoapifyProvider;
    use crate::services::providers::SearchArea;
    use crate::services::retry::RetryPolicy;

    fn area() -> SearchArea {
        SearchArea {
            city: "Dumaguete City".to_string(),
            centre: Coordinates { lat: 9.3076, lon: 123.3080 },
            radius: 5000,
        }
    }

    fn app(fetcher: StaticFetcher) -> Router {
        let provider = Arc::new(GeoapifyProvider::new(Arc::new(fetcher), "key".to_string(), area()));
        let retry = RetryPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: BackoffKind::Fixed,
        };
        let cafe_service = CafeService::new(provider, None, None, retry, Limits::default(), area());

        router_endpoints(AppState {
            cafe_service: Arc::new(cafe_service),
            favourites_repo: Arc::new(InMemoryFavouritesRepo::new()),
            debouncer: Arc::new(Debouncer::new(Duration::from_millis(300))),
        })
    }

    fn places() -> Value {
        json!({ "features": [
            { "properties": { "place_id": "g-1", "name": "Mulat Cafe", "lat": 9.31, "lon": 123.30 } },
            { "properties": { "place_id": "g-2", "name": "Kava", "lat": 9.32, "lon": 123.31 } }
        ]})
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn top_cafes_report_their_origin() {
        let (status, body) = get_json(app(StaticFetcher::new().route("v2/places", places())), "/cafes/top").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"], "primary");
        assert_eq!(body["cafes"][0]["name"], "Mulat Cafe");
    }

    #[tokio::test]
    async fn provider_outage_still_answers_with_fallback() {
        let (status, body) = get_json(app(StaticFetcher::new()), "/cafes/search?query=kava").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"], "fallback");
        assert_eq!(body["cafes"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_cafe_is_404() {
        let fetcher = StaticFetcher::new().route("v2/places", json!({ "features": [] }));
        let (status, _) = get_json(app(fetcher), "/cafes/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn details_outage_is_502() {
        let (status, _) = get_json(app(StaticFetcher::new()), "/cafes/g-1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn first_search_hit_during_outage_is_502() {
        let (status, _) = get_json(app(StaticFetcher::new()), "/cafes/search/first?query=latte").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected() {
        let (status, _) = get_json(app(StaticFetcher::new()), "/cafes/near?lat=120&lon=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let fetcher = StaticFetcher::new().route("v2/places", places());
        let (status, body) = get_json(app(fetcher), "/cafes/near?lat=9.3&lon=123.3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cafes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn tags_without_google_use_tag_fallback() {
        let (status, body) = get_json(app(StaticFetcher::new()), "/cafes/tags?tags=Coffee,Brunch").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cafes"][0]["name"], "Fallback Cafe");
    }

    #[tokio::test]
    async fn suggestions_without_session_answer_immediately() {
        let fetcher = StaticFetcher::new().route("autocomplete", places());
        let (status, body) = get_json(app(fetcher), "/cafes/suggestions?query=mul").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["place_id"], "g-1");
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_suggestion_request_is_204() {
        let app = app(StaticFetcher::new().route("autocomplete", places()));

        let first = tokio::spawn(get_json(app.clone(), "/cafes/suggestions?query=mu&session=s1"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn(get_json(app, "/cafes/suggestions?query=mul&session=s1"));

        assert_eq!(first.await.unwrap().0, StatusCode::NO_CONTENT);
        let (status, body) = second.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_path_hits_fallback_handler() {
        let response = app(StaticFetcher::new())
            .fallback(crate::helpers::handler_404::page_not_found_handler)
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
