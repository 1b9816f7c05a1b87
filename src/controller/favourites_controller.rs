use serde::{Serialize, Deserialize};
use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::routing::{get, post, delete};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::warn;
use crate::controller::AppState;
use crate::models::favourite::Favourite;
use crate::repositories::FavouritesRepo;

pub fn router(app_state: AppState) -> Router {
    routes(app_state.favourites_repo)
}

fn routes(favourites_repo: Arc<dyn FavouritesRepo>) -> Router {
    Router::new()
        .route("/", post(add_favourite).get(retrieve_favourites))
        .route("/remove", delete(remove_favourite))
        .route("/status", get(retrieve_favourite_status))
        .route("/toggle", post(toggle_favourite))
        .route_layer(Extension(favourites_repo))
}

const MISSING_IDS: &str = "User ID and place ID are required";

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FavouriteCafe {
    pub user_id: String,
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl FavouriteCafe {
    fn has_ids(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.place_id.trim().is_empty()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FavouriteKeyParam {
    pub user_id: String,
    pub place_id: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GetFavouritesParam {
    pub user_id: String,
}

pub async fn add_favourite(
    Extension(favourites_repo): Extension<Arc<dyn FavouritesRepo>>,
    Json(body): Json<FavouriteCafe>,
) -> impl IntoResponse {
    if !body.has_ids() {
        return (StatusCode::BAD_REQUEST, MISSING_IDS).into_response();
    }

    let favourite = Favourite::new(&body.user_id, &body.place_id, &body.name, &body.address);
    return match favourites_repo.add_favourite(favourite).await {
        Ok(_) => {
            (StatusCode::OK, "Successfully added cafe to favourites").into_response()
        }
        Err(e) => {
            warn!("Something went wrong adding cafe to favourites due to: {}", e);
            (StatusCode::BAD_REQUEST, "Failed to add favourite, please try again").into_response()
        }
    };
}

pub async fn remove_favourite(
    Extension(favourites_repo): Extension<Arc<dyn FavouritesRepo>>,
    Query(query): Query<FavouriteKeyParam>,
) -> impl IntoResponse {
    if query.user_id.trim().is_empty() || query.place_id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, MISSING_IDS).into_response();
    }

    return match favourites_repo.remove_favourite(&query.user_id, &query.place_id).await {
        Ok(_) => {
            (StatusCode::OK, "Successfully removed cafe from favourites").into_response()
        }
        Err(e) => {
            warn!("Something went wrong removing cafe from favourites due to: {}", e);
            (StatusCode::BAD_REQUEST, "Failed to remove favourite, please try again").into_response()
        }
    };
}

pub async fn retrieve_favourites(
    Extension(favourites_repo): Extension<Arc<dyn FavouritesRepo>>,
    Query(query): Query<GetFavouritesParam>,
) -> impl IntoResponse {
    return match favourites_repo.list_favourites(&query.user_id).await {
        Ok(favourites) => (StatusCode::OK, Json(favourites)).into_response(),
        Err(e) => {
            warn!("Something went wrong retrieving favourite cafes due to: {}", e);
            (
                StatusCode::BAD_REQUEST,
                "Failed to retrieve favourite cafes, please try again!",
            ).into_response()
        }
    };
}

pub async fn retrieve_favourite_status(
    Extension(favourites_repo): Extension<Arc<dyn FavouritesRepo>>,
    Query(query): Query<FavouriteKeyParam>,
) -> impl IntoResponse {
    return match favourites_repo.is_favourite(&query.user_id, &query.place_id).await {
        Ok(is_favourite) => {
            (StatusCode::OK, Json(json!({ "isFavourite": is_favourite }))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong checking favourite status due to: {}", e);
            (StatusCode::BAD_REQUEST, "Failed to check favourite, please try again").into_response()
        }
    };
}

pub async fn toggle_favourite(
    Extension(favourites_repo): Extension<Arc<dyn FavouritesRepo>>,
    Json(body): Json<FavouriteCafe>,
) -> impl IntoResponse {
    if !body.has_ids() {
        return (StatusCode::BAD_REQUEST, MISSING_IDS).into_response();
    }

    let favourite = Favourite::new(&body.user_id, &body.place_id, &body.name, &body.address);
    return match favourites_repo.toggle_favourite(favourite).await {
        Ok(is_favourite) => {
            (StatusCode::OK, Json(json!({ "isFavourite": is_favourite }))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong toggling favourite due to: {}", e);
            (StatusCode::BAD_REQUEST, "Failed to update favourite, please try again").into_response()
        }
    };
}
