use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    services::geo::{GeocodeHit, RoutePreview},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/directions", post(directions))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

async fn search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<GeocodeHit>>, AppError> {
    current.require_user()?;
    if query.q.trim().is_empty() {
        return Err(AppError::BadRequest("search query must not be empty".into()));
    }
    Ok(Json(state.geo.search(query.q.trim()).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectionsRequest {
    coordinates: Vec<[f64; 2]>,
    transport_mode: String,
}

async fn directions(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<DirectionsRequest>,
) -> Result<Json<RoutePreview>, AppError> {
    current.require_user()?;
    Ok(Json(
        state
            .geo
            .directions(&request.coordinates, &request.transport_mode)
            .await?,
    ))
}
