use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{auth::CurrentUser, error::AppError, models::media::MediaType, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads", post(create_upload))
        .route("/uploads/*key", put(store_upload))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUploadRequest {
    media_type: MediaType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUploadResponse {
    key: String,
    upload_url: String,
    media_type: MediaType,
}

/// Issue an upload slot: an opaque storage key plus the URL the client PUTs
/// the bytes to. The key is what trip creation later records as a memory.
async fn create_upload(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let key = state.media.issue_key(request.media_type);
    let upload_url = state
        .config
        .public_base_url
        .join(&format!("/media/uploads/{key}"))
        .map_err(|err| AppError::Config(format!("invalid upload url: {err}")))?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUploadResponse {
            key,
            upload_url: upload_url.to_string(),
            media_type: request.media_type,
        }),
    ))
}

async fn store_upload(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    current.require_user()?;
    if body.is_empty() {
        return Err(AppError::BadRequest("upload body must not be empty".into()));
    }
    state.media.store(&key, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}
