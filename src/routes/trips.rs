use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::skip_serializing_none;
use tracing::warn;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        invite::{InviteStatus, TripInvite},
        location::TripLocation,
        media::TripMedia,
        member::TripUser,
        trip::Trip,
    },
    state::AppState,
    trips::{answer_invite, create_trip, CreateTripRequest, InviteAnswer},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(detail))
        .route("/invites", get(my_invites))
        .route("/invites/:id/accept", post(accept_invite))
        .route("/invites/:id/decline", post(decline_invite))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateTripRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    request.validate()?;

    let outcome = create_trip(&state.db, &user.id, &request).await?;

    // Invite delivery happens after the commit and never fails the request.
    if let Err(err) = state
        .mailer
        .send_trip_invites(
            request.details.title.trim(),
            &user.username,
            &outcome.invites_sent,
        )
        .await
    {
        warn!(trip = %outcome.trip_id, "sending invite emails failed: {err}");
    }

    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    let trips = sqlx::query_as::<_, Trip>(
        r#"SELECT DISTINCT t.*
           FROM trips t
           LEFT JOIN trip_users tu ON tu.trip_id = t.id
           WHERE t.owner_id = ?1 OR tu.user_id = ?1
           ORDER BY t.created_at DESC"#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(trips))
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TripDetailResponse {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    duration_days: i64,
    transport_mode: String,
    distance_estimate: f64,
    visibility: String,
    status: String,
    locations: Vec<LocationResponse>,
    members: Vec<TripUser>,
    media: Vec<TripMedia>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationResponse {
    id: String,
    name: String,
    address: String,
    city: Option<String>,
    country: Option<String>,
    longitude: f64,
    latitude: f64,
    kind: String,
    stop_index: Option<i64>,
}

async fn detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<TripDetailResponse>, AppError> {
    let user = current.require_user()?;
    let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = ?1")
        .bind(&trip_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)?;

    if trip.owner_id != user.id && !is_member(&state, &trip_id, &user.id).await? {
        return Err(AppError::Forbidden);
    }

    let locations = sqlx::query_as::<_, TripLocation>(
        r#"SELECT * FROM trip_locations WHERE trip_id = ?1
           ORDER BY CASE kind WHEN 'start' THEN 0 WHEN 'stop' THEN 1 ELSE 2 END,
                    stop_index"#,
    )
    .bind(&trip_id)
    .fetch_all(&state.db)
    .await?;

    let members = sqlx::query_as::<_, TripUser>("SELECT * FROM trip_users WHERE trip_id = ?1")
        .bind(&trip_id)
        .fetch_all(&state.db)
        .await?;

    let media = sqlx::query_as::<_, TripMedia>(
        "SELECT * FROM trip_media WHERE trip_id = ?1 ORDER BY created_at",
    )
    .bind(&trip_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(TripDetailResponse {
        id: trip.id,
        owner_id: trip.owner_id,
        title: trip.title,
        description: trip.description,
        start_date: trip.start_date,
        end_date: trip.end_date,
        duration_days: trip.duration_days,
        transport_mode: trip.transport_mode,
        distance_estimate: trip.distance_estimate,
        visibility: trip.visibility,
        status: trip.status,
        locations: locations
            .into_iter()
            .map(|l| LocationResponse {
                id: l.id,
                name: l.name,
                address: l.address,
                city: l.city,
                country: l.country,
                longitude: l.longitude,
                latitude: l.latitude,
                kind: l.kind,
                stop_index: l.stop_index,
            })
            .collect(),
        members,
        media,
    }))
}

/// Pending invites addressed to the caller's email.
async fn my_invites(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<TripInvite>>, AppError> {
    let user = current.require_user()?;
    let invites = sqlx::query_as::<_, TripInvite>(
        "SELECT * FROM trip_invites WHERE email = ?1 AND status = ?2",
    )
    .bind(&user.email)
    .bind(InviteStatus::Pending.as_str())
    .fetch_all(&state.db)
    .await?;
    Ok(Json(invites))
}

async fn is_member(state: &AppState, trip_id: &str, user_id: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM trip_users WHERE trip_id = ?1 AND user_id = ?2",
    )
    .bind(trip_id)
    .bind(user_id)
    .fetch_one(&state.db)
    .await?;
    Ok(count > 0)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InviteAnswerResponse {
    invite_id: String,
    status: String,
}

async fn accept_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(invite_id): Path<String>,
) -> Result<Json<InviteAnswerResponse>, AppError> {
    let user = current.require_user()?;
    let status = answer_invite(&state.db, user, &invite_id, InviteAnswer::Accept).await?;
    Ok(Json(InviteAnswerResponse {
        invite_id,
        status: status.to_string(),
    }))
}

async fn decline_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(invite_id): Path<String>,
) -> Result<Json<InviteAnswerResponse>, AppError> {
    let user = current.require_user()?;
    let status = answer_invite(&state.db, user, &invite_id, InviteAnswer::Decline).await?;
    Ok(Json(InviteAnswerResponse {
        invite_id,
        status: status.to_string(),
    }))
}
