use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::invite::InviteStatus;
use crate::models::media::MediaType;
use crate::models::member::TripRole;
use crate::models::trip::{TripStatus, TripVisibility};

use super::duration::duration_days;
use super::waypoint::classify;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub details: TripDetails,
    pub route: TripRoute,
    pub travelers: TravelerList,
    #[serde(default)]
    pub memories: Vec<MemoryUpload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRoute {
    pub transport_mode: String,
    pub estimated_duration: f64,
    pub estimated_distance: f64,
    pub locations: Vec<RouteLocation>,
    #[serde(default)]
    pub stops: Vec<StopEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLocation {
    /// Correlation key from the trip form: `start`, `end` or `stop-<n>`.
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// `[longitude, latitude]`, as the map provider emits them.
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopEntry {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerList {
    #[serde(default)]
    pub users: Vec<Traveler>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub email: String,
    #[serde(default)]
    pub role: TripRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUpload {
    #[serde(rename = "storageKey", alias = "s3Key")]
    pub storage_key: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteSummary {
    pub email: String,
    pub invite_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripOutcome {
    pub trip_id: String,
    pub invites_sent: Vec<InviteSummary>,
}

impl CreateTripRequest {
    /// Shape checks the transaction relies on. The classifier still rejects
    /// malformed or dangling stop references on its own.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.details.title.trim().is_empty() {
            return Err(AppError::BadRequest("trip title must not be empty".into()));
        }
        if let Some(end) = self.details.end_date {
            if end < self.details.start_date {
                return Err(AppError::BadRequest(
                    "trip end date must not be before its start date".into(),
                ));
            }
        }

        let starts = count_kind(&self.route.locations, "start");
        let ends = count_kind(&self.route.locations, "end");
        if starts != 1 || ends != 1 {
            return Err(AppError::BadRequest(
                "route must contain exactly one start and one end location".into(),
            ));
        }

        let mut seen = Vec::with_capacity(self.travelers.users.len());
        for traveler in &self.travelers.users {
            let email = traveler.email.trim().to_ascii_lowercase();
            if email.is_empty() {
                return Err(AppError::BadRequest("traveler email must not be empty".into()));
            }
            if seen.contains(&email) {
                return Err(AppError::BadRequest(format!(
                    "duplicate traveler email {email:?}"
                )));
            }
            seen.push(email);
        }
        Ok(())
    }
}

fn count_kind(locations: &[RouteLocation], id: &str) -> usize {
    locations.iter().filter(|l| l.id == id).count()
}

/// Create a trip and its entire write set in one all-or-nothing transaction.
///
/// Inserts the trip row with its computed duration, one location row per
/// route waypoint, the creator's admin membership, one pending invite per
/// traveler and one media row per pre-uploaded memory. Any failure rolls
/// everything back; no partial rows survive and nothing is retried.
pub async fn create_trip(
    db: &DbPool,
    creator_id: &str,
    request: &CreateTripRequest,
) -> Result<CreateTripOutcome, AppError> {
    let mut tx = db.begin().await?;

    let trip_id = insert_trip(&mut tx, creator_id, &request.details, &request.route).await?;
    insert_locations(&mut tx, &trip_id, &request.route).await?;
    insert_creator_membership(&mut tx, &trip_id, creator_id).await?;
    let invites = insert_invites(&mut tx, &trip_id, creator_id, &request.travelers.users).await?;
    insert_media(&mut tx, &trip_id, creator_id, &request.memories).await?;

    tx.commit().await?;

    Ok(CreateTripOutcome {
        trip_id,
        invites_sent: invites,
    })
}

async fn insert_trip(
    tx: &mut SqliteConnection,
    owner_id: &str,
    details: &TripDetails,
    route: &TripRoute,
) -> Result<String, AppError> {
    let trip_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    // Stored trips always carry both bounds: an omitted end date collapses
    // onto the start, which makes an ongoing trip a 1-day trip.
    let end_date = details.end_date.unwrap_or(details.start_date);
    let duration = duration_days(details.start_date, Some(end_date));

    sqlx::query(
        r#"INSERT INTO trips
               (id, owner_id, title, description, start_date, end_date,
                duration_days, transport_mode, distance_estimate,
                visibility, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
    )
    .bind(&trip_id)
    .bind(owner_id)
    .bind(details.title.trim())
    .bind(&details.description)
    .bind(details.start_date)
    .bind(end_date)
    .bind(duration)
    .bind(&route.transport_mode)
    .bind(route.estimated_distance)
    .bind(TripVisibility::Private.as_str())
    .bind(TripStatus::Active.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    Ok(trip_id)
}

async fn insert_locations(
    tx: &mut SqliteConnection,
    trip_id: &str,
    route: &TripRoute,
) -> Result<(), AppError> {
    let stop_ids: Vec<i64> = route.stops.iter().map(|s| s.id).collect();

    for location in &route.locations {
        let kind = classify(&location.id, &stop_ids)?;
        let [longitude, latitude] = location.coordinates;
        sqlx::query(
            r#"INSERT INTO trip_locations
                   (id, trip_id, name, address, city, country,
                    longitude, latitude, kind, stop_index)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(trip_id)
        .bind(&location.name)
        .bind(location.address.as_deref().unwrap_or(""))
        .bind(&location.city)
        .bind(&location.country)
        .bind(longitude)
        .bind(latitude)
        .bind(kind.as_str())
        .bind(kind.stop_index())
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

async fn insert_creator_membership(
    tx: &mut SqliteConnection,
    trip_id: &str,
    creator_id: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO trip_users (id, trip_id, user_id, role, added_by)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(trip_id)
    .bind(creator_id)
    .bind(TripRole::Admin.as_str())
    .bind(creator_id)
    .execute(&mut *tx)
    .await?;
    Ok(())
}

async fn insert_invites(
    tx: &mut SqliteConnection,
    trip_id: &str,
    invited_by: &str,
    travelers: &[Traveler],
) -> Result<Vec<InviteSummary>, AppError> {
    let mut summaries = Vec::with_capacity(travelers.len());
    for traveler in travelers {
        let invite_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO trip_invites
                   (id, trip_id, invited_user_id, email, role,
                    invited_by, status, answered_at)
               VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, NULL)"#,
        )
        .bind(&invite_id)
        .bind(trip_id)
        .bind(traveler.email.trim())
        .bind(traveler.role.as_str())
        .bind(invited_by)
        .bind(InviteStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;
        summaries.push(InviteSummary {
            email: traveler.email.trim().to_string(),
            invite_id,
        });
    }
    Ok(summaries)
}

async fn insert_media(
    tx: &mut SqliteConnection,
    trip_id: &str,
    uploaded_by: &str,
    memories: &[MemoryUpload],
) -> Result<(), AppError> {
    for memory in memories {
        sqlx::query(
            r#"INSERT INTO trip_media
                   (id, trip_day_id, trip_id, media_type, storage_key,
                    uploaded_by, created_at)
               VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(trip_id)
        .bind(memory.media_type.as_str())
        .bind(&memory.storage_key)
        .bind(uploaded_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}
