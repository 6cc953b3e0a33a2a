use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A geocoded waypoint of a trip's route, tagged `start`, `end` or `stop`.
/// `stop_index` is the zero-based position within the route's stop list and
/// is only meaningful when `kind` is `stop`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripLocation {
    pub id: String,
    pub trip_id: String,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    pub kind: String,
    pub stop_index: Option<i64>,
}
