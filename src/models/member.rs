use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TripRole {
    #[default]
    #[serde(rename = "viewer")]
    Viewer,
    #[serde(rename = "editor")]
    Editor,
    #[serde(rename = "admin")]
    Admin,
}

impl TripRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripRole::Viewer => "viewer",
            TripRole::Editor => "editor",
            TripRole::Admin => "admin",
        }
    }
}

impl fmt::Display for TripRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership of a user in a trip. The creator always holds `admin` with
/// `added_by` pointing at themselves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripUser {
    pub id: String,
    pub trip_id: String,
    pub user_id: String,
    pub role: String,
    pub added_by: String,
}
