use thiserror::Error;

/// Error returned when a route location identifier cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaypointError {
    /// The identifier is neither `start`, `end` nor `stop-<n>`.
    #[error("unrecognised location identifier {0:?}")]
    InvalidIdentifier(String),
    /// The `stop-` suffix is not a canonical decimal integer.
    #[error("malformed stop identifier {0:?}")]
    MalformedStop(String),
    /// The referenced stop id is absent from the route's stop list.
    #[error("no stop in route matches identifier {0:?}")]
    StopNotFound(String),
}

/// Semantic role of a route waypoint.
///
/// Location identifiers arrive as caller-controlled free text (`"start"`,
/// `"end"`, `"stop-<n>"`) used to correlate route waypoints with form
/// inputs. This is the single place that loose string contract becomes a
/// tagged value; malformed or dangling references are rejected here instead
/// of being silently misclassified downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointKind {
    Start,
    End,
    /// An intermediate waypoint; `index` is the zero-based position of the
    /// matching entry within the caller-supplied stop list, not the parsed
    /// stop id.
    Stop { index: usize },
}

impl WaypointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaypointKind::Start => "start",
            WaypointKind::End => "end",
            WaypointKind::Stop { .. } => "stop",
        }
    }

    pub fn stop_index(&self) -> Option<i64> {
        match self {
            WaypointKind::Stop { index } => Some(*index as i64),
            _ => None,
        }
    }
}

/// Classify a location identifier against the route's ordered stop ids.
pub fn classify(identifier: &str, stop_ids: &[i64]) -> Result<WaypointKind, WaypointError> {
    match identifier {
        "start" => Ok(WaypointKind::Start),
        "end" => Ok(WaypointKind::End),
        _ => {
            let Some(digits) = identifier.strip_prefix("stop-") else {
                return Err(WaypointError::InvalidIdentifier(identifier.to_string()));
            };
            // Canonical decimal only: no sign, no leading zeros. Parsing as
            // unsigned and re-stringifying rejects both.
            let value: u64 = digits
                .parse()
                .map_err(|_| WaypointError::MalformedStop(identifier.to_string()))?;
            if value.to_string() != digits {
                return Err(WaypointError::MalformedStop(identifier.to_string()));
            }
            let needle = i64::try_from(value)
                .map_err(|_| WaypointError::StopNotFound(identifier.to_string()))?;
            let index = stop_ids
                .iter()
                .position(|id| *id == needle)
                .ok_or_else(|| WaypointError::StopNotFound(identifier.to_string()))?;
            Ok(WaypointKind::Stop { index })
        }
    }
}
