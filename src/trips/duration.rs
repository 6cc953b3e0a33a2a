use chrono::{DateTime, Utc};

const DAY_MS: i64 = 86_400_000;

/// Number of whole days a trip spans.
///
/// A missing end date means the trip is still ongoing and yields `0`. Any
/// positive wall-clock gap rounds up to the next whole day, with a floor of
/// one day, so a trip that starts and ends on the same calendar day still
/// counts as a 1-day trip and partial days are never under-reported.
pub fn duration_days(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> i64 {
    let Some(end) = end else {
        return 0;
    };
    let elapsed_ms = end.signed_duration_since(start).num_milliseconds();
    if elapsed_ms <= 0 {
        return 1;
    }
    let days = (elapsed_ms + DAY_MS - 1) / DAY_MS;
    days.max(1)
}
