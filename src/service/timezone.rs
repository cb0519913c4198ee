use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::BookingError;

pub const INVALID_TIME_FORMAT: &str =
    "Invalid time format. Please provide times in ISO format (YYYY-MM-DDTHH:MM:SS).";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn parse_zone(name: &str) -> Result<Tz, BookingError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| BookingError::MalformedInput(format!("Unknown timezone '{}'.", name.trim())))
}

/// Parses an ISO-8601 timestamp into `zone`.
///
/// Timestamps carrying an offset are converted into `zone`. Naive timestamps
/// are read as wall-clock time in `zone`, not UTC.
pub fn parse_in_zone(raw: &str, zone: Tz) -> Result<DateTime<Tz>, BookingError> {
    let raw = raw.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(aware.with_timezone(&zone));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| BookingError::MalformedInput(INVALID_TIME_FORMAT.to_string()))?;

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(BookingError::MalformedInput(format!(
            "{raw} does not exist in {}.",
            zone.name()
        ))),
    }
}

/// Reads a provider timestamp (RFC 3339, usually UTC) into `zone`.
pub fn from_provider(raw: &str, zone: Tz) -> Result<DateTime<Tz>, BookingError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&zone))
        .map_err(|e| BookingError::Remote {
            status: 502,
            message: format!("provider returned an unreadable timestamp '{raw}': {e}"),
        })
}

/// Human-readable "now" used in the planner's context, e.g.
/// `Monday, July 07, 2025 at 09:00:00 AM IST+0530`.
pub fn describe_now(now: DateTime<Utc>, zone: Tz) -> String {
    now.with_timezone(&zone)
        .format("%A, %B %d, %Y at %I:%M:%S %p %Z%z")
        .to_string()
}
