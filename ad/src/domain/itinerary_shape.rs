//! Provider payload parsing and shape checks
//!
//! Turns the raw provider reply into typed itinerary days, or says why it
//! cannot be used. Nothing here touches storage.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{ItineraryDay, Trip};

static TIME_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$"));

/// Why a provider payload was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("provider returned no content")]
    Empty,

    #[error("provider content is not valid JSON: {0}")]
    NotJson(String),

    #[error("provider payload has no `days` array")]
    DaysNotSequence,

    #[error("provider payload does not match the itinerary schema: {0}")]
    Schema(String),

    #[error("expected {expected} days for the trip, got {actual}")]
    DayCount { expected: i64, actual: usize },

    #[error("day {index} is out of sequence: {reason}")]
    Day { index: usize, reason: String },

    #[error("day {day} activity {index}: {reason}")]
    Activity { day: u32, index: usize, reason: String },
}

/// Parse a provider reply for `trip` and validate it against the trip's calendar
///
/// On success every day is numbered `1..=n`, dated from the trip start,
/// has at least one activity, and the last activity of each day carries no
/// onward travel segment.
pub fn parse_itinerary(content: Option<&str>, trip: &Trip) -> Result<Vec<ItineraryDay>, ShapeError> {
    debug!(trip_id = %trip.id, content_len = ?content.map(str::len), "parse_itinerary: called");
    let content = content.map(str::trim).filter(|c| !c.is_empty()).ok_or(ShapeError::Empty)?;

    let value: Value = serde_json::from_str(content).map_err(|e| ShapeError::NotJson(e.to_string()))?;
    let days = match value.get("days") {
        Some(days @ Value::Array(_)) => days.clone(),
        _ => return Err(ShapeError::DaysNotSequence),
    };

    let mut days: Vec<ItineraryDay> = serde_json::from_value(days).map_err(|e| ShapeError::Schema(e.to_string()))?;
    validate_days(&mut days, trip)?;
    debug!(day_count = days.len(), "parse_itinerary: accepted");
    Ok(days)
}

fn validate_days(days: &mut [ItineraryDay], trip: &Trip) -> Result<(), ShapeError> {
    let expected = trip.day_count();
    if days.is_empty() || i64::try_from(days.len()).ok() != Some(expected) {
        return Err(ShapeError::DayCount {
            expected,
            actual: days.len(),
        });
    }

    for (index, day) in days.iter_mut().enumerate() {
        let position = index + 1;
        let day_err = |reason: String| ShapeError::Day { index: position, reason };

        if usize::try_from(day.day).ok() != Some(position) {
            return Err(day_err(format!("numbered {}", day.day)));
        }
        let offset = i64::from(day.day) - 1;
        let expected_date = trip.start_date + Duration::days(offset);
        if day.date != expected_date {
            return Err(day_err(format!("dated {}, expected {}", day.date, expected_date)));
        }
        if !non_negative(day.walking_km) {
            return Err(day_err("negative walking distance".to_string()));
        }
        if !non_negative(day.estimated_cost) {
            return Err(day_err("negative estimated cost".to_string()));
        }
        if day.activities.is_empty() {
            return Err(day_err("no activities".to_string()));
        }

        let day_number = day.day;
        for (i, activity) in day.activities.iter().enumerate() {
            let activity_err = |reason: &str| ShapeError::Activity {
                day: day_number,
                index: i + 1,
                reason: reason.to_string(),
            };
            if !is_clock_time(&activity.time) {
                return Err(activity_err("time is not HH:MM"));
            }
            if activity.duration_min == 0 {
                return Err(activity_err("duration must be positive"));
            }
            if activity.name.trim().is_empty() {
                return Err(activity_err("name is empty"));
            }
            if !non_negative(activity.cost_estimate) {
                return Err(activity_err("negative cost estimate"));
            }
        }

        if let Some(last) = day.activities.last_mut() {
            last.travel_to_next = None;
        }
    }

    Ok(())
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn is_clock_time(raw: &str) -> bool {
    match TIME_RE.as_ref() {
        Ok(re) => re.is_match(raw),
        Err(_) => false,
    }
}
