//! Trip intake validation
//!
//! Server-authoritative checks applied to every trip submission before
//! anything is written.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use super::{NewTrip, Visibility};

/// Longest allowed trip, in inclusive calendar days
pub const MAX_TRIP_DAYS: i64 = 14;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Trip creation body as submitted by a client
///
/// Dates stay as text so a missing date and a malformed one are reported
/// through the same rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripDraft {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub traveler_count: Option<i64>,
    #[serde(default)]
    pub budget_total: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every violated rule, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        debug!(%field, %message, "ValidationErrors::push: called");
        self.errors.push(FieldError { field, message });
    }

    /// Message of the first rule that failed
    pub fn first_message(&self) -> &'static str {
        self.errors.first().map_or("Invalid request body", |e| e.message)
    }

    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

impl TripDraft {
    /// Validate against `today` (UTC calendar date) and produce the insert payload for `user_id`
    ///
    /// Rules, in order: destination, dates present, start not in the past,
    /// end on or after start, span of at most 14 days, at least one traveler.
    /// A later date rule is only checked when the dates it needs are usable.
    /// Currency is stored as submitted (trimmed); a zero budget is stored as absent.
    pub fn validate(&self, user_id: &str, today: NaiveDate) -> Result<NewTrip, ValidationErrors> {
        debug!(%user_id, %today, "validate: called");
        let mut errors = ValidationErrors::default();

        let destination = self.destination.as_deref().map(str::trim).unwrap_or_default();
        if destination.is_empty() {
            errors.push("destination", "Destination is required");
        }

        let start = parse_date(self.start_date.as_deref());
        let end = parse_date(self.end_date.as_deref());
        match (start, end) {
            (Some(start), Some(end)) => {
                if start < today {
                    errors.push("start_date", "Start date cannot be in the past");
                }
                if end < start {
                    errors.push("end_date", "End date must be on or after start date");
                } else if (end - start).num_days() + 1 > MAX_TRIP_DAYS {
                    errors.push("end_date", "Trip must be 14 days or shorter");
                }
            }
            _ => {
                let field = if start.is_none() { "start_date" } else { "end_date" };
                errors.push(field, "Start and end dates are required");
            }
        }

        let traveler_count = self.traveler_count.unwrap_or(1);
        if traveler_count < 1 {
            errors.push("traveler_count", "At least 1 traveler required");
        } else if u32::try_from(traveler_count).is_err() {
            errors.push("traveler_count", "Traveler count is out of range");
        }

        let currency = self
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        match (start, end) {
            (Some(start_date), Some(end_date)) if errors.is_empty() => Ok(NewTrip {
                user_id: user_id.to_string(),
                destination: destination.to_string(),
                title: self
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                start_date,
                end_date,
                traveler_count: u32::try_from(traveler_count).unwrap_or(1),
                budget_total: self.budget_total.filter(|b| *b != 0.0),
                currency,
                visibility: self.visibility.unwrap_or_default(),
            }),
            _ => {
                debug!(count = errors.errors.len(), "validate: rejected");
                Err(errors)
            }
        }
    }
}
