//! Record types persisted by the store
//!
//! These types are the schema contract shared by every reader and writer:
//! trips, per-user profiles, and append-only itinerary versions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored or submitted enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Generates `as_str`, `Display` and `FromStr` for a unit-only enum
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Stable lowercase name used in storage and on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant::new($kind, other)),
                }
            }
        }
    };
}

/// Lifecycle status of a trip. Archival is a status, trips are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

string_enum!(TripStatus, "trip status", {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

/// Who may read a trip through its share token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Unlisted,
    Public,
}

string_enum!(Visibility, "visibility", {
    Private => "private",
    Unlisted => "unlisted",
    Public => "public",
});

/// Where a trip sits in the generate/regenerate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// No generation has ever been requested
    #[default]
    None,
    /// A provider call is in flight
    Generating,
    /// The last generation committed an active itinerary
    Active,
    /// The last generation failed; see [`GenerationFailure`]
    Failed,
}

string_enum!(GenerationStatus, "generation status", {
    None => "none",
    Generating => "generating",
    Active => "active",
    Failed => "failed",
});

/// Which side of the generation boundary failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFailure {
    /// Provider error, empty output, or an invalid payload
    Upstream,
    /// The store rejected the versioning transaction after a successful generation
    Persistence,
    /// Setup failed before anything was generated (profile load, prompt render, actor gone)
    Internal,
}

string_enum!(GenerationFailure, "generation failure", {
    Upstream => "upstream",
    Persistence => "persistence",
    Internal => "internal",
});

/// Generation state carried on every trip row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub error: Option<GenerationFailure>,
    /// Unix milliseconds of the last transition (0 when never generated)
    pub updated_at: i64,
}

/// A user-owned travel plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub destination: String,
    pub title: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub traveler_count: u32,
    pub budget_total: Option<f64>,
    /// ISO 4217 currency code
    pub currency: String,
    pub status: TripStatus,
    pub visibility: Visibility,
    /// Opaque public access token, fixed at creation
    pub share_token: String,
    pub generation: GenerationState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Trip {
    /// Inclusive number of calendar days covered by the trip
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Fields supplied when a trip is created. Id, token, status and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub user_id: String,
    pub destination: String,
    pub title: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub traveler_count: u32,
    pub budget_total: Option<f64>,
    pub currency: String,
    pub visibility: Visibility,
}

/// A trip plus whether it currently has an active itinerary (dashboard listing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripListing {
    #[serde(flatten)]
    pub trip: Trip,
    pub has_active_itinerary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Slow,
    Medium,
    Fast,
}

string_enum!(Pace, "pace", {
    Slow => "slow",
    Medium => "medium",
    Fast => "fast",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Budget,
    Mid,
    Luxury,
}

string_enum!(BudgetTier, "budget tier", {
    Budget => "budget",
    Mid => "mid",
    Luxury => "luxury",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accommodation {
    Hostel,
    Hotel,
    Airbnb,
}

string_enum!(Accommodation, "accommodation", {
    Hostel => "hostel",
    Hotel => "hotel",
    Airbnb => "airbnb",
});

/// How the user likes to travel (captured during onboarding)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TravelStyle {
    pub pace: Option<Pace>,
    pub budget: Option<BudgetTier>,
    pub interests: Vec<String>,
}

/// Constraints the itinerary must honour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TravelPreferences {
    pub dietary: Vec<String>,
    pub accessibility: Vec<String>,
    pub accommodation: Option<Accommodation>,
}

/// Per-user travel profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub travel_style: TravelStyle,
    pub preferences: TravelPreferences,
    pub onboarded: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Values written only when a profile row does not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileSeed {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Category of a planned activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Attraction,
    Restaurant,
    Transport,
    Accommodation,
    Experience,
}

string_enum!(ActivityCategory, "activity category", {
    Attraction => "attraction",
    Restaurant => "restaurant",
    Transport => "transport",
    Accommodation => "accommodation",
    Experience => "experience",
});

/// Transit from one activity to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelSegment {
    pub mode: String,
    pub duration_min: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Local start time, `HH:MM`
    pub time: String,
    pub duration_min: u32,
    pub name: String,
    pub category: ActivityCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub cost_estimate: f64,
    /// Absent on the last activity of a day
    #[serde(default)]
    pub travel_to_next: Option<TravelSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    /// 1-based, contiguous within an itinerary
    pub day: u32,
    pub date: NaiveDate,
    pub theme: String,
    pub walking_km: f64,
    pub estimated_cost: f64,
    pub activities: Vec<Activity>,
}

/// One generated version of a trip's plan. Never edited after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: String,
    pub trip_id: String,
    /// Monotonic per trip, starting at 1
    pub version: u32,
    pub generated_at: i64,
    pub ai_model: Option<String>,
    pub prompt_hash: Option<String>,
    pub days: Vec<ItineraryDay>,
    pub is_active: bool,
}

/// Payload for the versioning transaction. Id, version and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItinerary {
    pub trip_id: String,
    pub ai_model: Option<String>,
    pub prompt_hash: Option<String>,
    pub days: Vec<ItineraryDay>,
}

/// Public read-only projection of a shared trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedTrip {
    pub trip_id: String,
    pub destination: String,
    pub title: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub traveler_count: u32,
    pub budget_total: Option<f64>,
    pub currency: String,
    pub itinerary: Option<Itinerary>,
}
