//! TripStore - relational storage for Ando
//!
//! Defines the persisted shape of trips, profiles and itinerary versions and
//! implements it on SQLite.
//!
//! # Invariants enforced by the schema
//!
//! - `trips.share_token` is unique and never rewritten
//! - `end_date >= start_date` and `traveler_count >= 1`
//! - at most one `itineraries` row per trip has `is_active = 1`
//!   (partial unique index)
//! - itinerary `(trip_id, version)` is unique; rows are never updated except
//!   to clear `is_active`
//!
//! # Example
//!
//! ```ignore
//! use tripstore::{Store, ProfileSeed};
//!
//! let mut store = Store::open("/var/lib/ando")?;
//! let profile = store.ensure_profile(ProfileSeed { id: "user-1".into(), ..Default::default() })?;
//! assert!(!profile.onboarded);
//! ```

mod error;
pub mod records;
mod store;

pub use error::StoreError;
pub use records::{
    Accommodation, Activity, ActivityCategory, BudgetTier, GenerationFailure, GenerationState, GenerationStatus,
    Itinerary, ItineraryDay, NewItinerary, NewTrip, Pace, Profile, ProfileSeed, SharedTrip, TravelPreferences,
    TravelSegment, TravelStyle, Trip, TripListing, TripStatus, UnknownVariant, Visibility,
};
pub use store::Store;

/// File name of the SQLite database inside the store directory
pub const DB_FILE_NAME: &str = "ando.db";

/// Schema version recorded in the `meta` table
pub const SCHEMA_VERSION: &str = "v1";

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
