//! Domain types for Ando
//!
//! Record types come from tripstore; this module adds the checks applied at
//! the edges: caller identity, trip intake, share token format, and
//! provider payload shape.

mod identity;
mod itinerary_shape;
mod share_token;
mod trip_draft;

pub use identity::Identity;
pub use itinerary_shape::{ShapeError, parse_itinerary};
pub use share_token::{MalformedToken, ShareToken};
pub use trip_draft::{DEFAULT_CURRENCY, FieldError, MAX_TRIP_DAYS, TripDraft, ValidationErrors};

// Re-export tripstore types for convenience
pub use tripstore::{
    Accommodation, Activity, ActivityCategory, BudgetTier, GenerationFailure, GenerationState, GenerationStatus,
    Itinerary, ItineraryDay, NewItinerary, NewTrip, Pace, Profile, ProfileSeed, SharedTrip, TravelPreferences,
    TravelSegment, TravelStyle, Trip, TripListing, TripStatus, Visibility,
};
