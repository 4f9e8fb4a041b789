//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{
    GenerationFailure, GenerationState, GenerationStatus, Itinerary, NewItinerary, NewTrip, Profile, ProfileSeed,
    SharedTrip, TravelPreferences, TravelStyle, Trip, TripListing, TripStatus, Visibility,
};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<tripstore::StoreError> for StateError {
    fn from(e: tripstore::StoreError) -> Self {
        match e {
            tripstore::StoreError::UnknownId(id) => StateError::NotFound(id),
            other => StateError::StoreError(other.to_string()),
        }
    }
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Trip operations
    CreateTrip {
        trip: NewTrip,
        reply: oneshot::Sender<StateResponse<Trip>>,
    },
    GetTrip {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Trip>>>,
    },
    GetOwnedTrip {
        id: String,
        user_id: String,
        reply: oneshot::Sender<StateResponse<Option<Trip>>>,
    },
    ListTrips {
        user_id: String,
        include_archived: bool,
        reply: oneshot::Sender<StateResponse<Vec<TripListing>>>,
    },
    UpdateTripSettings {
        id: String,
        user_id: String,
        status: Option<TripStatus>,
        visibility: Option<Visibility>,
        reply: oneshot::Sender<StateResponse<Option<Trip>>>,
    },
    SetGenerationState {
        trip_id: String,
        status: GenerationStatus,
        error: Option<GenerationFailure>,
        reply: oneshot::Sender<StateResponse<GenerationState>>,
    },

    // Profile operations
    EnsureProfile {
        seed: ProfileSeed,
        reply: oneshot::Sender<StateResponse<Profile>>,
    },
    GetProfile {
        user_id: String,
        reply: oneshot::Sender<StateResponse<Option<Profile>>>,
    },
    CompleteOnboarding {
        user_id: String,
        travel_style: TravelStyle,
        preferences: TravelPreferences,
        reply: oneshot::Sender<StateResponse<Option<Profile>>>,
    },

    // Itinerary operations
    ReplaceActiveItinerary {
        itinerary: NewItinerary,
        reply: oneshot::Sender<StateResponse<Itinerary>>,
    },
    GetActiveItinerary {
        trip_id: String,
        reply: oneshot::Sender<StateResponse<Option<Itinerary>>>,
    },
    ListItineraries {
        trip_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Itinerary>>>,
    },

    // Public share lookup
    GetSharedTrip {
        share_token: String,
        reply: oneshot::Sender<StateResponse<Option<SharedTrip>>>,
    },

    // Shutdown
    Shutdown,
}
