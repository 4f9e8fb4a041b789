//! StateManager - actor that owns the trip store
//!
//! Processes commands via channels for thread-safe access to persistent state.

use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use tripstore::Store;

use super::messages::{StateCommand, StateError, StateResponse};
use crate::domain::{
    GenerationFailure, GenerationState, GenerationStatus, Itinerary, NewItinerary, NewTrip, Profile, ProfileSeed,
    SharedTrip, TravelPreferences, TravelStyle, Trip, TripListing, TripStatus, Visibility,
};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    db_path: PathBuf,
}

impl StateManager {
    /// Spawn a new StateManager actor over the store in `store_dir`
    pub fn spawn(store_dir: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_dir = %store_dir.as_ref().display(), "spawn: called");
        let store = Store::open(store_dir.as_ref())?;
        let db_path = store.db_path().to_path_buf();

        let (tx, rx) = mpsc::channel(256);

        // Spawn the actor task
        tokio::spawn(actor_loop(store, rx));

        info!(db = %db_path.display(), "StateManager spawned");

        Ok(Self { tx, db_path })
    }

    /// Path of the database file the actor owns
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Trip operations ===

    /// Insert a validated trip as a private-by-default draft
    pub async fn create_trip(&self, trip: NewTrip) -> StateResponse<Trip> {
        debug!(user_id = %trip.user_id, destination = %trip.destination, "create_trip: called");
        self.request(|reply| StateCommand::CreateTrip { trip, reply }).await
    }

    /// Get a trip by id regardless of owner (operator use only)
    pub async fn get_trip(&self, id: &str) -> StateResponse<Option<Trip>> {
        debug!(%id, "get_trip: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetTrip { id, reply }).await
    }

    /// Get a trip only if `user_id` owns it
    pub async fn get_owned_trip(&self, id: &str, user_id: &str) -> StateResponse<Option<Trip>> {
        debug!(%id, %user_id, "get_owned_trip: called");
        let (id, user_id) = (id.to_string(), user_id.to_string());
        self.request(|reply| StateCommand::GetOwnedTrip { id, user_id, reply })
            .await
    }

    pub async fn list_trips(&self, user_id: &str, include_archived: bool) -> StateResponse<Vec<TripListing>> {
        debug!(%user_id, include_archived, "list_trips: called");
        let user_id = user_id.to_string();
        self.request(|reply| StateCommand::ListTrips {
            user_id,
            include_archived,
            reply,
        })
        .await
    }

    /// Change status and/or visibility of an owned trip; `None` when not owned
    pub async fn update_trip_settings(
        &self,
        id: &str,
        user_id: &str,
        status: Option<TripStatus>,
        visibility: Option<Visibility>,
    ) -> StateResponse<Option<Trip>> {
        debug!(%id, %user_id, ?status, ?visibility, "update_trip_settings: called");
        let (id, user_id) = (id.to_string(), user_id.to_string());
        self.request(|reply| StateCommand::UpdateTripSettings {
            id,
            user_id,
            status,
            visibility,
            reply,
        })
        .await
    }

    pub async fn set_generation_state(
        &self,
        trip_id: &str,
        status: GenerationStatus,
        error: Option<GenerationFailure>,
    ) -> StateResponse<GenerationState> {
        debug!(%trip_id, %status, ?error, "set_generation_state: called");
        let trip_id = trip_id.to_string();
        self.request(|reply| StateCommand::SetGenerationState {
            trip_id,
            status,
            error,
            reply,
        })
        .await
    }

    // === Profile operations ===

    /// Create the profile row if missing; an existing row is returned untouched
    pub async fn ensure_profile(&self, seed: ProfileSeed) -> StateResponse<Profile> {
        debug!(user_id = %seed.id, "ensure_profile: called");
        self.request(|reply| StateCommand::EnsureProfile { seed, reply }).await
    }

    pub async fn get_profile(&self, user_id: &str) -> StateResponse<Option<Profile>> {
        debug!(%user_id, "get_profile: called");
        let user_id = user_id.to_string();
        self.request(|reply| StateCommand::GetProfile { user_id, reply }).await
    }

    /// Record onboarding answers; `None` when no profile row exists
    pub async fn complete_onboarding(
        &self,
        user_id: &str,
        travel_style: TravelStyle,
        preferences: TravelPreferences,
    ) -> StateResponse<Option<Profile>> {
        debug!(%user_id, "complete_onboarding: called");
        let user_id = user_id.to_string();
        self.request(|reply| StateCommand::CompleteOnboarding {
            user_id,
            travel_style,
            preferences,
            reply,
        })
        .await
    }

    // === Itinerary operations ===

    /// Deactivate the current version and insert the new active one in one transaction
    pub async fn replace_active_itinerary(&self, itinerary: NewItinerary) -> StateResponse<Itinerary> {
        debug!(trip_id = %itinerary.trip_id, day_count = itinerary.days.len(), "replace_active_itinerary: called");
        self.request(|reply| StateCommand::ReplaceActiveItinerary { itinerary, reply })
            .await
    }

    pub async fn get_active_itinerary(&self, trip_id: &str) -> StateResponse<Option<Itinerary>> {
        debug!(%trip_id, "get_active_itinerary: called");
        let trip_id = trip_id.to_string();
        self.request(|reply| StateCommand::GetActiveItinerary { trip_id, reply })
            .await
    }

    /// All versions for a trip, newest first
    pub async fn list_itineraries(&self, trip_id: &str) -> StateResponse<Vec<Itinerary>> {
        debug!(%trip_id, "list_itineraries: called");
        let trip_id = trip_id.to_string();
        self.request(|reply| StateCommand::ListItineraries { trip_id, reply })
            .await
    }

    // === Share ===

    /// Look up a shareable trip by token; the store applies the visibility policy
    pub async fn get_shared_trip(&self, share_token: &str) -> StateResponse<Option<SharedTrip>> {
        debug!("get_shared_trip: called");
        let share_token = share_token.to_string();
        self.request(|reply| StateCommand::GetSharedTrip { share_token, reply })
            .await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateTrip { trip, reply } => {
                debug!(user_id = %trip.user_id, "actor_loop: CreateTrip command");
                let _ = reply.send(store.create_trip(trip).map_err(StateError::from));
            }

            StateCommand::GetTrip { id, reply } => {
                debug!(%id, "actor_loop: GetTrip command");
                let _ = reply.send(store.trip(&id).map_err(StateError::from));
            }

            StateCommand::GetOwnedTrip { id, user_id, reply } => {
                debug!(%id, %user_id, "actor_loop: GetOwnedTrip command");
                let _ = reply.send(store.trip_for_owner(&id, &user_id).map_err(StateError::from));
            }

            StateCommand::ListTrips {
                user_id,
                include_archived,
                reply,
            } => {
                debug!(%user_id, include_archived, "actor_loop: ListTrips command");
                let _ = reply.send(store.list_trips(&user_id, include_archived).map_err(StateError::from));
            }

            StateCommand::UpdateTripSettings {
                id,
                user_id,
                status,
                visibility,
                reply,
            } => {
                debug!(%id, "actor_loop: UpdateTripSettings command");
                let result = store
                    .update_trip_settings(&id, &user_id, status, visibility)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::SetGenerationState {
                trip_id,
                status,
                error,
                reply,
            } => {
                debug!(%trip_id, %status, "actor_loop: SetGenerationState command");
                let result = store
                    .set_generation_state(&trip_id, status, error)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::EnsureProfile { seed, reply } => {
                debug!(user_id = %seed.id, "actor_loop: EnsureProfile command");
                let _ = reply.send(store.ensure_profile(seed).map_err(StateError::from));
            }

            StateCommand::GetProfile { user_id, reply } => {
                debug!(%user_id, "actor_loop: GetProfile command");
                let _ = reply.send(store.profile(&user_id).map_err(StateError::from));
            }

            StateCommand::CompleteOnboarding {
                user_id,
                travel_style,
                preferences,
                reply,
            } => {
                debug!(%user_id, "actor_loop: CompleteOnboarding command");
                let result = store
                    .complete_onboarding(&user_id, &travel_style, &preferences)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::ReplaceActiveItinerary { itinerary, reply } => {
                debug!(trip_id = %itinerary.trip_id, "actor_loop: ReplaceActiveItinerary command");
                let _ = reply.send(store.replace_active_itinerary(itinerary).map_err(StateError::from));
            }

            StateCommand::GetActiveItinerary { trip_id, reply } => {
                debug!(%trip_id, "actor_loop: GetActiveItinerary command");
                let _ = reply.send(store.active_itinerary(&trip_id).map_err(StateError::from));
            }

            StateCommand::ListItineraries { trip_id, reply } => {
                debug!(%trip_id, "actor_loop: ListItineraries command");
                let _ = reply.send(store.list_itineraries(&trip_id).map_err(StateError::from));
            }

            StateCommand::GetSharedTrip { share_token, reply } => {
                debug!("actor_loop: GetSharedTrip command");
                let _ = reply.send(store.shared_trip(&share_token).map_err(StateError::from));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
