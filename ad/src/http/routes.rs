use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::error::ApiError;
use super::AppState;
use crate::domain::{
    ProfileSeed, SharedTrip, TravelPreferences, TravelStyle, TripDraft, TripStatus, Visibility,
};
use crate::share::resolve_shared_trip;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/trips", get(list_trips).post(create_trip))
        .route("/api/trips/:id", get(get_trip).patch(update_trip))
        .route("/api/trips/:id/itineraries", get(list_itineraries))
        .route("/api/itineraries/generate", post(generate_itinerary))
        .route("/api/auth/callback", post(auth_callback))
        .route("/api/profile", get(get_profile))
        .route("/api/profile/onboarding", put(complete_onboarding))
        .route("/api/shared/:token", get(get_shared))
        .with_state(state)
}

/// Decode a JSON body; any failure is a plain "Invalid request body"
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "parse_body: rejected");
        ApiError::invalid_body()
    })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

// === Trips ===

async fn list_trips(State(st): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "list_trips: called");
    let trips = st.state.list_trips(identity.user_id(), false).await?;
    Ok(Json(json!({ "trips": trips })))
}

async fn create_trip(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "create_trip: called");
    let draft: TripDraft = parse_body(&body)?;
    let today = chrono::Utc::now().date_naive();
    let new_trip = draft.validate(identity.user_id(), today)?;

    let trip = st.state.create_trip(new_trip).await?;
    info!(trip_id = %trip.id, user_id = %identity, "Trip created");
    Ok((StatusCode::CREATED, Json(json!({ "trip": trip }))))
}

async fn get_trip(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(%id, user_id = %identity, "get_trip: called");
    let trip = st
        .state
        .get_owned_trip(&id, identity.user_id())
        .await?
        .ok_or(ApiError::NotFound)?;
    let itinerary = st.state.get_active_itinerary(&trip.id).await?;
    let generation = trip.generation;
    Ok(Json(json!({ "trip": trip, "itinerary": itinerary, "generation": generation })))
}

#[derive(Debug, Deserialize)]
struct TripSettingsBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
}

async fn update_trip(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(%id, user_id = %identity, "update_trip: called");
    let settings: TripSettingsBody = parse_body(&body)?;

    let status = settings
        .status
        .as_deref()
        .map(str::parse::<TripStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let visibility = settings
        .visibility
        .as_deref()
        .map(str::parse::<Visibility>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if status.is_none() && visibility.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let trip = st
        .state
        .update_trip_settings(&id, identity.user_id(), status, visibility)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "trip": trip })))
}

async fn list_itineraries(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(%id, user_id = %identity, "list_itineraries: called");
    let trip = st
        .state
        .get_owned_trip(&id, identity.user_id())
        .await?
        .ok_or(ApiError::NotFound)?;
    let itineraries = st.state.list_itineraries(&trip.id).await?;
    Ok(Json(json!({ "itineraries": itineraries })))
}

// === Generation ===

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default, rename = "tripId", alias = "trip_id")]
    trip_id: Option<String>,
}

async fn generate_itinerary(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "generate_itinerary: called");
    let request: GenerateBody = parse_body(&body)?;
    let trip_id = request
        .trip_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("tripId is required".to_string()))?;

    // Runs to completion even if the client goes away
    let generator = st.generator.clone();
    let task = tokio::spawn(async move { generator.generate(Some(&identity), &trip_id).await });
    let itinerary = task.await.map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(json!({ "itinerary": itinerary })))
}

// === Profile ===

#[derive(Debug, Default, Deserialize)]
struct AuthCallbackBody {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

async fn auth_callback(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "auth_callback: called");
    let seed: AuthCallbackBody = if body.iter().all(u8::is_ascii_whitespace) {
        AuthCallbackBody::default()
    } else {
        parse_body(&body)?
    };

    let profile = st
        .state
        .ensure_profile(ProfileSeed {
            id: identity.user_id().to_string(),
            display_name: seed.display_name,
            avatar_url: seed.avatar_url,
        })
        .await?;
    let next = if profile.onboarded { "dashboard" } else { "onboarding" };
    Ok(Json(json!({ "profile": profile, "next": next })))
}

async fn get_profile(State(st): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "get_profile: called");
    let profile = st
        .state
        .get_profile(identity.user_id())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "profile": profile })))
}

#[derive(Debug, Deserialize)]
struct OnboardingBody {
    #[serde(default)]
    travel_style: TravelStyle,
    #[serde(default)]
    preferences: TravelPreferences,
}

async fn complete_onboarding(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let identity = st.identity(&headers)?;
    debug!(user_id = %identity, "complete_onboarding: called");
    let answers: OnboardingBody = parse_body(&body)?;
    let profile = st
        .state
        .complete_onboarding(identity.user_id(), answers.travel_style, answers.preferences)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "profile": profile })))
}

// === Share ===

/// Trip fields visible to anyone holding a share link
#[derive(Debug, Serialize)]
struct PublicTrip {
    id: String,
    destination: String,
    title: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    traveler_count: u32,
    budget_total: Option<f64>,
    currency: String,
}

async fn get_shared(State(st): State<AppState>, Path(token): Path<String>) -> Result<impl IntoResponse, ApiError> {
    debug!("get_shared: called");
    let SharedTrip {
        trip_id,
        destination,
        title,
        start_date,
        end_date,
        traveler_count,
        budget_total,
        currency,
        itinerary,
    } = resolve_shared_trip(&st.state, &token).await?;

    let trip = PublicTrip {
        id: trip_id,
        destination,
        title,
        start_date,
        end_date,
        traveler_count,
        budget_total,
        currency,
    };
    Ok(Json(json!({ "trip": trip, "itinerary": itinerary })))
}
