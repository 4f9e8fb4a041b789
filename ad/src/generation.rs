//! Itinerary generation orchestrator
//!
//! Drives one generate/regenerate request for a trip:
//!
//! 1. the caller must be authenticated and own the trip
//! 2. the trip is marked `generating`
//! 3. one provider call with the rendered prompt
//! 4. the reply is parsed and shape-checked
//! 5. the store swaps the active version in a single transaction
//! 6. the trip is marked `active` or `failed{upstream|persistence|internal}`
//!
//! Concurrent requests for the same trip are not coordinated. Both run to
//! completion and whichever commits last is the active version.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{
    GenerationFailure, GenerationStatus, Identity, Itinerary, NewItinerary, Trip, parse_itinerary,
};
use crate::llm::{LlmClient, StopReason};
use crate::prompts::PromptBuilder;
use crate::state::{StateError, StateManager};

/// Default response token budget for one itinerary
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Failure of a generation request
///
/// Causes are carried for logging; callers show a generic message.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no authenticated user")]
    Unauthenticated,

    #[error("trip not found")]
    NotFound,

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("persisting the itinerary failed: {0}")]
    PersistFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Terminal failure recorded on the trip, if the error happened after `generating` was set
    fn failure(&self) -> Option<GenerationFailure> {
        match self {
            GenerationError::GenerationFailed(_) => Some(GenerationFailure::Upstream),
            GenerationError::PersistFailed(_) => Some(GenerationFailure::Persistence),
            GenerationError::Internal(_) => Some(GenerationFailure::Internal),
            GenerationError::Unauthenticated | GenerationError::NotFound => None,
        }
    }
}

/// Runs generations against the state actor and a provider
#[derive(Clone)]
pub struct ItineraryGenerator {
    state: StateManager,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptBuilder>,
    max_tokens: u32,
}

impl ItineraryGenerator {
    pub fn new(state: StateManager, llm: Arc<dyn LlmClient>, prompts: Arc<PromptBuilder>) -> Self {
        debug!(model = %llm.model(), "ItineraryGenerator::new: called");
        Self {
            state,
            llm,
            prompts,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Generate (or regenerate) the active itinerary for `trip_id` as `identity`
    ///
    /// Ownership is checked before any other work, so a caller who does not
    /// own the trip causes no provider call and no writes.
    pub async fn generate(&self, identity: Option<&Identity>, trip_id: &str) -> Result<Itinerary, GenerationError> {
        debug!(%trip_id, "generate: called");
        let identity = identity.ok_or(GenerationError::Unauthenticated)?;

        let trip = self
            .state
            .get_owned_trip(trip_id, identity.user_id())
            .await
            .map_err(|e| GenerationError::Internal(e.to_string()))?
            .ok_or_else(|| {
                debug!(%trip_id, user_id = %identity, "generate: trip not found or not owned");
                GenerationError::NotFound
            })?;

        self.state
            .set_generation_state(&trip.id, GenerationStatus::Generating, None)
            .await
            .map_err(|e| GenerationError::Internal(e.to_string()))?;
        info!(trip_id = %trip.id, destination = %trip.destination, "Generating itinerary");

        let result = self.run(identity, &trip).await;

        let (status, failure) = match &result {
            Ok(_) => (GenerationStatus::Active, None),
            Err(e) => (GenerationStatus::Failed, e.failure()),
        };
        if let Err(e) = self.state.set_generation_state(&trip.id, status, failure).await {
            error!(trip_id = %trip.id, %status, error = %e, "Failed to record generation outcome");
        }

        match &result {
            Ok(itinerary) => info!(
                trip_id = %trip.id,
                version = itinerary.version,
                days = itinerary.days.len(),
                "Itinerary generated"
            ),
            Err(GenerationError::GenerationFailed(cause)) => {
                warn!(trip_id = %trip.id, %cause, "Itinerary generation failed upstream")
            }
            Err(e) => error!(trip_id = %trip.id, error = %e, "Itinerary generation failed"),
        }

        result
    }

    async fn run(&self, identity: &Identity, trip: &Trip) -> Result<Itinerary, GenerationError> {
        debug!(trip_id = %trip.id, "run: called");
        let profile = self
            .state
            .get_profile(identity.user_id())
            .await
            .map_err(|e| GenerationError::Internal(e.to_string()))?;
        if profile.is_none() {
            debug!(user_id = %identity, "run: no profile, using neutral defaults");
        }

        let request = self
            .prompts
            .build_generation_request(trip, profile.as_ref())
            .map_err(|e| GenerationError::Internal(e.to_string()))?;
        let prompt_hash = request.prompt_hash();

        let response = self
            .llm
            .complete(request.to_completion_request(self.max_tokens))
            .await
            .map_err(|e| GenerationError::GenerationFailed(e.to_string()))?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "run: provider replied"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!(trip_id = %trip.id, "Provider reply hit the token limit");
        }

        let days = parse_itinerary(response.content.as_deref(), trip)
            .map_err(|e| GenerationError::GenerationFailed(e.to_string()))?;

        self.state
            .replace_active_itinerary(NewItinerary {
                trip_id: trip.id.clone(),
                ai_model: Some(self.llm.model().to_string()),
                prompt_hash: Some(prompt_hash),
                days,
            })
            .await
            .map_err(|e| match e {
                StateError::ChannelError => GenerationError::Internal(e.to_string()),
                other => GenerationError::PersistFailed(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTrip, Pace, ProfileSeed, TravelPreferences, TravelStyle, Visibility};
    use crate::llm::client::mock::{MockLlmClient, MockReply};
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use tempfile::TempDir;

    fn tokyo() -> NewTrip {
        NewTrip {
            user_id: "user-a".to_string(),
            destination: "Tokyo".to_string(),
            title: None,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            traveler_count: 2,
            budget_total: None,
            currency: "JPY".to_string(),
            visibility: Visibility::Private,
        }
    }

    fn itinerary_json(start: NaiveDate, days: u32) -> String {
        let days: Vec<_> = (1..=days)
            .map(|day| {
                json!({
                    "day": day,
                    "date": (start + Duration::days(i64::from(day) - 1)).to_string(),
                    "theme": format!("Day {day}"),
                    "walking_km": 4.0,
                    "estimated_cost": 5000,
                    "activities": [{
                        "time": "09:30",
                        "duration_min": 120,
                        "name": "Meiji Shrine",
                        "category": "attraction",
                        "description": "Forest shrine",
                        "notes": null,
                        "cost_estimate": 0,
                        "travel_to_next": {"mode": "walk", "duration_min": 15}
                    }]
                })
            })
            .collect();
        json!({ "days": days }).to_string()
    }

    struct Harness {
        _temp: TempDir,
        state: StateManager,
        llm: Arc<MockLlmClient>,
        generator: ItineraryGenerator,
        trip: Trip,
        owner: Identity,
    }

    async fn harness(llm: MockLlmClient) -> Harness {
        let temp = TempDir::new().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let trip = state.create_trip(tokyo()).await.unwrap();
        let llm = Arc::new(llm);
        let generator = ItineraryGenerator::new(
            state.clone(),
            llm.clone(),
            Arc::new(PromptBuilder::new().unwrap()),
        );
        Harness {
            _temp: temp,
            state,
            llm,
            generator,
            trip,
            owner: Identity::new("user-a").unwrap(),
        }
    }

    fn tokyo_reply() -> String {
        itinerary_json(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 5)
    }

    #[tokio::test]
    async fn test_tokyo_generation_produces_five_days() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply()])).await;

        let itinerary = h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();

        assert_eq!(itinerary.version, 1);
        assert!(itinerary.is_active);
        assert_eq!(itinerary.days.len(), 5);
        let dates: Vec<String> = itinerary.days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(
            dates,
            vec!["2025-06-01", "2025-06-02", "2025-06-03", "2025-06-04", "2025-06-05"]
        );
        assert!(itinerary.days.iter().all(|d| !d.activities.is_empty()));
        assert_eq!(itinerary.ai_model.as_deref(), Some("mock-model"));
        assert_eq!(itinerary.prompt_hash.as_ref().map(String::len), Some(64));

        assert_eq!(h.llm.call_count(), 1);
        let request = &h.llm.requests()[0];
        assert!(request.json_mode);
        assert!(request.messages[0].content.contains("Create a 5-day itinerary for Tokyo."));

        let trip = h.state.get_trip(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(trip.generation.status, GenerationStatus::Active);
        assert!(trip.generation.error.is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_does_no_work() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply()])).await;

        let result = h.generator.generate(None, &h.trip.id).await;
        assert!(matches!(result, Err(GenerationError::Unauthenticated)));
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_other_user_gets_not_found_and_nothing_changes() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply()])).await;
        let intruder = Identity::new("user-b").unwrap();

        let result = h.generator.generate(Some(&intruder), &h.trip.id).await;
        assert!(matches!(result, Err(GenerationError::NotFound)));
        assert_eq!(h.llm.call_count(), 0);
        assert!(h.state.list_itineraries(&h.trip.id).await.unwrap().is_empty());

        let trip = h.state.get_trip(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(trip.generation.status, GenerationStatus::None);
    }

    #[tokio::test]
    async fn test_unknown_trip_is_not_found() {
        let h = harness(MockLlmClient::new(vec![])).await;
        let result = h.generator.generate(Some(&h.owner), "no-such-trip").await;
        assert!(matches!(result, Err(GenerationError::NotFound)));
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_regenerate_leaves_exactly_one_active() {
        let reply = tokyo_reply();
        let h = harness(MockLlmClient::with_texts(&[&reply, &reply])).await;

        let first = h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();
        let second = h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();
        assert_eq!(second.version, 2);

        let versions = h.state.list_itineraries(&h.trip.id).await.unwrap();
        assert_eq!(versions.iter().filter(|i| i.is_active).count(), 1);
        let previous = versions.iter().find(|i| i.id == first.id).unwrap();
        assert!(!previous.is_active);

        let active = h.state.get_active_itinerary(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(h.llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_bad_provider_payloads_persist_nothing() {
        for reply in ["", "Sure! Here is your trip.", r#"{"days": "five"}"#, r#"{"days": []}"#] {
            let h = harness(MockLlmClient::with_texts(&[reply])).await;

            let result = h.generator.generate(Some(&h.owner), &h.trip.id).await;
            assert!(
                matches!(result, Err(GenerationError::GenerationFailed(_))),
                "reply {reply:?} gave {result:?}"
            );
            assert!(h.state.list_itineraries(&h.trip.id).await.unwrap().is_empty());

            let trip = h.state.get_trip(&h.trip.id).await.unwrap().unwrap();
            assert_eq!(trip.generation.status, GenerationStatus::Failed);
            assert_eq!(trip.generation.error, Some(GenerationFailure::Upstream));
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_generation_failure() {
        let h = harness(MockLlmClient::scripted(vec![MockReply::Fail {
            status: 503,
            message: "overloaded".to_string(),
        }]))
        .await;

        let result = h.generator.generate(Some(&h.owner), &h.trip.id).await;
        assert!(matches!(result, Err(GenerationError::GenerationFailed(_))));
        assert!(h.state.get_active_itinerary(&h.trip.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_regenerate_keeps_previous_active() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply(), "not json"])).await;

        let first = h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();
        assert!(h.generator.generate(Some(&h.owner), &h.trip.id).await.is_err());

        let active = h.state.get_active_itinerary(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn test_persist_failure_is_surfaced_and_recorded() {
        let reply = tokyo_reply();
        let h = harness(MockLlmClient::with_texts(&[&reply, &reply])).await;
        let first = h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();

        let raw = rusqlite::Connection::open(h.state.db_path()).unwrap();
        raw.execute_batch(
            "CREATE TRIGGER reject_itinerary BEFORE INSERT ON itineraries \
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

        let result = h.generator.generate(Some(&h.owner), &h.trip.id).await;
        assert!(matches!(result, Err(GenerationError::PersistFailed(_))));
        assert_eq!(h.llm.call_count(), 2);

        let trip = h.state.get_trip(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(trip.generation.status, GenerationStatus::Failed);
        assert_eq!(trip.generation.error, Some(GenerationFailure::Persistence));

        let active = h.state.get_active_itinerary(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn test_setup_failure_is_recorded_as_internal() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply()])).await;
        h.state
            .ensure_profile(ProfileSeed {
                id: "user-a".to_string(),
                ..ProfileSeed::default()
            })
            .await
            .unwrap();

        // An unreadable profile row fails the run before the provider is called
        let raw = rusqlite::Connection::open(h.state.db_path()).unwrap();
        raw.execute("UPDATE profiles SET travel_style = 'not json' WHERE id = 'user-a'", [])
            .unwrap();

        let result = h.generator.generate(Some(&h.owner), &h.trip.id).await;
        assert!(matches!(result, Err(GenerationError::Internal(_))));
        assert_eq!(h.llm.call_count(), 0);

        let trip = h.state.get_trip(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(trip.generation.status, GenerationStatus::Failed);
        assert_eq!(trip.generation.error, Some(GenerationFailure::Internal));
        assert!(h.state.list_itineraries(&h.trip.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_regenerates_both_commit_one_active() {
        // No in-flight guard: both requests succeed and the later commit wins.
        let reply = tokyo_reply();
        let h = harness(MockLlmClient::with_texts(&[&reply, &reply])).await;

        let (a, b) = tokio::join!(
            h.generator.generate(Some(&h.owner), &h.trip.id),
            h.generator.generate(Some(&h.owner), &h.trip.id),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.version, b.version);

        let versions = h.state.list_itineraries(&h.trip.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions.iter().filter(|i| i.is_active).count(), 1);

        let active = h.state.get_active_itinerary(&h.trip.id).await.unwrap().unwrap();
        assert_eq!(active.version, a.version.max(b.version));
    }

    #[tokio::test]
    async fn test_profile_personalizes_prompt() {
        let h = harness(MockLlmClient::with_texts(&[&tokyo_reply()])).await;
        h.state
            .ensure_profile(ProfileSeed {
                id: "user-a".to_string(),
                ..ProfileSeed::default()
            })
            .await
            .unwrap();
        h.state
            .complete_onboarding(
                "user-a",
                TravelStyle {
                    pace: Some(Pace::Fast),
                    budget: None,
                    interests: vec!["ramen".to_string()],
                },
                TravelPreferences {
                    dietary: vec!["halal".to_string()],
                    ..TravelPreferences::default()
                },
            )
            .await
            .unwrap();

        h.generator.generate(Some(&h.owner), &h.trip.id).await.unwrap();

        let context = &h.llm.requests()[0].messages[0].content;
        assert!(context.contains("Travel pace: fast"));
        assert!(context.contains("Interests: ramen"));
        assert!(context.contains("Dietary restrictions: halal"));
        assert!(context.contains("Budget level: mid"));
    }
}
