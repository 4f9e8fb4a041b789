//! Prompt Builder
//!
//! Maps a trip and its owner's profile onto the provider request.

use std::fmt::Write as _;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::embedded;
use crate::domain::{Profile, Trip};
use crate::llm::{CompletionRequest, Message};

const DEFAULT_BUDGET_TIER: &str = "mid";
const DEFAULT_PACE: &str = "medium";
const DEFAULT_INTERESTS: &str = "general sightseeing";
const DEFAULT_DIETARY: &str = "none";
const DEFAULT_ACCOMMODATION: &str = "hotel";
const BUDGET_NOT_SPECIFIED: &str = "not specified";

/// Values interpolated into the itinerary template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationContext {
    pub destination: String,
    pub day_count: i64,
    pub budget_tier: String,
    pub total_budget: String,
    pub pace: String,
    pub interests: String,
    pub dietary: String,
    /// Empty when the profile lists none; the template skips the line
    pub accessibility: String,
    pub traveler_count: u32,
    pub accommodation: String,
    pub start_date: String,
    pub end_date: String,
    pub currency: String,
}

impl GenerationContext {
    /// Collect template values, defaulting every personalization input the profile leaves unset
    pub fn new(trip: &Trip, profile: Option<&Profile>) -> Self {
        debug!(trip_id = %trip.id, has_profile = profile.is_some(), "GenerationContext::new: called");
        let style = profile.map(|p| &p.travel_style);
        let prefs = profile.map(|p| &p.preferences);

        let total_budget = match trip.budget_total {
            Some(amount) if amount > 0.0 => format!("{} {}", trip.currency, amount),
            _ => BUDGET_NOT_SPECIFIED.to_string(),
        };

        Self {
            destination: trip.destination.clone(),
            day_count: trip.day_count(),
            budget_tier: style
                .and_then(|s| s.budget)
                .map_or(DEFAULT_BUDGET_TIER, |b| b.as_str())
                .to_string(),
            total_budget,
            pace: style
                .and_then(|s| s.pace)
                .map_or(DEFAULT_PACE, |p| p.as_str())
                .to_string(),
            interests: join_or(style.map(|s| s.interests.as_slice()), DEFAULT_INTERESTS),
            dietary: join_or(prefs.map(|p| p.dietary.as_slice()), DEFAULT_DIETARY),
            accessibility: join_or(prefs.map(|p| p.accessibility.as_slice()), ""),
            traveler_count: trip.traveler_count,
            accommodation: prefs
                .and_then(|p| p.accommodation)
                .map_or(DEFAULT_ACCOMMODATION, |a| a.as_str())
                .to_string(),
            start_date: trip.start_date.to_string(),
            end_date: trip.end_date.to_string(),
            currency: trip.currency.clone(),
        }
    }
}

fn join_or(items: Option<&[String]>, fallback: &str) -> String {
    let joined = items
        .unwrap_or_default()
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() { fallback.to_string() } else { joined }
}

/// Rendered prompt pair: fixed rules plus per-trip context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub instructions: String,
    pub context: String,
}

impl GenerationRequest {
    /// Hex SHA-256 over instructions and context, stored with the itinerary
    pub fn prompt_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.instructions.as_bytes());
        hasher.update(b"\n\n");
        hasher.update(self.context.as_bytes());
        let digest = hasher.finalize();

        let mut out = String::with_capacity(64);
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// One JSON-mode completion call
    pub fn to_completion_request(&self, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            system_prompt: self.instructions.clone(),
            messages: vec![Message::user(self.context.clone())],
            max_tokens,
            json_mode: true,
        }
    }
}

/// Renders the embedded templates
pub struct PromptBuilder {
    hbs: Handlebars<'static>,
}

impl PromptBuilder {
    /// Compile the embedded templates
    pub fn new() -> Result<Self> {
        debug!("PromptBuilder::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(true);
        for name in ["system", "itinerary"] {
            let template = embedded::get_embedded(name).ok_or_else(|| eyre!("Prompt template not found: {}", name))?;
            hbs.register_template_string(name, template)
                .map_err(|e| eyre!("Failed to compile template {}: {}", name, e))?;
        }
        Ok(Self { hbs })
    }

    /// Build the provider request for one generation. Deterministic for equal inputs.
    pub fn build_generation_request(&self, trip: &Trip, profile: Option<&Profile>) -> Result<GenerationRequest> {
        debug!(trip_id = %trip.id, destination = %trip.destination, "build_generation_request: called");
        let context = GenerationContext::new(trip, profile);

        let instructions = self
            .hbs
            .render("system", &serde_json::json!({}))
            .map_err(|e| eyre!("Failed to render template system: {}", e))?;
        let context = self
            .hbs
            .render("itinerary", &context)
            .map_err(|e| eyre!("Failed to render template itinerary: {}", e))?;

        Ok(GenerationRequest {
            instructions: instructions.trim_end().to_string(),
            context: context.trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Accommodation, BudgetTier, GenerationState, Pace, TravelPreferences, TravelStyle, TripStatus, Visibility,
    };
    use chrono::NaiveDate;

    fn tokyo_trip() -> Trip {
        Trip {
            id: "trip-1".to_string(),
            user_id: "user-a".to_string(),
            destination: "Tokyo".to_string(),
            title: None,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            traveler_count: 2,
            budget_total: None,
            currency: "JPY".to_string(),
            status: TripStatus::Draft,
            visibility: Visibility::Private,
            share_token: "b3c1d2e4-5f60-4a7b-8c9d-0e1f2a3b4c5d".to_string(),
            generation: GenerationState::default(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn profile(style: TravelStyle, preferences: TravelPreferences) -> Profile {
        Profile {
            id: "user-a".to_string(),
            display_name: None,
            avatar_url: None,
            travel_style: style,
            preferences,
            onboarded: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_context_defaults_without_profile() {
        let ctx = GenerationContext::new(&tokyo_trip(), None);
        assert_eq!(ctx.day_count, 5);
        assert_eq!(ctx.budget_tier, "mid");
        assert_eq!(ctx.total_budget, "not specified");
        assert_eq!(ctx.pace, "medium");
        assert_eq!(ctx.interests, "general sightseeing");
        assert_eq!(ctx.dietary, "none");
        assert_eq!(ctx.accommodation, "hotel");
        assert_eq!(ctx.accessibility, "");
    }

    #[test]
    fn test_context_uses_profile_values() {
        let mut trip = tokyo_trip();
        trip.budget_total = Some(250000.0);
        let p = profile(
            TravelStyle {
                pace: Some(Pace::Fast),
                budget: Some(BudgetTier::Luxury),
                interests: vec!["food".to_string(), " anime ".to_string(), "".to_string()],
            },
            TravelPreferences {
                dietary: vec!["vegetarian".to_string()],
                accessibility: vec!["step-free".to_string()],
                accommodation: Some(Accommodation::Airbnb),
            },
        );

        let ctx = GenerationContext::new(&trip, Some(&p));
        assert_eq!(ctx.total_budget, "JPY 250000");
        assert_eq!(ctx.pace, "fast");
        assert_eq!(ctx.budget_tier, "luxury");
        assert_eq!(ctx.interests, "food, anime");
        assert_eq!(ctx.dietary, "vegetarian");
        assert_eq!(ctx.accessibility, "step-free");
        assert_eq!(ctx.accommodation, "airbnb");
    }

    #[test]
    fn test_render_interpolates_trip() {
        let builder = PromptBuilder::new().unwrap();
        let req = builder.build_generation_request(&tokyo_trip(), None).unwrap();

        assert!(req.instructions.contains("travel planner"));
        assert!(req.context.starts_with("Create a 5-day itinerary for Tokyo."));
        assert!(req.context.contains("- Travelers: 2"));
        assert!(req.context.contains("Trip dates: 2025-06-01 to 2025-06-05"));
        assert!(req.context.contains("Currency: JPY"));
        assert!(!req.context.contains("Accessibility"));
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let mut trip = tokyo_trip();
        trip.destination = "Trinidad & Tobago".to_string();
        let builder = PromptBuilder::new().unwrap();
        let req = builder.build_generation_request(&trip, None).unwrap();
        assert!(req.context.contains("Trinidad & Tobago"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::new().unwrap();
        let a = builder.build_generation_request(&tokyo_trip(), None).unwrap();
        let b = builder.build_generation_request(&tokyo_trip(), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.prompt_hash(), b.prompt_hash());
        assert_eq!(a.prompt_hash().len(), 64);

        let mut other = tokyo_trip();
        other.destination = "Osaka".to_string();
        let c = builder.build_generation_request(&other, None).unwrap();
        assert_ne!(a.prompt_hash(), c.prompt_hash());
    }

    #[test]
    fn test_completion_request_is_json_mode() {
        let builder = PromptBuilder::new().unwrap();
        let req = builder.build_generation_request(&tokyo_trip(), None).unwrap();
        let completion = req.to_completion_request(4096);
        assert!(completion.json_mode);
        assert_eq!(completion.system_prompt, req.instructions);
        assert_eq!(completion.messages.len(), 1);
        assert_eq!(completion.messages[0].content, req.context);
    }
}
