//! Ando - trip itinerary generation
//!
//! Ando turns a trip (destination, dates, travelers, budget) and the
//! traveler's profile into a day-by-day itinerary produced by an LLM,
//! keeps every generated version, and serves a read-only view of a trip
//! through its share link.
//!
//! # Core Concepts
//!
//! - **Versioned Itineraries**: Regenerating never overwrites; one version per trip is active
//! - **Ownership at the Boundary**: Every trip operation runs as an explicit [`domain::Identity`]
//! - **Shape-checked Output**: Provider replies must match the trip's calendar before anything is stored
//!
//! # Modules
//!
//! - [`domain`] - Trip intake rules, payload checks, share tokens
//! - [`llm`] - LLM client trait and OpenAI-compatible implementation
//! - [`prompts`] - Handlebars prompt rendering
//! - [`state`] - Actor in front of the SQLite store
//! - [`generation`] - Generate/regenerate orchestration
//! - [`share`] - Public share resolution
//! - [`http`] - JSON API
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod generation;
pub mod http;
pub mod llm;
pub mod prompts;
pub mod share;
pub mod state;

// Re-export commonly used types
pub use config::{Config, LlmConfig, ServerConfig, StorageConfig};
pub use domain::{Identity, ShareToken, TripDraft};
pub use generation::{GenerationError, ItineraryGenerator};
pub use http::{ApiError, AppState, router, serve};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use prompts::PromptBuilder;
pub use share::{ShareError, SharedTripLookup, resolve_shared_trip};
pub use state::{StateError, StateManager};
