//! Prompt Template System
//!
//! Renders the `.pmt` templates compiled into the binary into the
//! generation request sent to the itinerary provider.
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod builder;

pub use builder::{GenerationContext, GenerationRequest, PromptBuilder};
