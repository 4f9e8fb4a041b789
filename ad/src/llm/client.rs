//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless provider client - each call is independent
///
/// One generation is exactly one `complete` call; the orchestrator never
/// retries at this level (transport retries live inside the implementation).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the whole reply
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier recorded on itineraries produced by this client
    fn model(&self) -> &str;
}
