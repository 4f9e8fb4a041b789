//! HTTP API
//!
//! JSON endpoints for trips, profiles, itinerary generation and public
//! share links. Authentication happens upstream: the caller's user id
//! arrives in a trusted request header.

mod error;
mod routes;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::Identity;
use crate::generation::ItineraryGenerator;
use crate::llm::create_client;
use crate::prompts::PromptBuilder;
use crate::state::StateManager;

pub use error::ApiError;
pub use routes::router;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub state: StateManager,
    pub generator: ItineraryGenerator,
    identity_header: HeaderName,
}

impl AppState {
    pub fn new(state: StateManager, generator: ItineraryGenerator, identity_header: &str) -> Result<Self> {
        let identity_header = HeaderName::from_bytes(identity_header.trim().to_ascii_lowercase().as_bytes())
            .with_context(|| format!("Invalid identity header name: {}", identity_header))?;
        Ok(Self {
            state,
            generator,
            identity_header,
        })
    }

    /// Authenticated caller, or `Unauthorized` when the header is missing or blank
    pub fn identity(&self, headers: &HeaderMap) -> Result<Identity, ApiError> {
        headers
            .get(&self.identity_header)
            .and_then(|value| value.to_str().ok())
            .and_then(Identity::new)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Run the API server until Ctrl+C
pub async fn serve(config: &Config, bind: Option<&str>) -> Result<()> {
    debug!(?bind, "serve: called");
    let state = StateManager::spawn(&config.storage.db_dir)?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(PromptBuilder::new()?);
    let generator = ItineraryGenerator::new(state.clone(), llm, prompts).with_max_tokens(config.llm.max_tokens);
    let app = router(AppState::new(state.clone(), generator, &config.server.identity_header)?);

    let addr = bind.unwrap_or(&config.server.bind);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, db_dir = %config.storage.db_dir.display(), "Ando API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped, shutting down state manager");
    state.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    fn app_state(header: &str) -> Result<(AppState, tempfile::TempDir)> {
        let temp = tempfile::tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let generator = ItineraryGenerator::new(
            state.clone(),
            Arc::new(MockLlmClient::new(vec![])),
            Arc::new(PromptBuilder::new().unwrap()),
        );
        Ok((AppState::new(state, generator, header)?, temp))
    }

    #[tokio::test]
    async fn test_identity_from_header() {
        let (st, _temp) = app_state("X-Ando-User-Id").unwrap();

        let mut headers = HeaderMap::new();
        assert!(matches!(st.identity(&headers), Err(ApiError::Unauthorized)));

        headers.insert("x-ando-user-id", "   ".parse().unwrap());
        assert!(matches!(st.identity(&headers), Err(ApiError::Unauthorized)));

        headers.insert("x-ando-user-id", "user-a".parse().unwrap());
        assert_eq!(st.identity(&headers).unwrap().user_id(), "user-a");
    }

    #[tokio::test]
    async fn test_invalid_header_name_rejected() {
        assert!(app_state("not a header").is_err());
    }
}
