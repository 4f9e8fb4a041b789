//! Public share resolution
//!
//! The one read path that skips ownership. Which trips are shareable is
//! decided by the store; this module only rejects malformed tokens early
//! and collapses every miss into the same `NotFound`.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ShareToken, SharedTrip};
use crate::state::{StateError, StateManager};

#[derive(Debug, Error)]
pub enum ShareError {
    /// Malformed token, unknown token, or a trip that is not shared
    #[error("shared trip not found")]
    NotFound,

    #[error("share lookup failed: {0}")]
    Lookup(#[from] StateError),
}

/// Storage lookup of a shareable trip by token
#[async_trait]
pub trait SharedTripLookup: Send + Sync {
    async fn shared_trip(&self, token: &ShareToken) -> Result<Option<SharedTrip>, StateError>;
}

#[async_trait]
impl SharedTripLookup for StateManager {
    async fn shared_trip(&self, token: &ShareToken) -> Result<Option<SharedTrip>, StateError> {
        self.get_shared_trip(token.as_str()).await
    }
}

/// Resolve a raw share token to the public view of its trip
pub async fn resolve_shared_trip<L: SharedTripLookup + ?Sized>(
    lookup: &L,
    raw_token: &str,
) -> Result<SharedTrip, ShareError> {
    debug!("resolve_shared_trip: called");
    let token = ShareToken::parse(raw_token).map_err(|_| {
        debug!("resolve_shared_trip: malformed token, skipping lookup");
        ShareError::NotFound
    })?;

    lookup.shared_trip(&token).await?.ok_or(ShareError::NotFound)
}
