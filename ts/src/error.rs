//! Store error type

use thiserror::Error;

/// Errors returned by [`crate::Store`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown id: {0}")]
    UnknownId(String),

    #[error("trip {trip_id} would have {active} active itineraries")]
    ActiveInvariant { trip_id: String, active: i64 },
}
