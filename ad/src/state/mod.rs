//! State management with actor pattern
//!
//! StateManager owns the trip store and processes messages via channels,
//! so every read and write is serialized through one connection.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
