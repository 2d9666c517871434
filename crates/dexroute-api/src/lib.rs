//! dexroute-api: HTTP API layer for dexroute
//!
//! Exposes the chain registry and the route aggregator over JSON.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, SessionLimits, StateError};
