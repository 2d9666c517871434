//! Solidly-style routing (Velodrome, Aerodrome)
//!
//! Routers take a list of `(from, to, stable, factory)` hops and only quote
//! exact-input. Exact-output quotes are found by ratio refinement over
//! exact-input simulations.

pub mod quote;
pub mod routes;

pub use quote::best_quote;
pub use routes::candidate_routes;
