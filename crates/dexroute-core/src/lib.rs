//! dexroute-core: Shared types, errors, chain registry and configuration
//!
//! This crate provides the foundational types used across the dexroute workspace:
//! tokens and amounts, the per-chain DEX registry, quote/route records and the
//! numeric helpers shared by every protocol family.

pub mod config;
pub mod constants;
pub mod errors;
pub mod math;
pub mod path;
pub mod quote;
pub mod refine;
pub mod registry;
pub mod types;

pub use config::*;
pub use errors::*;
pub use quote::*;
pub use registry::*;
pub use types::*;
