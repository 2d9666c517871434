//! Uniswap V2-style routing
//!
//! Constant-product routers quoted through `getAmountsOut`/`getAmountsIn`.
//! Paths are built from the chain's bridge tokens without probing the
//! factory; a missing pair simply makes the router call revert.

pub mod paths;
pub mod quote;

pub use paths::candidate_paths;
pub use quote::best_quote;
