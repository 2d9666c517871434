//! Route aggregation
//!
//! Fans a quote request out over every DEX family a chain configures and
//! folds the answers down to the single best [`Route`](dexroute_core::Route).
//! [`QuoteSession`] adds debouncing and supersession on top for callers that
//! re-quote as the user types.

pub mod aggregator;
pub mod session;
pub mod wrap;

pub use aggregator::Aggregator;
pub use session::{QuoteOutcome, QuoteSession};
