//! Debounced quoting for interactive callers
//!
//! Each call supersedes the previous one: the older task is aborted and its
//! caller gets [`QuoteOutcome::Superseded`]. A new quote only starts after
//! the debounce window, so bursts of keystrokes cost one search.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dexroute_core::{Route, RouteError, Token, TradeDirection};
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::Aggregator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "route", rename_all = "snake_case")]
pub enum QuoteOutcome {
    /// The search ran to completion; `None` means no route exists
    Ready(Option<Route>),
    /// A newer request replaced this one before it finished
    Superseded,
}

/// Latest request of a session. Both fields change under one lock so the
/// newest generation always owns the stored handle.
#[derive(Default)]
struct Inflight {
    generation: u64,
    handle: Option<AbortHandle>,
}

pub struct QuoteSession {
    aggregator: Arc<Aggregator>,
    debounce: Duration,
    inflight: Mutex<Inflight>,
}

impl QuoteSession {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        let debounce = Duration::from_millis(aggregator.config().debounce_ms);
        Self::with_debounce(aggregator, debounce)
    }

    pub fn with_debounce(aggregator: Arc<Aggregator>, debounce: Duration) -> Self {
        Self {
            aggregator,
            debounce,
            inflight: Mutex::new(Inflight::default()),
        }
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    fn inflight(&self) -> MutexGuard<'_, Inflight> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn quote(
        &self,
        direction: TradeDirection,
        token_in: Token,
        token_out: Token,
        chain_id: u64,
        amount: String,
    ) -> Result<QuoteOutcome, RouteError> {
        let aggregator = self.aggregator.clone();
        let debounce = self.debounce;

        let (generation, task) = {
            let mut inflight = self.inflight();
            inflight.generation += 1;
            let task = tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                aggregator
                    .quote(direction, &token_in, &token_out, chain_id, &amount)
                    .await
            });
            if let Some(previous) = inflight.handle.replace(task.abort_handle()) {
                previous.abort();
            }
            (inflight.generation, task)
        };

        let result = match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!(generation, "quote superseded before completion");
                return Ok(QuoteOutcome::Superseded);
            }
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        };

        if self.inflight().generation != generation {
            debug!(generation, "quote finished after a newer request");
            return Ok(QuoteOutcome::Superseded);
        }
        result.map(QuoteOutcome::Ready)
    }
}
