//! Application state shared across API handlers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dexroute_core::{ChainRegistry, RouteError, Token, TradeDirection};
use evm_client::EndpointStatus;
use router::{Aggregator, QuoteOutcome, QuoteSession};
use thiserror::Error;
use tokio::sync::RwLock;

const MAX_SESSION_ID_LEN: usize = 64;
const DEFAULT_MAX_SESSIONS: usize = 1024;
const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(300);

/// Bounds on the session map: idle sessions expire and the least recently
/// used one is evicted once the map is full
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_SESSION_IDLE_TTL,
        }
    }
}

/// Errors raised by the state layer before any quoting happens
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid session id: {reason}")]
    InvalidSessionId { reason: String },
}

/// Session ids are short client-chosen tokens: ASCII letters, digits, `-` and `_`
fn validate_session_id(id: &str) -> Result<(), StateError> {
    if id.is_empty() {
        return Err(StateError::InvalidSessionId {
            reason: "empty".to_string(),
        });
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(StateError::InvalidSessionId {
            reason: format!("{} chars, maximum {}", id.len(), MAX_SESSION_ID_LEN),
        });
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(StateError::InvalidSessionId {
            reason: format!("invalid character '{}'", c),
        });
    }
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct SessionEntry {
    session: Arc<QuoteSession>,
    last_used: Instant,
}

struct AppStateInner {
    aggregator: Arc<Aggregator>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    session_limits: SessionLimits,
    endpoints: RwLock<HashMap<u64, EndpointStatus>>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self::with_session_limits(aggregator, SessionLimits::default())
    }

    pub fn with_session_limits(aggregator: Aggregator, session_limits: SessionLimits) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                aggregator: Arc::new(aggregator),
                sessions: RwLock::new(HashMap::new()),
                session_limits,
                endpoints: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.inner.aggregator
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.inner.aggregator.registry()
    }

    /// Record the latest probe result for a chain's endpoint
    pub async fn set_endpoint_status(&self, chain_id: u64, status: EndpointStatus) {
        self.inner.endpoints.write().await.insert(chain_id, status);
    }

    pub async fn endpoint_status(&self, chain_id: u64) -> Option<EndpointStatus> {
        self.inner.endpoints.read().await.get(&chain_id).cloned()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Get or create the debounced session for `id`
    pub async fn session(&self, id: &str) -> Result<Arc<QuoteSession>, StateError> {
        validate_session_id(id)?;
        let limits = self.inner.session_limits;
        let now = Instant::now();

        let mut sessions = self.inner.sessions.write().await;
        if let Some(entry) = sessions.get_mut(id) {
            if now.duration_since(entry.last_used) < limits.idle_ttl {
                entry.last_used = now;
                return Ok(entry.session.clone());
            }
        }

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < limits.idle_ttl);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "dropped idle quote sessions");
        }
        while sessions.len() >= limits.max_sessions.max(1) {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            tracing::debug!(session = %oldest, "evicting least recently used quote session");
            sessions.remove(&oldest);
        }

        tracing::debug!(session = id, "opening quote session");
        let session = Arc::new(QuoteSession::new(self.inner.aggregator.clone()));
        sessions.insert(
            id.to_string(),
            SessionEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        Ok(session)
    }

    /// Quote directly, or through the named session when one is given
    pub async fn quote(
        &self,
        direction: TradeDirection,
        token_in: Token,
        token_out: Token,
        chain_id: u64,
        amount: String,
        session: Option<&str>,
    ) -> Result<Result<QuoteOutcome, RouteError>, StateError> {
        match session {
            Some(id) => {
                let session = self.session(id).await?;
                Ok(session
                    .quote(direction, token_in, token_out, chain_id, amount)
                    .await)
            }
            None => Ok(self
                .inner
                .aggregator
                .quote(direction, &token_in, &token_out, chain_id, &amount)
                .await
                .map(QuoteOutcome::Ready)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexroute_core::QuoteConfig;

    fn state() -> AppState {
        let registry = Arc::new(ChainRegistry::embedded().unwrap());
        AppState::new(Aggregator::new(registry, QuoteConfig::default()))
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("tab-1_a").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("has space").is_err());
        assert!(validate_session_id(&"a".repeat(65)).is_err());
    }

    fn limited_state(max_sessions: usize, idle_ttl: Duration) -> AppState {
        let registry = Arc::new(ChainRegistry::embedded().unwrap());
        AppState::with_session_limits(
            Aggregator::new(registry, QuoteConfig::default()),
            SessionLimits { max_sessions, idle_ttl },
        )
    }

    #[tokio::test]
    async fn test_full_map_evicts_least_recently_used() {
        let state = limited_state(2, Duration::from_secs(60));
        let a = state.session("a").await.unwrap();
        let _b = state.session("b").await.unwrap();
        // Touch "a" so "b" becomes the oldest
        let a_again = state.session("a").await.unwrap();
        assert!(Arc::ptr_eq(&a, &a_again));

        state.session("c").await.unwrap();
        assert_eq!(state.session_count().await, 2);
        let sessions = state.inner.sessions.read().await;
        assert!(sessions.contains_key("a"));
        assert!(!sessions.contains_key("b"));
        assert!(sessions.contains_key("c"));
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let state = limited_state(16, Duration::from_millis(20));
        let first = state.session("tab").await.unwrap();
        state.session("other").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let reopened = state.session("tab").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &reopened));
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_many_ids_stay_bounded() {
        let state = limited_state(8, Duration::from_secs(60));
        for i in 0..100 {
            state.session(&format!("tab-{i}")).await.unwrap();
        }
        assert_eq!(state.session_count().await, 8);
    }

    #[tokio::test]
    async fn test_session_is_reused() {
        let state = state();
        let a = state.session("tab").await.unwrap();
        let b = state.session("tab").await.unwrap();
        let c = state.session("other").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
