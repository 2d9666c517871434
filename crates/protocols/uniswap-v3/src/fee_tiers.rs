//! Fee-tier discovery
//!
//! A V3 pair can have one pool per fee tier. Tiers are found by asking the
//! factory for each candidate tier and keeping those with a deployed pool.
//! Discovery results are memoised per request in a [`FeeTierCache`], so a
//! leg shared by several candidate paths (or by the single- and multi-hop
//! families) is probed once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy_primitives::Address;
use evm_client::{ChainReader, PoolQuery};
use futures::future::join_all;
use tokio::sync::OnceCell;

/// Tiers of `candidates` with a deployed `(a, b)` pool, in candidate order.
///
/// Every tier is probed concurrently. A failed probe counts as "no pool".
pub async fn available_fee_tiers(
    reader: &dyn ChainReader,
    factory: Address,
    a: Address,
    b: Address,
    candidates: &[u32],
) -> Vec<u32> {
    let probes = candidates.iter().map(|&fee| async move {
        let query = PoolQuery::V3 {
            factory,
            token_a: a,
            token_b: b,
            fee,
        };
        match reader.pool_address(query).await {
            Ok(Some(_)) => Some(fee),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(%factory, fee, error = %e, "getPool failed");
                None
            }
        }
    });
    join_all(probes).await.into_iter().flatten().collect()
}

type LegKey = (Address, Address, Address);

fn leg_key(factory: Address, a: Address, b: Address) -> LegKey {
    if a < b {
        (factory, a, b)
    } else {
        (factory, b, a)
    }
}

/// Per-request memo of discovered fee tiers, keyed by factory and unordered pair
#[derive(Default)]
pub struct FeeTierCache {
    legs: Mutex<HashMap<LegKey, Arc<OnceCell<Vec<u32>>>>>,
}

impl FeeTierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deployed tiers for `(a, b)` on `factory`, probing only on first use.
    /// Concurrent callers for the same leg share one probe.
    pub async fn tiers(
        &self,
        reader: &dyn ChainReader,
        factory: Address,
        a: Address,
        b: Address,
        candidates: &[u32],
    ) -> Vec<u32> {
        let key = leg_key(factory, a, b);
        let cell = {
            let mut legs = self.legs.lock().unwrap_or_else(|e| e.into_inner());
            legs.entry(key).or_default().clone()
        };
        cell.get_or_init(|| available_fee_tiers(reader, key.0, key.1, key.2, candidates))
            .await
            .clone()
    }

    /// Discover every leg concurrently and return a lookup table for them
    pub async fn discover<I>(
        &self,
        reader: &dyn ChainReader,
        factory: Address,
        legs: I,
        candidates: &[u32],
    ) -> FeeTierMap
    where
        I: IntoIterator<Item = (Address, Address)>,
    {
        let mut unique: Vec<(Address, Address)> = Vec::new();
        for (a, b) in legs {
            let (_, x, y) = leg_key(factory, a, b);
            if !unique.contains(&(x, y)) {
                unique.push((x, y));
            }
        }

        let found = join_all(
            unique
                .iter()
                .map(|&(x, y)| self.tiers(reader, factory, x, y, candidates)),
        )
        .await;

        FeeTierMap {
            tiers: unique.into_iter().zip(found).collect(),
        }
    }

    /// Number of legs probed so far
    pub fn probed_legs(&self) -> usize {
        self.legs.lock().map(|legs| legs.len()).unwrap_or_default()
    }
}

/// Deployed tiers for a set of legs
#[derive(Debug, Clone, Default)]
pub struct FeeTierMap {
    tiers: HashMap<(Address, Address), Vec<u32>>,
}

impl FeeTierMap {
    pub fn get(&self, a: Address, b: Address) -> &[u32] {
        let key = if a < b { (a, b) } else { (b, a) };
        self.tiers.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every fee assignment over the legs of `tokens`, first leg varying slowest
    pub fn combinations(&self, tokens: &[Address]) -> Vec<Vec<u32>> {
        let mut combos: Vec<Vec<u32>> = vec![Vec::new()];
        for leg in tokens.windows(2) {
            let tiers = self.get(leg[0], leg[1]);
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    tiers.iter().map(move |&fee| {
                        let mut fees = prefix.clone();
                        fees.push(fee);
                        fees
                    })
                })
                .collect();
            if combos.is_empty() {
                break;
            }
        }
        combos
    }
}
