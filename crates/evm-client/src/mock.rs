//! In-memory chain for tests
//!
//! Pools are priced with the constant-product formula, so quotes behave like
//! real AMMs: larger trades get worse prices and exact-output inverts
//! exact-input. Every call is counted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dexroute_core::math::{amount_in, amount_out};
use dexroute_core::path::{decode_algebra, decode_v3};
use dexroute_core::{PathPayload, RpcError};

use crate::{ChainReader, PoolQuery, Result, SimulatedQuote};

/// Fee of every mock V2 pool (0.3%)
pub const V2_FEE_PPM: u32 = 3000;

#[derive(Debug, Clone)]
struct MockPool {
    address: Address,
    token0: Address,
    reserve0: U256,
    reserve1: U256,
    fee_ppm: u32,
}

impl MockPool {
    fn reserves(&self, token_in: Address) -> (U256, U256) {
        if token_in == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    fn sell(&self, token_in: Address, amount: U256) -> Option<U256> {
        let (r_in, r_out) = self.reserves(token_in);
        let out = amount_out(amount, r_in, r_out, self.fee_ppm);
        (!out.is_zero()).then_some(out)
    }

    fn buy(&self, token_in: Address, amount: U256) -> Option<U256> {
        let (r_in, r_out) = self.reserves(token_in);
        amount_in(amount, r_in, r_out, self.fee_ppm)
    }
}

fn sorted(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Constant-product test chain implementing [`ChainReader`]
#[derive(Default)]
pub struct MockChain {
    v2_routers: HashMap<Address, Address>,
    v3_quoters: HashMap<Address, Address>,
    v2_pools: HashMap<(Address, Address, Address), MockPool>,
    v3_pools: HashMap<(Address, Address, Address, u32), MockPool>,
    solidly_pools: HashMap<(Address, Address, Address, bool), MockPool>,
    algebra_pools: HashMap<(Address, Address, Address), MockPool>,
    reverting: HashSet<Address>,
    next_pool: u64,
    pool_calls: AtomicUsize,
    simulation_calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_pool(&mut self, a: Address, b: Address, ra: u128, rb: u128, fee_ppm: u32) -> MockPool {
        self.next_pool += 1;
        let (token0, _) = sorted(a, b);
        let (reserve0, reserve1) = if token0 == a {
            (U256::from(ra), U256::from(rb))
        } else {
            (U256::from(rb), U256::from(ra))
        };
        MockPool {
            address: Address::left_padding_from(&(0x1000 + self.next_pool).to_be_bytes()),
            token0,
            reserve0,
            reserve1,
            fee_ppm,
        }
    }

    /// Register a V2 router quoting against `factory`
    pub fn with_v2_router(mut self, router: Address, factory: Address) -> Self {
        self.v2_routers.insert(router, factory);
        self
    }

    /// Add a 0.3% V2 pair holding `ra` of `a` and `rb` of `b`
    pub fn with_v2_pool(mut self, factory: Address, a: Address, b: Address, ra: u128, rb: u128) -> Self {
        let pool = self.make_pool(a, b, ra, rb, V2_FEE_PPM);
        let (t0, t1) = sorted(a, b);
        self.v2_pools.insert((factory, t0, t1), pool);
        self
    }

    /// Register a QuoterV2 quoting against `factory`
    pub fn with_v3_quoter(mut self, quoter: Address, factory: Address) -> Self {
        self.v3_quoters.insert(quoter, factory);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_v3_pool(
        mut self,
        factory: Address,
        a: Address,
        b: Address,
        fee: u32,
        ra: u128,
        rb: u128,
    ) -> Self {
        let pool = self.make_pool(a, b, ra, rb, fee);
        let (t0, t1) = sorted(a, b);
        self.v3_pools.insert((factory, t0, t1, fee), pool);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_solidly_pool(
        mut self,
        factory: Address,
        a: Address,
        b: Address,
        stable: bool,
        ra: u128,
        rb: u128,
    ) -> Self {
        let fee = if stable { 500 } else { 3000 };
        let pool = self.make_pool(a, b, ra, rb, fee);
        let (t0, t1) = sorted(a, b);
        self.solidly_pools.insert((factory, t0, t1, stable), pool);
        self
    }

    /// Add a pool behind an Algebra quoter with a dynamic `fee`
    #[allow(clippy::too_many_arguments)]
    pub fn with_algebra_pool(
        mut self,
        quoter: Address,
        a: Address,
        b: Address,
        fee: u32,
        ra: u128,
        rb: u128,
    ) -> Self {
        let pool = self.make_pool(a, b, ra, rb, fee);
        let (t0, t1) = sorted(a, b);
        self.algebra_pools.insert((quoter, t0, t1), pool);
        self
    }

    /// Make every simulation through `target` revert
    pub fn reverting(mut self, target: Address) -> Self {
        self.reverting.insert(target);
        self
    }

    pub fn pool_calls(&self) -> usize {
        self.pool_calls.load(Ordering::SeqCst)
    }

    pub fn simulation_calls(&self) -> usize {
        self.simulation_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.pool_calls() + self.simulation_calls()
    }

    fn revert(reason: &str) -> RpcError {
        RpcError::Reverted {
            message: reason.to_string(),
        }
    }

    fn v2_pool(&self, factory: Address, a: Address, b: Address) -> Result<&MockPool> {
        let (t0, t1) = sorted(a, b);
        self.v2_pools
            .get(&(factory, t0, t1))
            .ok_or_else(|| Self::revert("pair does not exist"))
    }

    fn v3_pool(&self, factory: Address, a: Address, b: Address, fee: u32) -> Result<&MockPool> {
        let (t0, t1) = sorted(a, b);
        self.v3_pools
            .get(&(factory, t0, t1, fee))
            .ok_or_else(|| Self::revert("pool does not exist"))
    }

    fn algebra_pool(&self, quoter: Address, a: Address, b: Address) -> Result<&MockPool> {
        let (t0, t1) = sorted(a, b);
        self.algebra_pools
            .get(&(quoter, t0, t1))
            .ok_or_else(|| Self::revert("pool does not exist"))
    }

    fn factory_for(&self, map: &HashMap<Address, Address>, target: Address) -> Result<Address> {
        map.get(&target)
            .copied()
            .ok_or_else(|| Self::revert("unknown target"))
    }

    fn sell(&self, target: Address, path: &PathPayload, amount: U256) -> Result<SimulatedQuote> {
        let none = || Self::revert("insufficient liquidity");
        match path {
            PathPayload::Wrap(_) => Ok(SimulatedQuote::amount(amount)),
            PathPayload::V2(tokens) => {
                let factory = self.factory_for(&self.v2_routers, target)?;
                let mut amt = amount;
                for leg in tokens.windows(2) {
                    amt = self.v2_pool(factory, leg[0], leg[1])?.sell(leg[0], amt).ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            PathPayload::V3Multi(bytes) => {
                let factory = self.factory_for(&self.v3_quoters, target)?;
                let seq = decode_v3(bytes).ok_or_else(|| Self::revert("bad path"))?;
                let mut amt = amount;
                for (i, leg) in seq.tokens.windows(2).enumerate() {
                    let pool = self.v3_pool(factory, leg[0], leg[1], seq.fees[i])?;
                    amt = pool.sell(leg[0], amt).ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            } => {
                let factory = self.factory_for(&self.v3_quoters, target)?;
                let pool = self.v3_pool(factory, *token_in, *token_out, *fee)?;
                let out = pool.sell(*token_in, amount).ok_or_else(none)?;
                Ok(SimulatedQuote {
                    amount: out,
                    fee: Some(*fee),
                })
            }
            PathPayload::AlgebraMulti(bytes) => {
                let seq = decode_algebra(bytes).ok_or_else(|| Self::revert("bad path"))?;
                let mut amt = amount;
                for leg in seq.tokens.windows(2) {
                    amt = self
                        .algebra_pool(target, leg[0], leg[1])?
                        .sell(leg[0], amt)
                        .ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            } => {
                let pool = self.algebra_pool(target, *token_in, *token_out)?;
                let out = pool.sell(*token_in, amount).ok_or_else(none)?;
                Ok(SimulatedQuote {
                    amount: out,
                    fee: Some(pool.fee_ppm),
                })
            }
            PathPayload::Solidly(hops) => {
                let mut amt = amount;
                for hop in hops {
                    let (t0, t1) = sorted(hop.from, hop.to);
                    let pool = self
                        .solidly_pools
                        .get(&(hop.factory, t0, t1, hop.stable))
                        .ok_or_else(|| Self::revert("pool does not exist"))?;
                    amt = pool.sell(hop.from, amt).ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
        }
    }

    fn buy(&self, target: Address, path: &PathPayload, amount: U256) -> Result<SimulatedQuote> {
        let none = || Self::revert("insufficient liquidity");
        match path {
            PathPayload::Wrap(_) => Ok(SimulatedQuote::amount(amount)),
            PathPayload::V2(tokens) => {
                let factory = self.factory_for(&self.v2_routers, target)?;
                let mut amt = amount;
                for leg in tokens.windows(2).rev() {
                    amt = self.v2_pool(factory, leg[0], leg[1])?.buy(leg[0], amt).ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            // Path arrives reversed: output token first
            PathPayload::V3Multi(bytes) => {
                let factory = self.factory_for(&self.v3_quoters, target)?;
                let seq = decode_v3(bytes).ok_or_else(|| Self::revert("bad path"))?;
                let mut amt = amount;
                for (i, leg) in seq.tokens.windows(2).enumerate() {
                    let pool = self.v3_pool(factory, leg[0], leg[1], seq.fees[i])?;
                    amt = pool.buy(leg[1], amt).ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            } => {
                let factory = self.factory_for(&self.v3_quoters, target)?;
                let pool = self.v3_pool(factory, *token_in, *token_out, *fee)?;
                let needed = pool.buy(*token_in, amount).ok_or_else(none)?;
                Ok(SimulatedQuote {
                    amount: needed,
                    fee: Some(*fee),
                })
            }
            PathPayload::AlgebraMulti(bytes) => {
                let seq = decode_algebra(bytes).ok_or_else(|| Self::revert("bad path"))?;
                let mut amt = amount;
                for leg in seq.tokens.windows(2) {
                    amt = self
                        .algebra_pool(target, leg[0], leg[1])?
                        .buy(leg[1], amt)
                        .ok_or_else(none)?;
                }
                Ok(SimulatedQuote::amount(amt))
            }
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            } => {
                let pool = self.algebra_pool(target, *token_in, *token_out)?;
                let needed = pool.buy(*token_in, amount).ok_or_else(none)?;
                Ok(SimulatedQuote {
                    amount: needed,
                    fee: Some(pool.fee_ppm),
                })
            }
            PathPayload::Solidly(_) => Err(RpcError::Unsupported {
                target: "solidly router",
                operation: "exact-output simulation",
            }),
        }
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn pool_address(&self, query: PoolQuery) -> Result<Option<Address>> {
        self.pool_calls.fetch_add(1, Ordering::SeqCst);
        let pool = match query {
            PoolQuery::V2 {
                factory,
                token_a,
                token_b,
            } => self.v2_pool(factory, token_a, token_b).ok(),
            PoolQuery::V3 {
                factory,
                token_a,
                token_b,
                fee,
            } => self.v3_pool(factory, token_a, token_b, fee).ok(),
            PoolQuery::Solidly {
                factory,
                token_a,
                token_b,
                stable,
            } => {
                let (t0, t1) = sorted(token_a, token_b);
                self.solidly_pools.get(&(factory, t0, t1, stable))
            }
        };
        Ok(pool.map(|p| p.address))
    }

    async fn simulate_exact_input(
        &self,
        target: Address,
        path: &PathPayload,
        amount_in: U256,
    ) -> Result<SimulatedQuote> {
        self.simulation_calls.fetch_add(1, Ordering::SeqCst);
        if self.reverting.contains(&target) {
            return Err(Self::revert("forced revert"));
        }
        self.sell(target, path, amount_in)
    }

    async fn simulate_exact_output(
        &self,
        target: Address,
        path: &PathPayload,
        amount_out: U256,
    ) -> Result<SimulatedQuote> {
        self.simulation_calls.fetch_add(1, Ordering::SeqCst);
        if self.reverting.contains(&target) {
            return Err(Self::revert("forced revert"));
        }
        self.buy(target, path, amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use dexroute_core::path::HopSequence;
    use dexroute_core::TradeDirection;

    const FACTORY: Address = address!("00000000000000000000000000000000000000f1");
    const ROUTER: Address = address!("00000000000000000000000000000000000000e1");
    const QUOTER: Address = address!("00000000000000000000000000000000000000d1");
    const A: Address = address!("000000000000000000000000000000000000000a");
    const B: Address = address!("000000000000000000000000000000000000000b");
    const C: Address = address!("000000000000000000000000000000000000000c");

    #[tokio::test]
    async fn test_v2_round_trip() {
        let chain = MockChain::new()
            .with_v2_router(ROUTER, FACTORY)
            .with_v2_pool(FACTORY, A, B, 1_000_000, 2_000_000);
        let path = PathPayload::V2(vec![A, B]);
        let out = chain
            .simulate_exact_input(ROUTER, &path, U256::from(1_000u64))
            .await
            .unwrap();
        assert_eq!(out.amount, U256::from(1_991u64));

        let needed = chain
            .simulate_exact_output(ROUTER, &path, out.amount)
            .await
            .unwrap();
        assert!(needed.amount <= U256::from(1_000u64));
        assert_eq!(chain.simulation_calls(), 2);
    }

    #[tokio::test]
    async fn test_pool_lookup_is_order_independent() {
        let chain = MockChain::new().with_v3_pool(FACTORY, A, B, 3000, 10, 10);
        let ab = PoolQuery::V3 { factory: FACTORY, token_a: A, token_b: B, fee: 3000 };
        let ba = PoolQuery::V3 { factory: FACTORY, token_a: B, token_b: A, fee: 3000 };
        let other_fee = PoolQuery::V3 { factory: FACTORY, token_a: A, token_b: B, fee: 500 };
        assert!(chain.pool_address(ab).await.unwrap().is_some());
        assert_eq!(
            chain.pool_address(ab).await.unwrap(),
            chain.pool_address(ba).await.unwrap()
        );
        assert!(chain.pool_address(other_fee).await.unwrap().is_none());
        assert_eq!(chain.pool_calls(), 4);
    }

    #[tokio::test]
    async fn test_v3_multi_exact_output_uses_reversed_path() {
        let chain = MockChain::new()
            .with_v3_quoter(QUOTER, FACTORY)
            .with_v3_pool(FACTORY, A, B, 500, 1_000_000_000, 1_000_000_000)
            .with_v3_pool(FACTORY, B, C, 3000, 1_000_000_000, 1_000_000_000);
        let seq = HopSequence::new(vec![A, B, C], vec![500, 3000]);
        let forward = PathPayload::V3Multi(seq.oriented(TradeDirection::ExactInput).encode_v3());
        let reversed = PathPayload::V3Multi(seq.oriented(TradeDirection::ExactOutput).encode_v3());

        let needed = chain
            .simulate_exact_output(QUOTER, &reversed, U256::from(10_000u64))
            .await
            .unwrap()
            .amount;
        let out = chain
            .simulate_exact_input(QUOTER, &forward, needed)
            .await
            .unwrap()
            .amount;
        assert!(out >= U256::from(10_000u64));
    }

    #[tokio::test]
    async fn test_reverting_target() {
        let chain = MockChain::new()
            .with_v2_router(ROUTER, FACTORY)
            .with_v2_pool(FACTORY, A, B, 1_000, 1_000)
            .reverting(ROUTER);
        let err = chain
            .simulate_exact_input(ROUTER, &PathPayload::V2(vec![A, B]), U256::from(1u8))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Reverted { .. }));
    }
}
