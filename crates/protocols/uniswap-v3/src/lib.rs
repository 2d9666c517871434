//! Concentrated-liquidity routing
//!
//! Uniswap V3 (fee-tiered pools, QuoterV2) and the legacy Algebra variant
//! (one pool per pair with a dynamic fee, as deployed by Quickswap).
//!
//! # Families
//! - single-hop V3: one quote per dex at the first tier with a pool, or the
//!   best tier when configured
//! - multi-hop V3: direct, one-bridge and two-bridge paths over every
//!   combination of deployed fee tiers
//! - Algebra single and multi-hop: not pool-probed, a missing pool makes the
//!   quoter revert

pub mod algebra;
pub mod fee_tiers;
pub mod multi;
pub mod single;

pub use algebra::{best_algebra_multi_quote, best_algebra_single_quote};
pub use fee_tiers::{available_fee_tiers, FeeTierCache};
pub use multi::best_multi_quote;
pub use single::best_single_quote;

use alloy_primitives::Address;
use dexroute_core::{DexFamily, PairRequest, PathPayload, Quote, V3Dex};
use evm_client::{ChainReader, SimulatedQuote};

/// Run one candidate through the dex quoter. Failures are logged and dropped.
pub(crate) async fn simulate(
    reader: &dyn ChainReader,
    dex: &V3Dex,
    path: &PathPayload,
    request: &PairRequest,
) -> Option<SimulatedQuote> {
    match reader
        .simulate(dex.quoter, path, request.direction, request.amount)
        .await
    {
        Ok(sim) => Some(sim),
        Err(e) => {
            tracing::debug!(dex = %dex.name, hops = path.hop_count(), error = %e, "quoter call failed");
            None
        }
    }
}

pub(crate) fn to_quote(
    family: DexFamily,
    dex: &V3Dex,
    path: PathPayload,
    amount: alloy_primitives::U256,
    fee_tier: Option<u32>,
) -> Quote {
    Quote {
        family,
        dex_name: dex.name.clone(),
        router: dex.router,
        path,
        amount,
        fee_tier,
        pool_factory: Some(dex.factory),
        simulated_out: None,
    }
}

/// Direct path, then `[in, b, out]`, then `[in, a, b, out]` for distinct bridges
pub(crate) fn token_shapes(
    token_in: Address,
    token_out: Address,
    bridges: &[Address],
    include_direct: bool,
) -> Vec<Vec<Address>> {
    let mut shapes = Vec::new();
    if include_direct {
        shapes.push(vec![token_in, token_out]);
    }
    for &b in bridges {
        shapes.push(vec![token_in, b, token_out]);
    }
    for &first in bridges {
        for &second in bridges {
            if first != second {
                shapes.push(vec![token_in, first, second, token_out]);
            }
        }
    }
    shapes
}


#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_token_shapes() {
        let a = address!("000000000000000000000000000000000000000a");
        let b = address!("000000000000000000000000000000000000000b");
        let x = address!("0000000000000000000000000000000000000001");
        let y = address!("0000000000000000000000000000000000000002");
        assert_eq!(token_shapes(a, b, &[x, y], true).len(), 5);
        let bridged = token_shapes(a, b, &[x, y], false);
        assert_eq!(bridged.len(), 4);
        assert!(bridged.iter().all(|s| s.len() > 2));
        assert_eq!(token_shapes(a, b, &[], false), Vec::<Vec<Address>>::new());
    }
}
