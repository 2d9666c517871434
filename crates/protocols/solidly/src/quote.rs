use alloy_primitives::U256;
use dexroute_core::refine::{refine_exact_output, RefineParams};
use dexroute_core::{
    pick_best, ChainConfig, DexFamily, PairRequest, PathPayload, Quote, SolidlyDex, SolidlyHop,
    TradeDirection,
};
use evm_client::ChainReader;
use futures::future::join_all;

use crate::routes::candidate_routes;

/// Best Solidly quote on `chain`, or `None` when the chain has no Solidly
/// dex, no route was found, or refinement did not converge
pub async fn best_quote(
    reader: &dyn ChainReader,
    chain: &ChainConfig,
    request: &PairRequest,
    params: RefineParams,
) -> Option<Quote> {
    let dex = chain.solidly_dex()?;
    let routes = candidate_routes(
        reader,
        dex,
        request.token_in.address,
        request.token_out.address,
        &chain.bridge_tokens,
    )
    .await;
    if routes.is_empty() {
        tracing::debug!(chain_id = chain.chain_id, dex = %dex.name, "no common bridge");
        return None;
    }

    let quote = match request.direction {
        TradeDirection::ExactInput => best_exact_input(reader, dex, routes, request.amount).await,
        TradeDirection::ExactOutput => best_exact_output(reader, dex, routes, request, params).await,
    };
    if quote.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::Solidly, "no route");
    }
    quote
}

async fn simulate_out(reader: &dyn ChainReader, dex: &SolidlyDex, path: &PathPayload, amount_in: U256) -> Option<U256> {
    match reader.simulate_exact_input(dex.router, path, amount_in).await {
        Ok(sim) => Some(sim.amount),
        Err(e) => {
            tracing::debug!(dex = %dex.name, hops = path.hop_count(), error = %e, "getAmountsOut failed");
            None
        }
    }
}

async fn best_exact_input(
    reader: &dyn ChainReader,
    dex: &SolidlyDex,
    routes: Vec<Vec<SolidlyHop>>,
    amount_in: U256,
) -> Option<Quote> {
    let quotes = join_all(routes.into_iter().map(|hops| async move {
        let path = PathPayload::Solidly(hops);
        let amount = simulate_out(reader, dex, &path, amount_in).await?;
        Some(Quote {
            family: DexFamily::Solidly,
            dex_name: dex.name.clone(),
            router: dex.router,
            path,
            amount,
            fee_tier: None,
            pool_factory: Some(dex.factory),
            simulated_out: None,
        })
    }))
    .await;
    pick_best(TradeDirection::ExactInput, quotes)
}

/// Price every route at one whole `token_in`, keep the best, then refine
/// the input on that route until it yields the requested output
async fn best_exact_output(
    reader: &dyn ChainReader,
    dex: &SolidlyDex,
    routes: Vec<Vec<SolidlyHop>>,
    request: &PairRequest,
    params: RefineParams,
) -> Option<Quote> {
    let Some(reference_in) = U256::from(10u8).checked_pow(U256::from(request.token_in.decimals)) else {
        tracing::debug!(
            dex = %dex.name,
            decimals = request.token_in.decimals,
            "token decimals out of range for a reference quote"
        );
        return None;
    };
    let reference = best_exact_input(reader, dex, routes, reference_in).await?;

    let refined = refine_exact_output(request.amount, reference_in, reference.amount, params, |amount_in| {
        simulate_out(reader, dex, &reference.path, amount_in)
    })
    .await;

    match refined {
        Ok(refined) => {
            tracing::debug!(
                dex = %dex.name,
                iterations = refined.iterations,
                amount_in = %refined.amount_in,
                amount_out = %refined.amount_out,
                "exact-output refinement converged"
            );
            Some(Quote {
                amount: refined.amount_in,
                simulated_out: Some(refined.amount_out),
                ..reference
            })
        }
        Err(e) => {
            tracing::debug!(dex = %dex.name, error = %e, "exact-output refinement failed");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use alloy_primitives::{address, Address, U256};
    use dexroute_core::{
        BridgeToken, ChainConfig, DexConfig, PairRequest, SolidlyDex, Token, TradeDirection,
    };

    pub const WETH: Address = address!("4200000000000000000000000000000000000006");
    pub const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    pub const DAI: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");
    pub const OP: Address = address!("4200000000000000000000000000000000000042");
    pub const TOKEN: Address = address!("00000000000000000000000000000000000000cc");

    pub const FACTORY: Address = address!("420DD381b31aEf6683db6B902084cB0FFECe40Da");
    pub const ROUTER: Address = address!("cF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43");

    pub fn dex() -> SolidlyDex {
        SolidlyDex {
            name: "Velodrome".into(),
            factory: FACTORY,
            router: ROUTER,
        }
    }

    pub fn bridges() -> Vec<BridgeToken> {
        vec![
            BridgeToken { name: "WETH".into(), address: WETH, stable: false },
            BridgeToken { name: "DAI".into(), address: DAI, stable: true },
        ]
    }

    pub fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: 8453,
            name: "Base".into(),
            native_symbol: "ETH".into(),
            native_decimals: 18,
            wrapped_native: WETH,
            wrapped_native_router: WETH,
            bridge_tokens: bridges(),
            dexes: vec![DexConfig::Solidly(dex())],
        }
    }

    pub fn request(direction: TradeDirection, amount: U256) -> PairRequest {
        PairRequest {
            token_in: Token::new(TOKEN, 18),
            token_out: Token::new(USDC, 6),
            direction,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use dexroute_core::math::within_tolerance;
    use dexroute_core::{Route, RouteRequest, Token};
    use evm_client::mock::MockChain;

    fn e18(v: u64) -> u128 {
        v as u128 * 1_000_000_000_000_000_000
    }

    /// TOKEN and USDC both paired with WETH, plus a thin direct volatile pool
    fn mock() -> MockChain {
        MockChain::new()
            .with_solidly_pool(FACTORY, TOKEN, WETH, false, e18(1_000_000), e18(500))
            .with_solidly_pool(FACTORY, WETH, USDC, false, e18(500), 1_000_000_000_000)
            .with_solidly_pool(FACTORY, TOKEN, USDC, false, e18(1_000), 1_000_000_000)
    }

    #[tokio::test]
    async fn test_exact_input_takes_best_route() {
        let mock = mock();
        let quote = best_quote(
            &mock,
            &chain(),
            &request(TradeDirection::ExactInput, U256::from(e18(100))),
            RefineParams::default(),
        )
        .await
        .unwrap();
        assert_eq!(quote.family, DexFamily::Solidly);
        assert_eq!(quote.router, ROUTER);
        assert_eq!(quote.path.hop_count(), 2);
    }

    #[tokio::test]
    async fn test_exact_output_refines_within_tolerance() {
        let mock = mock();
        let desired = U256::from(50_000_000u64);
        let quote = best_quote(
            &mock,
            &chain(),
            &request(TradeDirection::ExactOutput, desired),
            RefineParams::default(),
        )
        .await
        .unwrap();

        let out = mock
            .simulate_exact_input(ROUTER, &quote.path, quote.amount)
            .await
            .unwrap()
            .amount;
        assert!(within_tolerance(out, desired, 150));
    }

    #[tokio::test]
    async fn test_refinement_budget_exhausted() {
        let mock = mock();
        let params = RefineParams {
            tolerance_bps: 150,
            max_iterations: 0,
        };
        let quote = best_quote(
            &mock,
            &chain(),
            &request(TradeDirection::ExactOutput, U256::from(50_000_000u64)),
            params,
        )
        .await;
        assert!(quote.is_none());
        // Only the two reference quotes ran
        assert_eq!(mock.simulation_calls(), 2);
    }

    #[tokio::test]
    async fn test_refinement_stops_at_iteration_cap() {
        let mock = mock();
        let params = RefineParams {
            tolerance_bps: 0,
            max_iterations: 3,
        };
        // More USDC than either route holds, so no step can converge
        let quote = best_quote(
            &mock,
            &chain(),
            &request(TradeDirection::ExactOutput, U256::from(2_000_000_000_000u64)),
            params,
        )
        .await;
        assert!(quote.is_none());
        // Two reference quotes, then one simulation per refinement step
        assert_eq!(mock.simulation_calls(), 2 + 3);
    }

    #[tokio::test]
    async fn test_exact_output_route_bounds_hold_on_simulation() {
        let mock = MockChain::new()
            .with_solidly_pool(FACTORY, TOKEN, WETH, false, e18(1_000), e18(1_000))
            .with_solidly_pool(FACTORY, WETH, USDC, false, e18(1_000), e18(1_000));
        let desired = U256::from(e18(100));
        let pair = PairRequest {
            token_in: Token::new(TOKEN, 18),
            token_out: Token::new(USDC, 18),
            direction: TradeDirection::ExactOutput,
            amount: desired,
        };
        let quote = best_quote(&mock, &chain(), &pair, RefineParams::default())
            .await
            .unwrap();
        assert_eq!(quote.path.hop_count(), 2);

        let route = Route::from_quote(
            &RouteRequest {
                chain_id: 8453,
                direction: TradeDirection::ExactOutput,
                token_in: TOKEN,
                token_out: USDC,
                amount: desired,
                slippage_bps: 50,
            },
            quote,
        );
        let out = mock
            .simulate_exact_input(ROUTER, &route.path, route.amount_in)
            .await
            .unwrap()
            .amount;
        assert_eq!(route.amount_out, out);
        assert!(out >= route.amount_out_min);
        assert!(within_tolerance(out, desired, 150));
    }

    #[tokio::test]
    async fn test_out_of_range_decimals_no_quote() {
        let mock = mock();
        let mut pair = request(TradeDirection::ExactOutput, U256::from(50_000_000u64));
        pair.token_in = Token::new(TOKEN, 78);
        let quote = best_quote(&mock, &chain(), &pair, RefineParams::default()).await;
        assert!(quote.is_none());
        assert_eq!(mock.simulation_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_common_bridge_no_quote() {
        let mock = MockChain::new().with_solidly_pool(FACTORY, TOKEN, USDC, false, 1_000, 1_000);
        let quote = best_quote(
            &mock,
            &chain(),
            &request(TradeDirection::ExactInput, U256::from(10u64)),
            RefineParams::default(),
        )
        .await;
        assert!(quote.is_none());
        assert_eq!(mock.simulation_calls(), 0);
    }

    #[tokio::test]
    async fn test_chain_without_solidly_dex() {
        let mut chain = chain();
        chain.dexes.clear();
        let mock = mock();
        assert!(best_quote(
            &mock,
            &chain,
            &request(TradeDirection::ExactInput, U256::from(10u64)),
            RefineParams::default()
        )
        .await
        .is_none());
        assert_eq!(mock.total_calls(), 0);
    }
}
