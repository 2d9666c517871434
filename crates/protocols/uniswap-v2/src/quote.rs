use alloy_primitives::Address;
use dexroute_core::{pick_best, ChainConfig, DexFamily, PairRequest, PathPayload, Quote, V2Dex};
use evm_client::ChainReader;
use futures::future::join_all;

use crate::paths::candidate_paths;

/// Best V2 quote across every V2 dex configured on `chain`
pub async fn best_quote(
    reader: &dyn ChainReader,
    chain: &ChainConfig,
    request: &PairRequest,
) -> Option<Quote> {
    let bridges = request.usable_bridges(&chain.bridge_addresses());
    let paths = candidate_paths(request.token_in.address, request.token_out.address, &bridges);

    let per_dex = join_all(
        chain
            .v2_dexes()
            .map(|dex| best_for_dex(reader, dex, &paths, request)),
    )
    .await;

    let best = pick_best(request.direction, per_dex);
    if best.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::UniswapV2, "no route");
    }
    best
}

async fn best_for_dex(
    reader: &dyn ChainReader,
    dex: &V2Dex,
    paths: &[Vec<Address>],
    request: &PairRequest,
) -> Option<Quote> {
    let quotes = join_all(paths.iter().map(|tokens| async move {
        let path = PathPayload::V2(tokens.clone());
        match reader
            .simulate(dex.router, &path, request.direction, request.amount)
            .await
        {
            Ok(sim) => Some(Quote {
                family: DexFamily::UniswapV2,
                dex_name: dex.name.clone(),
                router: dex.router,
                path,
                amount: sim.amount,
                fee_tier: None,
                pool_factory: Some(dex.factory),
                simulated_out: None,
            }),
            Err(e) => {
                tracing::debug!(dex = %dex.name, hops = tokens.len() - 1, error = %e, "V2 path failed");
                None
            }
        }
    }))
    .await;

    pick_best(request.direction, quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use dexroute_core::{BridgeToken, DexConfig, Token, TradeDirection};
    use evm_client::mock::MockChain;

    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const DAI: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");
    const TOKEN: Address = address!("00000000000000000000000000000000000000cc");

    const UNI_FACTORY: Address = address!("8909Dc15e40173Ff4699343b6eB8132c65e18eC6");
    const UNI_ROUTER: Address = address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24");
    const CAKE_FACTORY: Address = address!("02a84c1b3BBD7401a5f7fa98a384EBC70bB5749E");
    const CAKE_ROUTER: Address = address!("8cFe327CEc66d1C090Dd72bd0FF11d690C33a2Eb");

    fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: 8453,
            name: "Base".to_string(),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
            wrapped_native: WETH,
            wrapped_native_router: WETH,
            bridge_tokens: vec![
                BridgeToken { name: "WETH".into(), address: WETH, stable: false },
                BridgeToken { name: "DAI".into(), address: DAI, stable: true },
            ],
            dexes: vec![
                DexConfig::V2(V2Dex {
                    name: "UniswapV2".into(),
                    factory: UNI_FACTORY,
                    router: UNI_ROUTER,
                }),
                DexConfig::V2(V2Dex {
                    name: "PancakeswapV2".into(),
                    factory: CAKE_FACTORY,
                    router: CAKE_ROUTER,
                }),
            ],
        }
    }

    fn request(direction: TradeDirection, amount: u64) -> PairRequest {
        PairRequest {
            token_in: Token::new(TOKEN, 18),
            token_out: Token::new(USDC, 6),
            direction,
            amount: U256::from(amount),
        }
    }

    #[tokio::test]
    async fn test_bridged_path_beats_thin_direct_pool() {
        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_pool(UNI_FACTORY, TOKEN, USDC, 10_000, 10_000)
            .with_v2_pool(UNI_FACTORY, TOKEN, WETH, 10_000_000, 10_000_000)
            .with_v2_pool(UNI_FACTORY, WETH, USDC, 10_000_000, 10_000_000);

        let quote = best_quote(&mock, &chain(), &request(TradeDirection::ExactInput, 5_000))
            .await
            .unwrap();
        assert_eq!(quote.path, PathPayload::V2(vec![TOKEN, WETH, USDC]));
        assert_eq!(quote.dex_name, "UniswapV2");
        assert_eq!(quote.pool_factory, Some(UNI_FACTORY));
    }

    #[tokio::test]
    async fn test_best_dex_wins_and_ties_keep_first() {
        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_router(CAKE_ROUTER, CAKE_FACTORY)
            .with_v2_pool(UNI_FACTORY, TOKEN, USDC, 1_000_000, 1_000_000)
            .with_v2_pool(CAKE_FACTORY, TOKEN, USDC, 2_000_000, 2_000_000);
        let quote = best_quote(&mock, &chain(), &request(TradeDirection::ExactInput, 10_000))
            .await
            .unwrap();
        assert_eq!(quote.dex_name, "PancakeswapV2");
        assert_eq!(quote.router, CAKE_ROUTER);

        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_router(CAKE_ROUTER, CAKE_FACTORY)
            .with_v2_pool(UNI_FACTORY, TOKEN, USDC, 1_000_000, 1_000_000)
            .with_v2_pool(CAKE_FACTORY, TOKEN, USDC, 1_000_000, 1_000_000);
        let quote = best_quote(&mock, &chain(), &request(TradeDirection::ExactInput, 10_000))
            .await
            .unwrap();
        assert_eq!(quote.dex_name, "UniswapV2");
    }

    #[tokio::test]
    async fn test_exact_output_takes_smallest_input() {
        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_router(CAKE_ROUTER, CAKE_FACTORY)
            .with_v2_pool(UNI_FACTORY, TOKEN, USDC, 1_000_000, 1_000_000)
            .with_v2_pool(CAKE_FACTORY, TOKEN, USDC, 5_000_000, 5_000_000);
        let quote = best_quote(&mock, &chain(), &request(TradeDirection::ExactOutput, 10_000))
            .await
            .unwrap();
        assert_eq!(quote.dex_name, "PancakeswapV2");
        assert!(quote.amount > U256::from(10_000u64));
        assert!(quote.amount < U256::from(10_200u64));
    }

    #[tokio::test]
    async fn test_failed_router_is_skipped() {
        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_router(CAKE_ROUTER, CAKE_FACTORY)
            .with_v2_pool(UNI_FACTORY, TOKEN, USDC, 1_000_000, 1_000_000)
            .with_v2_pool(CAKE_FACTORY, TOKEN, USDC, 5_000_000, 5_000_000)
            .reverting(CAKE_ROUTER);
        let quote = best_quote(&mock, &chain(), &request(TradeDirection::ExactInput, 1_000))
            .await
            .unwrap();
        assert_eq!(quote.dex_name, "UniswapV2");
    }

    #[tokio::test]
    async fn test_no_pools_is_none() {
        let mock = MockChain::new()
            .with_v2_router(UNI_ROUTER, UNI_FACTORY)
            .with_v2_router(CAKE_ROUTER, CAKE_FACTORY);
        assert!(
            best_quote(&mock, &chain(), &request(TradeDirection::ExactInput, 1_000))
                .await
                .is_none()
        );
        // direct + 2 single-bridge + 2 double-bridge paths, per dex
        assert_eq!(mock.simulation_calls(), 10);
        assert_eq!(mock.pool_calls(), 0);
    }
}
