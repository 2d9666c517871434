use alloy_primitives::Address;
use dexroute_core::{BridgeToken, SolidlyDex, SolidlyHop};
use evm_client::{ChainReader, PoolQuery};
use futures::future::join_all;

async fn pool_exists(reader: &dyn ChainReader, factory: Address, a: Address, b: Address, stable: bool) -> bool {
    let query = PoolQuery::Solidly {
        factory,
        token_a: a,
        token_b: b,
        stable,
    };
    match reader.pool_address(query).await {
        Ok(pool) => pool.is_some(),
        Err(e) => {
            tracing::debug!(%factory, stable, error = %e, "getPool failed");
            false
        }
    }
}

/// Routes for `token_in -> token_out` on `dex`.
///
/// Every bridge paired with both tokens (at the bridge's stable flag) yields
/// the two-hop route through it and the direct hop at that flag. Bridges
/// equal to either token are skipped. No common bridge means no routes.
pub async fn candidate_routes(
    reader: &dyn ChainReader,
    dex: &SolidlyDex,
    token_in: Address,
    token_out: Address,
    bridges: &[BridgeToken],
) -> Vec<Vec<SolidlyHop>> {
    let usable: Vec<&BridgeToken> = bridges
        .iter()
        .filter(|b| b.address != token_in && b.address != token_out)
        .collect();

    let probes = usable.iter().map(|bridge| async move {
        let (with_in, with_out) = futures::join!(
            pool_exists(reader, dex.factory, token_in, bridge.address, bridge.stable),
            pool_exists(reader, dex.factory, bridge.address, token_out, bridge.stable),
        );
        with_in && with_out
    });
    let paired = join_all(probes).await;

    let hop = |from: Address, to: Address, stable: bool| SolidlyHop {
        from,
        to,
        stable,
        factory: dex.factory,
    };

    let mut routes: Vec<Vec<SolidlyHop>> = Vec::new();
    for (bridge, _) in usable.iter().zip(paired).filter(|(_, ok)| *ok) {
        let candidates = [
            vec![
                hop(token_in, bridge.address, bridge.stable),
                hop(bridge.address, token_out, bridge.stable),
            ],
            vec![hop(token_in, token_out, bridge.stable)],
        ];
        for route in candidates {
            if !routes.contains(&route) {
                routes.push(route);
            }
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::fixtures::*;
    use evm_client::mock::MockChain;

    #[tokio::test]
    async fn test_bridge_paired_with_both_tokens() {
        let mock = MockChain::new()
            .with_solidly_pool(FACTORY, TOKEN, WETH, false, 1_000, 1_000)
            .with_solidly_pool(FACTORY, WETH, USDC, false, 1_000, 1_000)
            .with_solidly_pool(FACTORY, TOKEN, DAI, true, 1_000, 1_000);

        let routes = candidate_routes(&mock, &dex(), TOKEN, USDC, &bridges()).await;
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].len(), 2);
        assert_eq!(routes[0][0].to, WETH);
        assert!(!routes[0][0].stable);
        assert_eq!(routes[1], vec![SolidlyHop { from: TOKEN, to: USDC, stable: false, factory: FACTORY }]);
        // two legs per usable bridge
        assert_eq!(mock.pool_calls(), 4);
    }

    #[tokio::test]
    async fn test_direct_hop_deduplicated() {
        let bridges = vec![
            BridgeToken { name: "WETH".into(), address: WETH, stable: false },
            BridgeToken { name: "OP".into(), address: OP, stable: false },
        ];
        let mock = MockChain::new()
            .with_solidly_pool(FACTORY, TOKEN, WETH, false, 1_000, 1_000)
            .with_solidly_pool(FACTORY, WETH, USDC, false, 1_000, 1_000)
            .with_solidly_pool(FACTORY, TOKEN, OP, false, 1_000, 1_000)
            .with_solidly_pool(FACTORY, OP, USDC, false, 1_000, 1_000);

        let routes = candidate_routes(&mock, &dex(), TOKEN, USDC, &bridges).await;
        assert_eq!(routes.len(), 3);
        assert_eq!(routes.iter().filter(|r| r.len() == 1).count(), 1);
    }

    #[tokio::test]
    async fn test_pair_token_is_not_a_bridge() {
        let mock = MockChain::new().with_solidly_pool(FACTORY, WETH, USDC, false, 1_000, 1_000);
        let routes = candidate_routes(&mock, &dex(), WETH, USDC, &bridges()).await;
        assert!(routes.is_empty());
        // Only DAI is probed
        assert_eq!(mock.pool_calls(), 2);
    }
}
