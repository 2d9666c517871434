//! Single-pool V3 quotes

use dexroute_core::{
    pick_best, ChainConfig, DexFamily, PairRequest, PathPayload, Quote, QuoterVersion,
    SingleHopFeeSelection, V3Dex,
};
use evm_client::ChainReader;
use futures::future::join_all;

use crate::fee_tiers::FeeTierCache;
use crate::{simulate, to_quote};

/// Best single-hop quote across the chain's Uniswap-quoter V3 dexes
pub async fn best_single_quote(
    reader: &dyn ChainReader,
    cache: &FeeTierCache,
    chain: &ChainConfig,
    request: &PairRequest,
    selection: SingleHopFeeSelection,
) -> Option<Quote> {
    let per_dex = join_all(
        chain
            .v3_dexes(QuoterVersion::V2)
            .map(|dex| best_for_dex(reader, cache, dex, request, selection)),
    )
    .await;

    let best = pick_best(request.direction, per_dex);
    if best.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::UniswapV3Single, "no route");
    }
    best
}

async fn best_for_dex(
    reader: &dyn ChainReader,
    cache: &FeeTierCache,
    dex: &V3Dex,
    request: &PairRequest,
    selection: SingleHopFeeSelection,
) -> Option<Quote> {
    let (token_in, token_out) = (request.token_in.address, request.token_out.address);
    let mut tiers = cache
        .tiers(reader, dex.factory, token_in, token_out, &dex.fee_tiers)
        .await;
    if selection == SingleHopFeeSelection::FirstAvailable {
        tiers.truncate(1);
    }

    let quotes = join_all(tiers.into_iter().map(|fee| async move {
        let path = PathPayload::V3Single {
            token_in,
            token_out,
            fee,
        };
        let sim = simulate(reader, dex, &path, request).await?;
        Some(to_quote(DexFamily::UniswapV3Single, dex, path, sim.amount, Some(fee)))
    }))
    .await;

    pick_best(request.direction, quotes)
}
