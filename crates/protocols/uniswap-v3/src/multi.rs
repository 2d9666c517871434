//! Multi-hop V3 paths through the chain's bridge tokens

use alloy_primitives::Address;
use dexroute_core::path::HopSequence;
use dexroute_core::{
    pick_best, ChainConfig, DexFamily, PairRequest, PathPayload, Quote, QuoterVersion, V3Dex,
};
use evm_client::ChainReader;
use futures::future::join_all;

use crate::fee_tiers::FeeTierCache;
use crate::{simulate, to_quote, token_shapes};

/// Every (path, fee assignment) on `dex` with a deployed pool on each leg.
///
/// Shapes are the direct pair, one bridge and two distinct bridges. The
/// sequences are returned in swap order; orient them before quoting.
pub async fn candidate_sequences(
    reader: &dyn ChainReader,
    cache: &FeeTierCache,
    dex: &V3Dex,
    token_in: Address,
    token_out: Address,
    bridges: &[Address],
) -> Vec<HopSequence> {
    let shapes = token_shapes(token_in, token_out, bridges, true);
    let legs = shapes
        .iter()
        .flat_map(|s| s.windows(2).map(|w| (w[0], w[1])))
        .collect::<Vec<_>>();
    let tiers = cache.discover(reader, dex.factory, legs, &dex.fee_tiers).await;

    shapes
        .into_iter()
        .flat_map(|tokens| {
            tiers
                .combinations(&tokens)
                .into_iter()
                .map(move |fees| HopSequence::new(tokens.clone(), fees))
        })
        .collect()
}

/// Best multi-hop quote across the chain's Uniswap-quoter V3 dexes
pub async fn best_multi_quote(
    reader: &dyn ChainReader,
    cache: &FeeTierCache,
    chain: &ChainConfig,
    request: &PairRequest,
) -> Option<Quote> {
    let bridges = request.usable_bridges(&chain.bridge_addresses());
    let per_dex = join_all(
        chain
            .v3_dexes(QuoterVersion::V2)
            .map(|dex| best_for_dex(reader, cache, dex, &bridges, request)),
    )
    .await;

    let best = pick_best(request.direction, per_dex);
    if best.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::UniswapV3Multi, "no route");
    }
    best
}

async fn best_for_dex(
    reader: &dyn ChainReader,
    cache: &FeeTierCache,
    dex: &V3Dex,
    bridges: &[Address],
    request: &PairRequest,
) -> Option<Quote> {
    let sequences = candidate_sequences(
        reader,
        cache,
        dex,
        request.token_in.address,
        request.token_out.address,
        bridges,
    )
    .await;
    tracing::debug!(dex = %dex.name, candidates = sequences.len(), "V3 multi-hop candidates");

    let quotes = join_all(sequences.iter().map(|seq| async move {
        let path = PathPayload::V3Multi(seq.oriented(request.direction).encode_v3());
        let sim = simulate(reader, dex, &path, request).await?;
        let fee_tier = match seq.fees.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        Some(to_quote(DexFamily::UniswapV3Multi, dex, path, sim.amount, fee_tier))
    }))
    .await;

    pick_best(request.direction, quotes)
}
