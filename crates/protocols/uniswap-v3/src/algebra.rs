//! Legacy Algebra quoter (Quickswap V3)
//!
//! Algebra deploys one pool per pair with a fee that moves with volatility,
//! so there is nothing to probe: candidates go straight to the quoter and a
//! missing pool shows up as a revert. The quoter reports the fee it used.

use alloy_primitives::Address;
use dexroute_core::path::HopSequence;
use dexroute_core::{
    pick_best, ChainConfig, DexFamily, PairRequest, PathPayload, Quote, QuoterVersion, V3Dex,
};
use evm_client::ChainReader;
use futures::future::join_all;

use crate::{simulate, to_quote, token_shapes};

/// Paths through one bridge or two distinct bridges, in swap order.
/// The direct pair is quoted by the single-hop family instead.
pub fn candidate_sequences(token_in: Address, token_out: Address, bridges: &[Address]) -> Vec<HopSequence> {
    token_shapes(token_in, token_out, bridges, false)
        .into_iter()
        .map(HopSequence::without_fees)
        .collect()
}

/// Best direct-pool quote across the chain's Algebra dexes
pub async fn best_algebra_single_quote(
    reader: &dyn ChainReader,
    chain: &ChainConfig,
    request: &PairRequest,
) -> Option<Quote> {
    let per_dex = join_all(chain.v3_dexes(QuoterVersion::Algebra).map(|dex| async move {
        let path = PathPayload::AlgebraSingle {
            token_in: request.token_in.address,
            token_out: request.token_out.address,
        };
        let sim = simulate(reader, dex, &path, request).await?;
        Some(to_quote(DexFamily::AlgebraSingle, dex, path, sim.amount, sim.fee))
    }))
    .await;

    let best = pick_best(request.direction, per_dex);
    if best.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::AlgebraSingle, "no route");
    }
    best
}

/// Best bridged quote across the chain's Algebra dexes
pub async fn best_algebra_multi_quote(
    reader: &dyn ChainReader,
    chain: &ChainConfig,
    request: &PairRequest,
) -> Option<Quote> {
    let bridges = request.usable_bridges(&chain.bridge_addresses());
    let sequences = candidate_sequences(request.token_in.address, request.token_out.address, &bridges);

    let per_dex = join_all(
        chain
            .v3_dexes(QuoterVersion::Algebra)
            .map(|dex| best_multi_for_dex(reader, dex, &sequences, request)),
    )
    .await;

    let best = pick_best(request.direction, per_dex);
    if best.is_none() {
        tracing::debug!(chain_id = chain.chain_id, family = %DexFamily::AlgebraMulti, "no route");
    }
    best
}

async fn best_multi_for_dex(
    reader: &dyn ChainReader,
    dex: &V3Dex,
    sequences: &[HopSequence],
    request: &PairRequest,
) -> Option<Quote> {
    let quotes = join_all(sequences.iter().map(|seq| async move {
        let path = PathPayload::AlgebraMulti(seq.oriented(request.direction).encode_algebra());
        let sim = simulate(reader, dex, &path, request).await?;
        Some(to_quote(DexFamily::AlgebraMulti, dex, path, sim.amount, None))
    }))
    .await;

    pick_best(request.direction, quotes)
}
