//! Cross-family route selection
//!
//! One request runs as: parse the amount, resolve the chain, short-circuit
//! native/wrapped pairs, substitute native with wrapped, then evaluate every
//! configured family concurrently and keep the best quote.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dexroute_core::math::parse_units;
use dexroute_core::{
    pick_best, ChainConfig, ChainRegistry, DexFamily, PairRequest, Quote, QuoteConfig,
    QuoterVersion, Route, RouteError, RouteRequest, Token, TradeDirection,
};
use evm_client::ChainReader;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uniswap_v3::FeeTierCache;

use crate::wrap::wrap_quote;

/// Evaluation order. Ties between families keep the earlier one.
pub const FAMILY_ORDER: [DexFamily; 6] = [
    DexFamily::UniswapV2,
    DexFamily::Solidly,
    DexFamily::UniswapV3Single,
    DexFamily::UniswapV3Multi,
    DexFamily::AlgebraSingle,
    DexFamily::AlgebraMulti,
];

/// Families with at least one dex configured on `chain`, in evaluation order
pub fn configured_families(chain: &ChainConfig) -> Vec<DexFamily> {
    let has_v2 = chain.v2_dexes().next().is_some();
    let has_solidly = chain.solidly_dex().is_some();
    let has_v3 = chain.v3_dexes(QuoterVersion::V2).next().is_some();
    let has_algebra = chain.v3_dexes(QuoterVersion::Algebra).next().is_some();

    FAMILY_ORDER
        .into_iter()
        .filter(|family| match family {
            DexFamily::UniswapV2 => has_v2,
            DexFamily::Solidly => has_solidly,
            DexFamily::UniswapV3Single | DexFamily::UniswapV3Multi => has_v3,
            DexFamily::AlgebraSingle | DexFamily::AlgebraMulti => has_algebra,
            DexFamily::WrappedContract => false,
        })
        .collect()
}

/// Best-route search across every DEX family of a chain
pub struct Aggregator {
    registry: Arc<ChainRegistry>,
    readers: HashMap<u64, Arc<dyn ChainReader>>,
    config: QuoteConfig,
}

impl Aggregator {
    pub fn new(registry: Arc<ChainRegistry>, config: QuoteConfig) -> Self {
        Self {
            registry,
            readers: HashMap::new(),
            config,
        }
    }

    /// Attach the chain reader used for `chain_id`
    pub fn with_reader(mut self, chain_id: u64, reader: Arc<dyn ChainReader>) -> Self {
        self.readers.insert(chain_id, reader);
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    pub fn has_reader(&self, chain_id: u64) -> bool {
        self.readers.contains_key(&chain_id)
    }

    /// Best route selling exactly `amount_in` (decimal, in `token_in` units)
    pub async fn quote_exact_input(
        &self,
        token_in: &Token,
        token_out: &Token,
        chain_id: u64,
        amount_in: &str,
    ) -> Result<Option<Route>, RouteError> {
        self.quote(TradeDirection::ExactInput, token_in, token_out, chain_id, amount_in)
            .await
    }

    /// Best route buying exactly `amount_out` (decimal, in `token_out` units)
    pub async fn quote_exact_output(
        &self,
        token_in: &Token,
        token_out: &Token,
        chain_id: u64,
        amount_out: &str,
    ) -> Result<Option<Route>, RouteError> {
        self.quote(TradeDirection::ExactOutput, token_in, token_out, chain_id, amount_out)
            .await
    }

    pub async fn quote(
        &self,
        direction: TradeDirection,
        token_in: &Token,
        token_out: &Token,
        chain_id: u64,
        amount: &str,
    ) -> Result<Option<Route>, RouteError> {
        let decimals = match direction {
            TradeDirection::ExactInput => token_in.decimals,
            TradeDirection::ExactOutput => token_out.decimals,
        };
        let amount = parse_units(amount, decimals)?;
        if amount.is_zero() {
            return Ok(None);
        }

        let chain = self.registry.get(chain_id)?;
        let route_request = RouteRequest {
            chain_id,
            direction,
            token_in: token_in.address,
            token_out: token_out.address,
            amount,
            slippage_bps: self.config.slippage_bps,
        };

        if let Some(action) = chain.wrap_action(token_in, token_out) {
            debug!(chain_id, ?action, "native/wrapped pair, skipping dex search");
            let quote = wrap_quote(chain, action, amount);
            return Ok(Some(Route::from_quote(&route_request, quote)));
        }

        let request = PairRequest {
            token_in: chain.substitute_native(token_in),
            token_out: chain.substitute_native(token_out),
            direction,
            amount,
        };
        if request.token_in.address == request.token_out.address {
            return Err(RouteError::IdenticalTokens {
                token: request.token_in.address.to_string(),
            });
        }

        let Some(reader) = self.readers.get(&chain_id) else {
            warn!(chain_id, "no RPC endpoint configured");
            return Err(RouteError::ChainNotFound { chain_id });
        };

        let best = self.best_across_families(reader.as_ref(), chain, &request).await;
        match &best {
            Some(q) => info!(
                chain_id,
                %direction,
                family = %q.family,
                dex = %q.dex_name,
                amount = %q.amount,
                "route selected"
            ),
            None => info!(chain_id, %direction, "no route found"),
        }
        Ok(best.map(|q| Route::from_quote(&route_request, q)))
    }

    async fn best_across_families(
        &self,
        reader: &dyn ChainReader,
        chain: &ChainConfig,
        request: &PairRequest,
    ) -> Option<Quote> {
        let families = configured_families(chain);
        let cache = FeeTierCache::new();

        let deferred = self.config.v3_multi_fallback_only
            && families.contains(&DexFamily::UniswapV3Multi);
        let eager: Vec<DexFamily> = families
            .iter()
            .copied()
            .filter(|f| !(deferred && *f == DexFamily::UniswapV3Multi))
            .collect();

        let mut results: Vec<(DexFamily, Option<Quote>)> = join_all(eager.iter().map(|&family| {
            self.run_family(family, reader, &cache, chain, request)
                .map(move |quote| (family, quote))
        }))
        .await;

        if deferred {
            let single_found = results
                .iter()
                .any(|(f, q)| *f == DexFamily::UniswapV3Single && q.is_some());
            if !single_found {
                let multi = self
                    .run_family(DexFamily::UniswapV3Multi, reader, &cache, chain, request)
                    .await;
                results.push((DexFamily::UniswapV3Multi, multi));
            }
            results.sort_by_key(|(f, _)| FAMILY_ORDER.iter().position(|o| o == f));
        }

        for (family, quote) in &results {
            match quote {
                Some(q) => debug!(%family, dex = %q.dex_name, amount = %q.amount, "family quote"),
                None => debug!(%family, "family exhausted"),
            }
        }

        pick_best(request.direction, results.into_iter().map(|(_, q)| q))
    }

    fn family_future<'a>(
        &'a self,
        family: DexFamily,
        reader: &'a dyn ChainReader,
        cache: &'a FeeTierCache,
        chain: &'a ChainConfig,
        request: &'a PairRequest,
    ) -> BoxFuture<'a, Option<Quote>> {
        match family {
            DexFamily::UniswapV2 => uniswap_v2::best_quote(reader, chain, request).boxed(),
            DexFamily::Solidly => {
                solidly::best_quote(reader, chain, request, self.config.refine_params()).boxed()
            }
            DexFamily::UniswapV3Single => uniswap_v3::best_single_quote(
                reader,
                cache,
                chain,
                request,
                self.config.single_hop_fee_selection,
            )
            .boxed(),
            DexFamily::UniswapV3Multi => {
                uniswap_v3::best_multi_quote(reader, cache, chain, request).boxed()
            }
            DexFamily::AlgebraSingle => {
                uniswap_v3::best_algebra_single_quote(reader, chain, request).boxed()
            }
            DexFamily::AlgebraMulti => {
                uniswap_v3::best_algebra_multi_quote(reader, chain, request).boxed()
            }
            DexFamily::WrappedContract => futures::future::ready(None).boxed(),
        }
    }

    /// One family under the per-family time budget
    async fn run_family(
        &self,
        family: DexFamily,
        reader: &dyn ChainReader,
        cache: &FeeTierCache,
        chain: &ChainConfig,
        request: &PairRequest,
    ) -> Option<Quote> {
        let budget = Duration::from_secs(self.config.family_timeout_secs);
        let fut = self.family_future(family, reader, cache, chain, request);
        match timeout(budget, fut).await {
            Ok(quote) => quote,
            Err(_) => {
                warn!(%family, chain_id = chain.chain_id, "family evaluation timed out");
                None
            }
        }
    }
}
