//! Quote and route records
//!
//! A [`Quote`] is the simulated result of one candidate path. A [`Route`] is
//! the single best quote for a request, widened with everything the
//! execution layer needs to build the swap call.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::math::{apply_slippage_down, apply_slippage_up};
use crate::types::{DexFamily, PathPayload, Token, TradeDirection, WrapAction};

/// What every family evaluator is asked: the substituted pair, the
/// direction and the caller's fixed amount in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRequest {
    pub token_in: Token,
    pub token_out: Token,
    pub direction: TradeDirection,
    pub amount: U256,
}

impl PairRequest {
    /// Bridges usable for this pair: everything but the pair's own tokens
    pub fn usable_bridges(&self, bridges: &[Address]) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::with_capacity(bridges.len());
        for b in bridges {
            if *b != self.token_in.address && *b != self.token_out.address && !out.contains(b) {
                out.push(*b);
            }
        }
        out
    }
}

/// Simulated result of one candidate path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub family: DexFamily,
    /// Dex name from the registry ("UniswapV3", "Velodrome", ...)
    pub dex_name: String,
    pub router: Address,
    pub path: PathPayload,
    /// Output for exact-input quotes, required input for exact-output quotes
    pub amount: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_tier: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_factory: Option<Address>,
    /// Simulated output of `amount` for exact-output quotes found by
    /// refinement, which may sit off the requested output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_out: Option<U256>,
}

/// Whether `candidate` beats `incumbent` for `direction`.
///
/// Strict comparison, so the first-seen quote keeps ties.
pub fn is_better(direction: TradeDirection, candidate: U256, incumbent: U256) -> bool {
    match direction {
        TradeDirection::ExactInput => candidate > incumbent,
        TradeDirection::ExactOutput => candidate < incumbent,
    }
}

/// Fold a sequence of optional quotes down to the best one.
///
/// Zero amounts never win: a zero output is no liquidity and a zero input
/// for a non-zero output is a broken quote.
pub fn pick_best<I>(direction: TradeDirection, quotes: I) -> Option<Quote>
where
    I: IntoIterator<Item = Option<Quote>>,
{
    quotes
        .into_iter()
        .flatten()
        .filter(|q| !q.amount.is_zero())
        .fold(None, |best: Option<Quote>, q| match best {
            Some(b) if !is_better(direction, q.amount, b.amount) => Some(b),
            _ => Some(q),
        })
}

/// Router call shape the execution layer must use for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMethod {
    WrapDeposit,
    WrapWithdraw,
    V2Path,
    SolidlyRoutes,
    V3Single,
    V3Path,
    AlgebraSingle,
    AlgebraPath,
}

impl SwapMethod {
    pub fn for_path(path: &PathPayload) -> Self {
        match path {
            PathPayload::Wrap(WrapAction::Deposit) => Self::WrapDeposit,
            PathPayload::Wrap(WrapAction::Withdraw) => Self::WrapWithdraw,
            PathPayload::V2(_) => Self::V2Path,
            PathPayload::Solidly(_) => Self::SolidlyRoutes,
            PathPayload::V3Single { .. } => Self::V3Single,
            PathPayload::V3Multi(_) => Self::V3Path,
            PathPayload::AlgebraSingle { .. } => Self::AlgebraSingle,
            PathPayload::AlgebraMulti(_) => Self::AlgebraPath,
        }
    }
}

/// The selected best quote for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub chain_id: u64,
    pub direction: TradeDirection,
    pub family: DexFamily,
    pub dex_name: String,
    pub method: SwapMethod,
    pub router: Address,
    pub path: PathPayload,
    /// Original (pre-substitution) input token, so native-in routes stay visible
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Minimum acceptable output (exact-input) or the quoted output (exact-output)
    pub amount_out_min: U256,
    /// Maximum acceptable input (exact-output) or the quoted input (exact-input)
    pub amount_in_max: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_tier: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_factory: Option<Address>,
}

/// Request-side facts a quote is widened with
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest {
    pub chain_id: u64,
    pub direction: TradeDirection,
    pub token_in: Address,
    pub token_out: Address,
    /// The caller's fixed amount (input or output depending on direction)
    pub amount: U256,
    pub slippage_bps: u64,
}

impl Route {
    pub fn from_quote(request: &RouteRequest, quote: Quote) -> Self {
        let (amount_in, amount_out) = match request.direction {
            TradeDirection::ExactInput => (request.amount, quote.amount),
            TradeDirection::ExactOutput => {
                (quote.amount, quote.simulated_out.unwrap_or(request.amount))
            }
        };
        let (amount_out_min, amount_in_max) = match (request.direction, &quote.path) {
            (_, PathPayload::Wrap(_)) => (amount_out, amount_in),
            // Solidly routers only swap exact-input: the refined input is
            // spent in full and the output it simulates to is bounded instead
            (TradeDirection::ExactOutput, PathPayload::Solidly(_)) => {
                (apply_slippage_down(amount_out, request.slippage_bps), amount_in)
            }
            (TradeDirection::ExactInput, _) => {
                (apply_slippage_down(amount_out, request.slippage_bps), amount_in)
            }
            (TradeDirection::ExactOutput, _) => {
                (amount_out, apply_slippage_up(amount_in, request.slippage_bps))
            }
        };

        Self {
            chain_id: request.chain_id,
            direction: request.direction,
            family: quote.family,
            dex_name: quote.dex_name,
            method: SwapMethod::for_path(&quote.path),
            router: quote.router,
            path: quote.path,
            token_in: request.token_in,
            token_out: request.token_out,
            amount_in,
            amount_out,
            amount_out_min,
            amount_in_max,
            fee_tier: quote.fee_tier,
            pool_factory: quote.pool_factory,
        }
    }

    /// The amount the engine computed (output for exact-input, input for exact-output)
    pub fn quoted_amount(&self) -> U256 {
        match self.direction {
            TradeDirection::ExactInput => self.amount_out,
            TradeDirection::ExactOutput => self.amount_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn quote(name: &str, amount: u64) -> Quote {
        Quote {
            family: DexFamily::UniswapV2,
            dex_name: name.to_string(),
            router: Address::ZERO,
            path: PathPayload::V2(vec![]),
            amount: U256::from(amount),
            fee_tier: None,
            pool_factory: None,
            simulated_out: None,
        }
    }

    #[test]
    fn test_usable_bridges_skip_pair_tokens() {
        let a = address!("1111111111111111111111111111111111111111");
        let b = address!("2222222222222222222222222222222222222222");
        let c = address!("3333333333333333333333333333333333333333");
        let request = PairRequest {
            token_in: Token::new(a, 18),
            token_out: Token::new(b, 6),
            direction: TradeDirection::ExactInput,
            amount: U256::from(1u8),
        };
        assert_eq!(request.usable_bridges(&[a, c, b, c]), vec![c]);
    }

    #[test]
    fn test_pick_best_exact_input_takes_max() {
        let best = pick_best(
            TradeDirection::ExactInput,
            vec![Some(quote("a", 10)), None, Some(quote("b", 30)), Some(quote("c", 20))],
        )
        .unwrap();
        assert_eq!(best.dex_name, "b");
    }

    #[test]
    fn test_pick_best_exact_output_takes_min() {
        let best = pick_best(
            TradeDirection::ExactOutput,
            vec![Some(quote("a", 10)), Some(quote("b", 30)), Some(quote("c", 5))],
        )
        .unwrap();
        assert_eq!(best.dex_name, "c");
    }

    #[test]
    fn test_pick_best_ties_keep_first_seen() {
        let quotes = vec![Some(quote("first", 10)), Some(quote("second", 10))];
        assert_eq!(
            pick_best(TradeDirection::ExactInput, quotes.clone()).unwrap().dex_name,
            "first"
        );
        assert_eq!(
            pick_best(TradeDirection::ExactOutput, quotes).unwrap().dex_name,
            "first"
        );
    }

    #[test]
    fn test_pick_best_ignores_zero() {
        assert!(pick_best(TradeDirection::ExactOutput, vec![Some(quote("z", 0))]).is_none());
        assert!(pick_best(TradeDirection::ExactInput, Vec::<Option<Quote>>::new()).is_none());
        let best = pick_best(
            TradeDirection::ExactOutput,
            vec![Some(quote("z", 0)), Some(quote("a", 7))],
        )
        .unwrap();
        assert_eq!(best.dex_name, "a");
    }

    #[test]
    fn test_route_bounds() {
        let request = RouteRequest {
            chain_id: 8453,
            direction: TradeDirection::ExactInput,
            token_in: address!("1111111111111111111111111111111111111111"),
            token_out: address!("2222222222222222222222222222222222222222"),
            amount: U256::from(1_000u64),
            slippage_bps: 100,
        };
        let route = Route::from_quote(&request, quote("a", 2_000));
        assert_eq!(route.amount_in, U256::from(1_000u64));
        assert_eq!(route.amount_out, U256::from(2_000u64));
        assert_eq!(route.amount_out_min, U256::from(1_980u64));
        assert_eq!(route.method, SwapMethod::V2Path);
        assert_eq!(route.quoted_amount(), U256::from(2_000u64));

        let request = RouteRequest {
            direction: TradeDirection::ExactOutput,
            ..request
        };
        let route = Route::from_quote(&request, quote("a", 500));
        assert_eq!(route.amount_in, U256::from(500u64));
        assert_eq!(route.amount_out, U256::from(1_000u64));
        assert_eq!(route.amount_in_max, U256::from(505u64));
    }

    #[test]
    fn test_solidly_exact_output_bounds_output() {
        let request = RouteRequest {
            chain_id: 8453,
            direction: TradeDirection::ExactOutput,
            token_in: address!("1111111111111111111111111111111111111111"),
            token_out: address!("2222222222222222222222222222222222222222"),
            amount: U256::from(1_000u64),
            slippage_bps: 50,
        };
        let quote = Quote {
            family: DexFamily::Solidly,
            path: PathPayload::Solidly(vec![]),
            simulated_out: Some(U256::from(990u64)),
            ..quote("Velodrome", 400)
        };
        let route = Route::from_quote(&request, quote);
        assert_eq!(route.method, SwapMethod::SolidlyRoutes);
        assert_eq!(route.amount_in_max, U256::from(400u64));
        // Bounds follow what 400 actually buys, not the 1000 asked for
        assert_eq!(route.amount_out, U256::from(990u64));
        assert_eq!(route.amount_out_min, U256::from(985u64));
        assert!(route.amount_out_min <= U256::from(990u64));
    }

    #[test]
    fn test_solidly_exact_output_without_simulation_uses_request() {
        let request = RouteRequest {
            chain_id: 8453,
            direction: TradeDirection::ExactOutput,
            token_in: address!("1111111111111111111111111111111111111111"),
            token_out: address!("2222222222222222222222222222222222222222"),
            amount: U256::from(1_000u64),
            slippage_bps: 50,
        };
        let quote = Quote {
            family: DexFamily::Solidly,
            path: PathPayload::Solidly(vec![]),
            ..quote("Velodrome", 400)
        };
        let route = Route::from_quote(&request, quote);
        assert_eq!(route.amount_out, U256::from(1_000u64));
        assert_eq!(route.amount_out_min, U256::from(995u64));
    }

    #[test]
    fn test_wrap_route_has_no_slippage() {
        let request = RouteRequest {
            chain_id: 4689,
            direction: TradeDirection::ExactInput,
            token_in: address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"),
            token_out: address!("A00744882684C3E4747FAEFD68D283EA44099D03"),
            amount: U256::from(77u64),
            slippage_bps: 300,
        };
        let quote = Quote {
            family: DexFamily::WrappedContract,
            path: PathPayload::Wrap(WrapAction::Deposit),
            ..quote("Wrapped", 77)
        };
        let route = Route::from_quote(&request, quote);
        assert_eq!(route.method, SwapMethod::WrapDeposit);
        assert_eq!(route.amount_out_min, route.amount_out);
        assert_eq!(route.amount_in_max, route.amount_in);
    }
}
