//! Swap calldata for a selected route
//!
//! Turns a [`Route`] into the transaction the execution layer signs. Native
//! input is paid as call value. Native output is unwrapped by the router
//! itself where the router supports it, or through the router's `*ETH`
//! entry points otherwise.

use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use dexroute_core::constants::NATIVE_TOKEN_ADDRESS;
use dexroute_core::{PathPayload, Route, TradeDirection, WrapAction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abi::{
    IAlgebraSwapRouter, ISolidlyRouter, ISwapRouter02, IUniswapV2Router, IWrappedNative,
};
use crate::solidly_routes;

/// Unsigned transaction for a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCalldata {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalldataError {
    #[error("route path is empty")]
    EmptyPath,

    #[error("route cannot both spend and receive the native currency")]
    NativeOnBothSides,

    #[error("route path cannot be encoded for the {router} router")]
    PathMismatch { router: &'static str },
}

/// Build the swap call for `route`, delivering output to `recipient`.
///
/// `deadline` is a unix timestamp; routers without a deadline parameter
/// ignore it.
pub fn build_swap_calldata(
    route: &Route,
    recipient: Address,
    deadline: U256,
) -> Result<SwapCalldata, CalldataError> {
    let native_in = route.token_in == NATIVE_TOKEN_ADDRESS;
    let native_out = route.token_out == NATIVE_TOKEN_ADDRESS;
    if native_in && native_out {
        return Err(CalldataError::NativeOnBothSides);
    }
    let exact_in = route.direction == TradeDirection::ExactInput;

    let (data, value) = match &route.path {
        PathPayload::Wrap(WrapAction::Deposit) => {
            (IWrappedNative::depositCall {}.abi_encode(), route.amount_in)
        }
        PathPayload::Wrap(WrapAction::Withdraw) => (
            IWrappedNative::withdrawCall {
                wad: route.amount_in,
            }
            .abi_encode(),
            U256::ZERO,
        ),
        PathPayload::V2(tokens) => {
            if tokens.len() < 2 {
                return Err(CalldataError::EmptyPath);
            }
            v2_call(route, tokens.clone(), recipient, deadline, native_in, native_out)
        }
        PathPayload::Solidly(hops) => {
            if hops.is_empty() {
                return Err(CalldataError::EmptyPath);
            }
            solidly_call(route, hops, recipient, deadline, native_in, native_out)
        }
        PathPayload::V3Single { .. } | PathPayload::V3Multi(_) => {
            let swap_to = if native_out { route.router } else { recipient };
            let inner = v3_call(route, swap_to)?;
            let data = with_native_legs(
                inner,
                native_in && !exact_in,
                native_out.then(|| {
                    ISwapRouter02::unwrapWETH9Call {
                        amountMinimum: route.amount_out_min,
                        recipient,
                    }
                    .abi_encode()
                }),
                ISwapRouter02::refundETHCall {}.abi_encode(),
                |data| ISwapRouter02::multicallCall { data }.abi_encode(),
            );
            (data, native_value(route, native_in))
        }
        PathPayload::AlgebraSingle { .. } | PathPayload::AlgebraMulti(_) => {
            let swap_to = if native_out { route.router } else { recipient };
            let inner = algebra_call(route, swap_to, deadline)?;
            let data = with_native_legs(
                inner,
                native_in && !exact_in,
                native_out.then(|| {
                    IAlgebraSwapRouter::unwrapWNativeTokenCall {
                        amountMinimum: route.amount_out_min,
                        recipient,
                    }
                    .abi_encode()
                }),
                IAlgebraSwapRouter::refundNativeTokenCall {}.abi_encode(),
                |data| IAlgebraSwapRouter::multicallCall { data }.abi_encode(),
            );
            (data, native_value(route, native_in))
        }
    };

    Ok(SwapCalldata {
        to: route.router,
        data: Bytes::from(data),
        value,
    })
}

/// Value attached when the input is native: the exact input, or the input
/// ceiling for exact-output swaps (the router refunds the rest)
fn native_value(route: &Route, native_in: bool) -> U256 {
    match (native_in, route.direction) {
        (false, _) => U256::ZERO,
        (true, TradeDirection::ExactInput) => route.amount_in,
        (true, TradeDirection::ExactOutput) => route.amount_in_max,
    }
}

fn with_native_legs(
    inner: Vec<u8>,
    refund: bool,
    unwrap: Option<Vec<u8>>,
    refund_call: Vec<u8>,
    multicall: impl FnOnce(Vec<Bytes>) -> Vec<u8>,
) -> Vec<u8> {
    if !refund && unwrap.is_none() {
        return inner;
    }
    let mut calls = vec![Bytes::from(inner)];
    if let Some(unwrap) = unwrap {
        calls.push(Bytes::from(unwrap));
    }
    if refund {
        calls.push(Bytes::from(refund_call));
    }
    multicall(calls)
}

fn v2_call(
    route: &Route,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
    native_in: bool,
    native_out: bool,
) -> (Vec<u8>, U256) {
    match (route.direction, native_in, native_out) {
        (TradeDirection::ExactInput, true, _) => (
            IUniswapV2Router::swapExactETHForTokensCall {
                amountOutMin: route.amount_out_min,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            route.amount_in,
        ),
        (TradeDirection::ExactInput, _, true) => (
            IUniswapV2Router::swapExactTokensForETHCall {
                amountIn: route.amount_in,
                amountOutMin: route.amount_out_min,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        ),
        (TradeDirection::ExactInput, _, _) => (
            IUniswapV2Router::swapExactTokensForTokensCall {
                amountIn: route.amount_in,
                amountOutMin: route.amount_out_min,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        ),
        (TradeDirection::ExactOutput, true, _) => (
            IUniswapV2Router::swapETHForExactTokensCall {
                amountOut: route.amount_out,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            route.amount_in_max,
        ),
        (TradeDirection::ExactOutput, _, true) => (
            IUniswapV2Router::swapTokensForExactETHCall {
                amountOut: route.amount_out,
                amountInMax: route.amount_in_max,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        ),
        (TradeDirection::ExactOutput, _, _) => (
            IUniswapV2Router::swapTokensForExactTokensCall {
                amountOut: route.amount_out,
                amountInMax: route.amount_in_max,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        ),
    }
}

/// Solidly routes are always executed exact-input; exact-output requests
/// carry the refined input and a bounded output.
fn solidly_call(
    route: &Route,
    hops: &[dexroute_core::SolidlyHop],
    to: Address,
    deadline: U256,
    native_in: bool,
    native_out: bool,
) -> (Vec<u8>, U256) {
    let routes = solidly_routes(hops);
    if native_in {
        (
            ISolidlyRouter::swapExactETHForTokensCall {
                amountOutMin: route.amount_out_min,
                routes,
                to,
                deadline,
            }
            .abi_encode(),
            route.amount_in,
        )
    } else if native_out {
        (
            ISolidlyRouter::swapExactTokensForETHCall {
                amountIn: route.amount_in,
                amountOutMin: route.amount_out_min,
                routes,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        )
    } else {
        (
            ISolidlyRouter::swapExactTokensForTokensCall {
                amountIn: route.amount_in,
                amountOutMin: route.amount_out_min,
                routes,
                to,
                deadline,
            }
            .abi_encode(),
            U256::ZERO,
        )
    }
}

fn v3_call(route: &Route, recipient: Address) -> Result<Vec<u8>, CalldataError> {
    let data = match (&route.path, route.direction) {
        (
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            },
            TradeDirection::ExactInput,
        ) => ISwapRouter02::exactInputSingleCall {
            params: ISwapRouter02::ExactInputSingleParams {
                tokenIn: *token_in,
                tokenOut: *token_out,
                fee: U24::saturating_from(*fee),
                recipient,
                amountIn: route.amount_in,
                amountOutMinimum: route.amount_out_min,
                sqrtPriceLimitX96: U160::ZERO,
            },
        }
        .abi_encode(),
        (
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            },
            TradeDirection::ExactOutput,
        ) => ISwapRouter02::exactOutputSingleCall {
            params: ISwapRouter02::ExactOutputSingleParams {
                tokenIn: *token_in,
                tokenOut: *token_out,
                fee: U24::saturating_from(*fee),
                recipient,
                amountOut: route.amount_out,
                amountInMaximum: route.amount_in_max,
                sqrtPriceLimitX96: U160::ZERO,
            },
        }
        .abi_encode(),
        (PathPayload::V3Multi(path), TradeDirection::ExactInput) => ISwapRouter02::exactInputCall {
            params: ISwapRouter02::ExactInputParams {
                path: path.clone(),
                recipient,
                amountIn: route.amount_in,
                amountOutMinimum: route.amount_out_min,
            },
        }
        .abi_encode(),
        // Exact-output paths are already stored output-first
        (PathPayload::V3Multi(path), TradeDirection::ExactOutput) => {
            ISwapRouter02::exactOutputCall {
                params: ISwapRouter02::ExactOutputParams {
                    path: path.clone(),
                    recipient,
                    amountOut: route.amount_out,
                    amountInMaximum: route.amount_in_max,
                },
            }
            .abi_encode()
        }
        _ => return Err(CalldataError::PathMismatch { router: "V3" }),
    };
    Ok(data)
}

fn algebra_call(route: &Route, recipient: Address, deadline: U256) -> Result<Vec<u8>, CalldataError> {
    let data = match (&route.path, route.direction) {
        (
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            },
            TradeDirection::ExactInput,
        ) => IAlgebraSwapRouter::exactInputSingleCall {
            params: IAlgebraSwapRouter::ExactInputSingleParams {
                tokenIn: *token_in,
                tokenOut: *token_out,
                recipient,
                deadline,
                amountIn: route.amount_in,
                amountOutMinimum: route.amount_out_min,
                limitSqrtPrice: U160::ZERO,
            },
        }
        .abi_encode(),
        (
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            },
            TradeDirection::ExactOutput,
        ) => IAlgebraSwapRouter::exactOutputSingleCall {
            params: IAlgebraSwapRouter::ExactOutputSingleParams {
                tokenIn: *token_in,
                tokenOut: *token_out,
                fee: U24::saturating_from(route.fee_tier.unwrap_or_default()),
                recipient,
                deadline,
                amountOut: route.amount_out,
                amountInMaximum: route.amount_in_max,
                limitSqrtPrice: U160::ZERO,
            },
        }
        .abi_encode(),
        (PathPayload::AlgebraMulti(path), TradeDirection::ExactInput) => {
            IAlgebraSwapRouter::exactInputCall {
                params: IAlgebraSwapRouter::ExactInputParams {
                    path: path.clone(),
                    recipient,
                    deadline,
                    amountIn: route.amount_in,
                    amountOutMinimum: route.amount_out_min,
                },
            }
            .abi_encode()
        }
        (PathPayload::AlgebraMulti(path), TradeDirection::ExactOutput) => {
            IAlgebraSwapRouter::exactOutputCall {
                params: IAlgebraSwapRouter::ExactOutputParams {
                    path: path.clone(),
                    recipient,
                    deadline,
                    amountOut: route.amount_out,
                    amountInMaximum: route.amount_in_max,
                },
            }
            .abi_encode()
        }
        _ => return Err(CalldataError::PathMismatch { router: "Algebra" }),
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use dexroute_core::path::HopSequence;
    use dexroute_core::{DexFamily, Quote, RouteRequest, SolidlyHop};

    const ROUTER: Address = address!("2626664c2603336E57B271c5C0b26F421741e481");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const ME: Address = address!("00000000000000000000000000000000000000aa");

    fn route(direction: TradeDirection, token_in: Address, token_out: Address, path: PathPayload) -> Route {
        let request = RouteRequest {
            chain_id: 8453,
            direction,
            token_in,
            token_out,
            amount: U256::from(1_000_000u64),
            slippage_bps: 50,
        };
        let quote = Quote {
            family: DexFamily::UniswapV3Single,
            dex_name: "UniswapV3".to_string(),
            router: ROUTER,
            path,
            amount: U256::from(2_000_000u64),
            fee_tier: Some(500),
            pool_factory: None,
            simulated_out: None,
        };
        Route::from_quote(&request, quote)
    }

    #[test]
    fn test_v2_native_in_pays_value() {
        let r = route(
            TradeDirection::ExactInput,
            NATIVE_TOKEN_ADDRESS,
            USDC,
            PathPayload::V2(vec![WETH, USDC]),
        );
        let tx = build_swap_calldata(&r, ME, U256::from(1u64)).unwrap();
        assert_eq!(tx.to, ROUTER);
        assert_eq!(tx.value, U256::from(1_000_000u64));
        let call = IUniswapV2Router::swapExactETHForTokensCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.amountOutMin, r.amount_out_min);
        assert_eq!(call.to, ME);
    }

    #[test]
    fn test_v2_exact_output_tokens() {
        let r = route(
            TradeDirection::ExactOutput,
            USDC,
            WETH,
            PathPayload::V2(vec![USDC, WETH]),
        );
        let tx = build_swap_calldata(&r, ME, U256::from(1u64)).unwrap();
        assert_eq!(tx.value, U256::ZERO);
        let call = IUniswapV2Router::swapTokensForExactTokensCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.amountOut, U256::from(1_000_000u64));
        assert_eq!(call.amountInMax, r.amount_in_max);
    }

    #[test]
    fn test_v3_native_out_unwraps_through_router() {
        let r = route(
            TradeDirection::ExactInput,
            USDC,
            NATIVE_TOKEN_ADDRESS,
            PathPayload::V3Single {
                token_in: USDC,
                token_out: WETH,
                fee: 500,
            },
        );
        let tx = build_swap_calldata(&r, ME, U256::ZERO).unwrap();
        let multi = ISwapRouter02::multicallCall::abi_decode(&tx.data).unwrap();
        assert_eq!(multi.data.len(), 2);
        let swap = ISwapRouter02::exactInputSingleCall::abi_decode(&multi.data[0]).unwrap();
        assert_eq!(swap.params.recipient, ROUTER);
        let unwrap = ISwapRouter02::unwrapWETH9Call::abi_decode(&multi.data[1]).unwrap();
        assert_eq!(unwrap.recipient, ME);
        assert_eq!(unwrap.amountMinimum, r.amount_out_min);
    }

    #[test]
    fn test_v3_exact_output_native_in_refunds() {
        let path = HopSequence::new(vec![WETH, USDC], vec![500])
            .oriented(TradeDirection::ExactOutput)
            .encode_v3();
        let r = route(
            TradeDirection::ExactOutput,
            NATIVE_TOKEN_ADDRESS,
            USDC,
            PathPayload::V3Multi(path.clone()),
        );
        let tx = build_swap_calldata(&r, ME, U256::ZERO).unwrap();
        assert_eq!(tx.value, r.amount_in_max);
        let multi = ISwapRouter02::multicallCall::abi_decode(&tx.data).unwrap();
        assert_eq!(multi.data.len(), 2);
        let swap = ISwapRouter02::exactOutputCall::abi_decode(&multi.data[0]).unwrap();
        assert_eq!(swap.params.path, path);
        assert_eq!(swap.params.recipient, ME);
        assert_eq!(
            &multi.data[1][..4],
            ISwapRouter02::refundETHCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn test_v3_plain_swap_is_not_wrapped() {
        let r = route(
            TradeDirection::ExactInput,
            USDC,
            WETH,
            PathPayload::V3Single {
                token_in: USDC,
                token_out: WETH,
                fee: 500,
            },
        );
        let tx = build_swap_calldata(&r, ME, U256::ZERO).unwrap();
        assert_eq!(
            &tx.data[..4],
            ISwapRouter02::exactInputSingleCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn test_solidly_exact_output_swaps_exact_input() {
        let hops = vec![SolidlyHop {
            from: USDC,
            to: WETH,
            stable: false,
            factory: address!("420DD381b31aEf6683db6B902084cB0FFECe40Da"),
        }];
        let r = route(TradeDirection::ExactOutput, USDC, WETH, PathPayload::Solidly(hops));
        let tx = build_swap_calldata(&r, ME, U256::from(9u64)).unwrap();
        let call = ISolidlyRouter::swapExactTokensForTokensCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.amountIn, U256::from(2_000_000u64));
        assert_eq!(call.amountOutMin, r.amount_out_min);
        assert!(call.amountOutMin < U256::from(1_000_000u64));
        assert_eq!(call.deadline, U256::from(9u64));
    }

    #[test]
    fn test_algebra_native_out() {
        let r = route(
            TradeDirection::ExactInput,
            USDC,
            NATIVE_TOKEN_ADDRESS,
            PathPayload::AlgebraSingle {
                token_in: USDC,
                token_out: WETH,
            },
        );
        let tx = build_swap_calldata(&r, ME, U256::from(5u64)).unwrap();
        let multi = IAlgebraSwapRouter::multicallCall::abi_decode(&tx.data).unwrap();
        let swap = IAlgebraSwapRouter::exactInputSingleCall::abi_decode(&multi.data[0]).unwrap();
        assert_eq!(swap.params.deadline, U256::from(5u64));
        assert_eq!(swap.params.recipient, ROUTER);
    }

    #[test]
    fn test_wrap_calls() {
        let r = route(
            TradeDirection::ExactInput,
            NATIVE_TOKEN_ADDRESS,
            WETH,
            PathPayload::Wrap(WrapAction::Deposit),
        );
        let tx = build_swap_calldata(&r, ME, U256::ZERO).unwrap();
        assert_eq!(tx.value, r.amount_in);
        assert_eq!(tx.data.as_ref(), IWrappedNative::depositCall::SELECTOR.as_slice());

        let r = route(
            TradeDirection::ExactInput,
            WETH,
            NATIVE_TOKEN_ADDRESS,
            PathPayload::Wrap(WrapAction::Withdraw),
        );
        let tx = build_swap_calldata(&r, ME, U256::ZERO).unwrap();
        assert_eq!(tx.value, U256::ZERO);
        let call = IWrappedNative::withdrawCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.wad, r.amount_in);
    }

    #[test]
    fn test_concentrated_builders_reject_foreign_paths() {
        let r = route(
            TradeDirection::ExactInput,
            USDC,
            WETH,
            PathPayload::V2(vec![USDC, WETH]),
        );
        assert_eq!(
            v3_call(&r, ME).unwrap_err(),
            CalldataError::PathMismatch { router: "V3" }
        );
        assert_eq!(
            algebra_call(&r, ME, U256::ZERO).unwrap_err(),
            CalldataError::PathMismatch { router: "Algebra" }
        );
    }

    #[test]
    fn test_empty_path_rejected() {
        let r = route(TradeDirection::ExactInput, USDC, WETH, PathPayload::V2(vec![USDC]));
        assert_eq!(
            build_swap_calldata(&r, ME, U256::ZERO).unwrap_err(),
            CalldataError::EmptyPath
        );
    }
}
