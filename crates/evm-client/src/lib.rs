//! evm-client: Read-only EVM access for the quoting engine
//!
//! This crate provides the [`ChainReader`] seam the path enumerators and
//! quote evaluators are written against, an alloy-backed JSON-RPC
//! implementation of it with a per-endpoint concurrency cap, and the swap
//! calldata builder for selected routes.

pub mod abi;
pub mod calldata;
pub mod probe;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, U256};
use alloy::providers::RootProvider;
use alloy::transports::http::Http;
use async_trait::async_trait;
use dexroute_core::{PathPayload, RpcEndpoint, RpcError, SolidlyHop, TradeDirection};
use tokio::sync::Semaphore;

use crate::abi::{
    IAlgebraQuoter, IQuoterV2, ISolidlyFactory, ISolidlyRouter, IUniswapV2Factory,
    IUniswapV2Router, IUniswapV3Factory,
};

pub use calldata::{build_swap_calldata, CalldataError, SwapCalldata};
pub use probe::{probe_endpoint, EndpointStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result type for chain reads
pub type Result<T> = std::result::Result<T, RpcError>;

/// Pool existence lookup, one variant per factory ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolQuery {
    V2 {
        factory: Address,
        token_a: Address,
        token_b: Address,
    },
    V3 {
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    },
    Solidly {
        factory: Address,
        token_a: Address,
        token_b: Address,
        stable: bool,
    },
}

/// Outcome of one simulated swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedQuote {
    /// Output for exact-input, required input for exact-output
    pub amount: U256,
    /// Dynamic fee reported by the quoter, if any
    pub fee: Option<u32>,
}

impl SimulatedQuote {
    pub fn amount(amount: U256) -> Self {
        Self { amount, fee: None }
    }
}

/// Read-only chain access used by path enumeration and quote evaluation
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Pool address for the query, `None` when the factory returns zero
    async fn pool_address(&self, query: PoolQuery) -> Result<Option<Address>>;

    /// Simulate selling `amount_in` along `path` through `target`
    async fn simulate_exact_input(
        &self,
        target: Address,
        path: &PathPayload,
        amount_in: U256,
    ) -> Result<SimulatedQuote>;

    /// Simulate buying `amount_out` along `path` through `target`
    async fn simulate_exact_output(
        &self,
        target: Address,
        path: &PathPayload,
        amount_out: U256,
    ) -> Result<SimulatedQuote>;

    /// Simulate the fixed `amount` in `direction`
    async fn simulate(
        &self,
        target: Address,
        path: &PathPayload,
        direction: TradeDirection,
        amount: U256,
    ) -> Result<SimulatedQuote> {
        match direction {
            TradeDirection::ExactInput => self.simulate_exact_input(target, path, amount).await,
            TradeDirection::ExactOutput => self.simulate_exact_output(target, path, amount).await,
        }
    }
}

/// JSON-RPC backed [`ChainReader`]
#[derive(Clone)]
pub struct EvmClient {
    provider: RootProvider,
    limiter: Arc<Semaphore>,
    endpoint: RpcEndpoint,
}

impl EvmClient {
    /// Build a client for `endpoint`. No network traffic happens here.
    pub fn new(endpoint: RpcEndpoint) -> Result<Self> {
        let url: reqwest::Url = endpoint.url.parse().map_err(|e| RpcError::Transport {
            url: endpoint.url.clone(),
            message: format!("invalid url: {e}"),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport {
                url: endpoint.url.clone(),
                message: e.to_string(),
            })?;
        let http = Http::with_client(client, url);
        let rpc_client = alloy::rpc::client::RpcClient::new(http, false);

        Ok(Self {
            provider: RootProvider::new(rpc_client),
            limiter: Arc::new(Semaphore::new(endpoint.max_concurrent_requests.max(1))),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    pub fn provider(&self) -> &RootProvider {
        &self.provider
    }

    /// Run one call under the concurrency cap and the per-call timeout
    async fn timed_call<T, E, F>(&self, label: &'static str, fut: F) -> Result<T>
    where
        E: Into<alloy::contract::Error>,
        F: IntoFuture<Output = std::result::Result<T, E>>,
    {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| RpcError::Transport {
                url: self.endpoint.url.clone(),
                message: "client shut down".to_string(),
            })?;

        let secs = self.endpoint.timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), fut).await {
            Ok(result) => result.map_err(|e| classify(&self.endpoint.url, e.into())),
            Err(_) => {
                tracing::warn!(url = %self.endpoint.url, call = label, "RPC call timed out");
                Err(RpcError::Timeout { secs })
            }
        }
    }

    async fn quote_exact_input(
        &self,
        target: Address,
        path: &PathPayload,
        amount_in: U256,
    ) -> Result<SimulatedQuote> {
        match path {
            PathPayload::Wrap(_) => Ok(SimulatedQuote::amount(amount_in)),
            PathPayload::V2(tokens) => {
                let router = IUniswapV2Router::new(target, &self.provider);
                let call = router.getAmountsOut(amount_in, tokens.clone());
                let amounts = self.timed_call("getAmountsOut", call.call()).await?;
                last_amount(&amounts).map(SimulatedQuote::amount)
            }
            PathPayload::Solidly(hops) => {
                let router = ISolidlyRouter::new(target, &self.provider);
                let call = router.getAmountsOut(amount_in, solidly_routes(hops));
                let amounts = self.timed_call("getAmountsOut", call.call()).await?;
                last_amount(&amounts).map(SimulatedQuote::amount)
            }
            PathPayload::V3Multi(encoded) => {
                let quoter = IQuoterV2::new(target, &self.provider);
                let call = quoter.quoteExactInput(encoded.clone(), amount_in);
                let ret = self.timed_call("quoteExactInput", call.call()).await?;
                Ok(SimulatedQuote::amount(ret.amountOut))
            }
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            } => {
                let quoter = IQuoterV2::new(target, &self.provider);
                let params = IQuoterV2::QuoteExactInputSingleParams {
                    tokenIn: *token_in,
                    tokenOut: *token_out,
                    amountIn: amount_in,
                    fee: U24::saturating_from(*fee),
                    sqrtPriceLimitX96: U160::ZERO,
                };
                let call = quoter.quoteExactInputSingle(params);
                let ret = self.timed_call("quoteExactInputSingle", call.call()).await?;
                Ok(SimulatedQuote {
                    amount: ret.amountOut,
                    fee: Some(*fee),
                })
            }
            PathPayload::AlgebraMulti(encoded) => {
                let quoter = IAlgebraQuoter::new(target, &self.provider);
                let call = quoter.quoteExactInput(encoded.clone(), amount_in);
                let ret = self.timed_call("quoteExactInput", call.call()).await?;
                Ok(SimulatedQuote::amount(ret.amountOut))
            }
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            } => {
                let quoter = IAlgebraQuoter::new(target, &self.provider);
                let call =
                    quoter.quoteExactInputSingle(*token_in, *token_out, amount_in, U160::ZERO);
                let ret = self.timed_call("quoteExactInputSingle", call.call()).await?;
                Ok(SimulatedQuote {
                    amount: ret.amountOut,
                    fee: Some(u32::from(ret.fee)),
                })
            }
        }
    }

    async fn quote_exact_output(
        &self,
        target: Address,
        path: &PathPayload,
        amount_out: U256,
    ) -> Result<SimulatedQuote> {
        match path {
            PathPayload::Wrap(_) => Ok(SimulatedQuote::amount(amount_out)),
            PathPayload::V2(tokens) => {
                let router = IUniswapV2Router::new(target, &self.provider);
                let call = router.getAmountsIn(amount_out, tokens.clone());
                let amounts = self.timed_call("getAmountsIn", call.call()).await?;
                amounts
                    .first()
                    .copied()
                    .map(SimulatedQuote::amount)
                    .ok_or_else(|| RpcError::Decode("empty amounts".to_string()))
            }
            PathPayload::Solidly(_) => Err(RpcError::Unsupported {
                target: "solidly router",
                operation: "exact-output simulation",
            }),
            PathPayload::V3Multi(encoded) => {
                let quoter = IQuoterV2::new(target, &self.provider);
                let call = quoter.quoteExactOutput(encoded.clone(), amount_out);
                let ret = self.timed_call("quoteExactOutput", call.call()).await?;
                Ok(SimulatedQuote::amount(ret.amountIn))
            }
            PathPayload::V3Single {
                token_in,
                token_out,
                fee,
            } => {
                let quoter = IQuoterV2::new(target, &self.provider);
                let params = IQuoterV2::QuoteExactOutputSingleParams {
                    tokenIn: *token_in,
                    tokenOut: *token_out,
                    amount: amount_out,
                    fee: U24::saturating_from(*fee),
                    sqrtPriceLimitX96: U160::ZERO,
                };
                let call = quoter.quoteExactOutputSingle(params);
                let ret = self.timed_call("quoteExactOutputSingle", call.call()).await?;
                Ok(SimulatedQuote {
                    amount: ret.amountIn,
                    fee: Some(*fee),
                })
            }
            PathPayload::AlgebraMulti(encoded) => {
                let quoter = IAlgebraQuoter::new(target, &self.provider);
                let call = quoter.quoteExactOutput(encoded.clone(), amount_out);
                let ret = self.timed_call("quoteExactOutput", call.call()).await?;
                Ok(SimulatedQuote::amount(ret.amountIn))
            }
            PathPayload::AlgebraSingle {
                token_in,
                token_out,
            } => {
                let quoter = IAlgebraQuoter::new(target, &self.provider);
                let call =
                    quoter.quoteExactOutputSingle(*token_in, *token_out, amount_out, U160::ZERO);
                let ret = self.timed_call("quoteExactOutputSingle", call.call()).await?;
                Ok(SimulatedQuote {
                    amount: ret.amountIn,
                    fee: Some(u32::from(ret.fee)),
                })
            }
        }
    }
}

#[async_trait]
impl ChainReader for EvmClient {
    async fn pool_address(&self, query: PoolQuery) -> Result<Option<Address>> {
        let pool = match query {
            PoolQuery::V2 {
                factory,
                token_a,
                token_b,
            } => {
                let f = IUniswapV2Factory::new(factory, &self.provider);
                self.timed_call("getPair", f.getPair(token_a, token_b).call())
                    .await?
            }
            PoolQuery::V3 {
                factory,
                token_a,
                token_b,
                fee,
            } => {
                let f = IUniswapV3Factory::new(factory, &self.provider);
                let call = f.getPool(token_a, token_b, U24::saturating_from(fee));
                self.timed_call("getPool", call.call()).await?
            }
            PoolQuery::Solidly {
                factory,
                token_a,
                token_b,
                stable,
            } => {
                let f = ISolidlyFactory::new(factory, &self.provider);
                self.timed_call("getPool", f.getPool(token_a, token_b, stable).call())
                    .await?
            }
        };
        Ok((!pool.is_zero()).then_some(pool))
    }

    async fn simulate_exact_input(
        &self,
        target: Address,
        path: &PathPayload,
        amount_in: U256,
    ) -> Result<SimulatedQuote> {
        self.quote_exact_input(target, path, amount_in).await
    }

    async fn simulate_exact_output(
        &self,
        target: Address,
        path: &PathPayload,
        amount_out: U256,
    ) -> Result<SimulatedQuote> {
        self.quote_exact_output(target, path, amount_out).await
    }
}

fn solidly_routes(hops: &[SolidlyHop]) -> Vec<ISolidlyRouter::Route> {
    hops.iter()
        .map(|h| ISolidlyRouter::Route {
            from: h.from,
            to: h.to,
            stable: h.stable,
            factory: h.factory,
        })
        .collect()
}

fn last_amount(amounts: &[U256]) -> Result<U256> {
    amounts
        .last()
        .copied()
        .ok_or_else(|| RpcError::Decode("empty amounts".to_string()))
}

/// Map a contract-call failure onto the engine's error taxonomy
fn classify(url: &str, err: alloy::contract::Error) -> RpcError {
    match err {
        alloy::contract::Error::TransportError(e) if e.is_error_resp() => RpcError::Reverted {
            message: e.to_string(),
        },
        alloy::contract::Error::TransportError(e) => RpcError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        },
        other => RpcError::Decode(other.to_string()),
    }
}
