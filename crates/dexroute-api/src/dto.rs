//! Data Transfer Objects for API requests and responses

use alloy_primitives::Address;
use dexroute_core::math::format_units;
use dexroute_core::{ChainConfig, DexConfig, QuoterVersion, Route, RouteError, Token};
use evm_client::EndpointStatus;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Registry chains with an RPC endpoint attached
    pub quotable_chains: usize,
}

impl HealthResponse {
    pub fn new(quotable_chains: usize) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            quotable_chains,
        }
    }
}

/// One dex in a chain summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexSummary {
    pub name: String,
    /// "v2", "v3", "algebra" or "solidly"
    pub kind: String,
}

impl From<&DexConfig> for DexSummary {
    fn from(dex: &DexConfig) -> Self {
        let kind = match dex {
            DexConfig::V2(_) => "v2",
            DexConfig::V3(v3) if v3.quoter_version == QuoterVersion::Algebra => "algebra",
            DexConfig::V3(_) => "v3",
            DexConfig::Solidly(_) => "solidly",
        };
        Self {
            name: dex.name().to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Entry of `GET /chains`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub wrapped_native: Address,
    pub dexes: Vec<DexSummary>,
    /// Whether an RPC endpoint is configured, i.e. quotes can be served
    pub rpc_configured: bool,
}

impl ChainSummary {
    pub fn new(chain: &ChainConfig, rpc_configured: bool) -> Self {
        Self {
            chain_id: chain.chain_id,
            name: chain.name.clone(),
            native_symbol: chain.native_symbol.clone(),
            native_decimals: chain.native_decimals,
            wrapped_native: chain.wrapped_native,
            dexes: chain.dexes.iter().map(DexSummary::from).collect(),
            rpc_configured,
        }
    }
}

/// `GET /chains/:id` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetailResponse {
    pub chain: ChainConfig,
    pub rpc_configured: bool,
    /// Last startup probe of the chain's endpoint
    pub endpoint: Option<EndpointStatus>,
}

/// Body of `POST /quote/exact-input` and `POST /quote/exact-output`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub token_in: Token,
    pub token_out: Token,
    /// Decimal amount of the fixed side, in whole token units (e.g. "2.5")
    pub amount: String,
    /// Debounce and supersede against earlier requests with the same id
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub route: Route,
    pub amount_in_formatted: String,
    pub amount_out_formatted: String,
}

impl QuoteResponse {
    pub fn new(route: Route, request: &QuoteRequest) -> Self {
        Self {
            amount_in_formatted: format_units(route.amount_in, request.token_in.decimals),
            amount_out_formatted: format_units(route.amount_out, request.token_out.decimals),
            route,
        }
    }
}

/// Body of `POST /quote/calldata`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalldataRequest {
    pub route: Route,
    pub recipient: Address,
    /// Unix timestamp after which the swap reverts
    pub deadline: u64,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn no_route() -> Self {
        Self::new("no_route", "No route found for this pair")
    }

    pub fn superseded() -> Self {
        Self::new("superseded", "Replaced by a newer request in the same session")
    }
}

impl From<&RouteError> for ApiError {
    fn from(e: &RouteError) -> Self {
        Self::new(e.error_code(), e.to_string())
    }
}
