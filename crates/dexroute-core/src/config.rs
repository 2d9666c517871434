//! Configuration types for dexroute

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_REFINEMENT_ITERATIONS, DEFAULT_SLIPPAGE_BPS, DEFAULT_TOLERANCE_BPS,
};
use crate::errors::{Error, Result};
use crate::refine::RefineParams;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "DEXROUTE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "dexroute.json";

/// JSON-RPC endpoint for one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEndpoint {
    /// Endpoint URL (e.g., "https://mainnet.base.org")
    pub url: String,

    /// Per-call timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cap on in-flight calls against this endpoint
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_requests() -> usize {
    16
}

/// How the V3 single-hop family picks a fee tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleHopFeeSelection {
    /// First tier (in registry order) with an existing pool. One simulation per dex.
    #[default]
    FirstAvailable,
    /// Simulate every tier with a pool and keep the best quote
    BestQuote,
}

/// Quote engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Exact-output refinement tolerance in basis points
    #[serde(default = "default_tolerance_bps")]
    pub tolerance_bps: u64,

    #[serde(default = "default_max_refinement_iterations")]
    pub max_refinement_iterations: u32,

    #[serde(default)]
    pub single_hop_fee_selection: SingleHopFeeSelection,

    /// Only evaluate V3 multi-hop when V3 single-hop found nothing
    #[serde(default)]
    pub v3_multi_fallback_only: bool,

    /// Slippage used for route bounds
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,

    /// Quiet period before a session quote starts
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound on one family's evaluation
    #[serde(default = "default_family_timeout_secs")]
    pub family_timeout_secs: u64,
}

fn default_tolerance_bps() -> u64 {
    DEFAULT_TOLERANCE_BPS
}

fn default_max_refinement_iterations() -> u32 {
    DEFAULT_MAX_REFINEMENT_ITERATIONS
}

fn default_slippage_bps() -> u64 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_family_timeout_secs() -> u64 {
    20
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            tolerance_bps: default_tolerance_bps(),
            max_refinement_iterations: default_max_refinement_iterations(),
            single_hop_fee_selection: SingleHopFeeSelection::default(),
            v3_multi_fallback_only: false,
            slippage_bps: default_slippage_bps(),
            debounce_ms: default_debounce_ms(),
            family_timeout_secs: default_family_timeout_secs(),
        }
    }
}

impl QuoteConfig {
    pub fn refine_params(&self) -> RefineParams {
        RefineParams {
            tolerance_bps: self.tolerance_bps,
            max_iterations: self.max_refinement_iterations,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    19080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_api_port(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// RPC endpoints keyed by chain id
    #[serde(default)]
    pub rpc: BTreeMap<u64, RpcEndpoint>,

    #[serde(default)]
    pub quote: QuoteConfig,
}

impl AppConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Load from `$DEXROUTE_CONFIG`, falling back to `dexroute.json`
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }
}
