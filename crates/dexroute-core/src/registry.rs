//! Chain Registry
//!
//! Static per-chain DEX configuration, loaded once at startup from the
//! embedded `chains.json` (or any JSON document of the same shape) and
//! shared read-only afterwards.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_V3_FEE_TIERS, NATIVE_DECIMALS};
use crate::errors::{Error, Result, RouteError};
use crate::types::{Token, WrapAction};

const EMBEDDED_CHAINS: &str = include_str!("../data/chains.json");

/// Intermediate token used to connect otherwise unpaired tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeToken {
    pub name: String,
    pub address: Address,
    /// Stable-pool preference for Solidly-style routers
    #[serde(default)]
    pub stable: bool,
}

/// Which quoter ABI a concentrated-liquidity dex exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoterVersion {
    /// Uniswap QuoterV2, fee-tiered pools
    #[default]
    V2,
    /// Algebra quoter (one pool per pair, dynamic fee)
    Algebra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V2Dex {
    pub name: String,
    pub factory: Address,
    pub router: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3Dex {
    pub name: String,
    pub factory: Address,
    pub router: Address,
    pub quoter: Address,
    #[serde(default)]
    pub quoter_version: QuoterVersion,
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
}

fn default_fee_tiers() -> Vec<u32> {
    DEFAULT_V3_FEE_TIERS.to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidlyDex {
    pub name: String,
    pub factory: Address,
    pub router: Address,
}

/// One configured dex, tagged by protocol family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DexConfig {
    V2(V2Dex),
    V3(V3Dex),
    Solidly(SolidlyDex),
}

impl DexConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::V2(d) => &d.name,
            Self::V3(d) => &d.name,
            Self::Solidly(d) => &d.name,
        }
    }
}

/// Per-chain routing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    /// Decimals of the native currency, shared by its wrapped token
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    pub wrapped_native: Address,
    /// Contract used for deposit/withdraw of the native currency
    pub wrapped_native_router: Address,
    #[serde(default)]
    pub bridge_tokens: Vec<BridgeToken>,
    #[serde(default)]
    pub dexes: Vec<DexConfig>,
}

fn default_native_decimals() -> u8 {
    NATIVE_DECIMALS
}

impl ChainConfig {
    pub fn wrapped_token(&self) -> Token {
        Token::new(self.wrapped_native, self.native_decimals)
    }

    /// Map the native sentinel to the wrapped-native token
    pub fn substitute_native(&self, token: &Token) -> Token {
        if token.is_native() {
            self.wrapped_token()
        } else {
            *token
        }
    }

    /// `Some(action)` when the pair is native <-> wrapped-native, in either order
    pub fn wrap_action(&self, token_in: &Token, token_out: &Token) -> Option<WrapAction> {
        if token_in.is_native() && token_out.address == self.wrapped_native {
            Some(WrapAction::Deposit)
        } else if token_in.address == self.wrapped_native && token_out.is_native() {
            Some(WrapAction::Withdraw)
        } else {
            None
        }
    }

    pub fn v2_dexes(&self) -> impl Iterator<Item = &V2Dex> {
        self.dexes.iter().filter_map(|d| match d {
            DexConfig::V2(v2) => Some(v2),
            _ => None,
        })
    }

    /// V3 dexes using `version` quoters
    pub fn v3_dexes(&self, version: QuoterVersion) -> impl Iterator<Item = &V3Dex> {
        self.dexes.iter().filter_map(move |d| match d {
            DexConfig::V3(v3) if v3.quoter_version == version => Some(v3),
            _ => None,
        })
    }

    pub fn solidly_dex(&self) -> Option<&SolidlyDex> {
        self.dexes.iter().find_map(|d| match d {
            DexConfig::Solidly(s) => Some(s),
            _ => None,
        })
    }

    pub fn bridge_addresses(&self) -> Vec<Address> {
        self.bridge_tokens.iter().map(|b| b.address).collect()
    }
}

/// Read-only lookup of chain configurations by chain id
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// The registry compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CHAINS)
    }

    /// Parse a JSON array of chain configurations
    pub fn from_json(json: &str) -> Result<Self> {
        let list: Vec<ChainConfig> = serde_json::from_str(json)?;
        Self::from_chains(list)
    }

    pub fn from_chains(list: Vec<ChainConfig>) -> Result<Self> {
        let mut chains = HashMap::with_capacity(list.len());
        for chain in list {
            let id = chain.chain_id;
            if chains.insert(id, chain).is_some() {
                return Err(Error::Config(format!("duplicate chain id {id}")));
            }
        }
        Ok(Self { chains })
    }

    /// Look up a chain. Unknown chains and chains without any dex are
    /// both "routing unavailable".
    pub fn get(&self, chain_id: u64) -> std::result::Result<&ChainConfig, RouteError> {
        self.chains
            .get(&chain_id)
            .filter(|c| !c.dexes.is_empty())
            .ok_or(RouteError::ChainNotFound { chain_id })
    }

    /// Routable chains, sorted by id
    pub fn chains(&self) -> Vec<&ChainConfig> {
        let mut list: Vec<_> = self.chains.values().filter(|c| !c.dexes.is_empty()).collect();
        list.sort_by_key(|c| c.chain_id);
        list
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
