//! Core type definitions for dexroute

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::NATIVE_TOKEN_ADDRESS;

/// An ERC-20 token, or the native currency via the sentinel address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }

    /// The chain's native currency (18 decimals)
    pub fn native() -> Self {
        Self::new(NATIVE_TOKEN_ADDRESS, 18)
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN_ADDRESS
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "native")
        } else {
            write!(f, "{}", self.address)
        }
    }
}

/// Which side of the trade is fixed by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Amount in is known; maximise amount out
    ExactInput,
    /// Amount out is known; minimise amount in
    ExactOutput,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactInput => write!(f, "exact_input"),
            Self::ExactOutput => write!(f, "exact_output"),
        }
    }
}

/// DEX family a route was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DexFamily {
    WrappedContract,
    UniswapV2,
    Solidly,
    UniswapV3Single,
    UniswapV3Multi,
    AlgebraSingle,
    AlgebraMulti,
}

impl DexFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrappedContract => "WrappedContract",
            Self::UniswapV2 => "UniswapV2",
            Self::Solidly => "Solidly",
            Self::UniswapV3Single => "UniswapV3Single",
            Self::UniswapV3Multi => "UniswapV3Multi",
            Self::AlgebraSingle => "AlgebraSingle",
            Self::AlgebraMulti => "AlgebraMulti",
        }
    }
}

impl fmt::Display for DexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wrap-contract instruction for native <-> wrapped-native conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapAction {
    Deposit,
    Withdraw,
}

/// One hop through a Solidly-style router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolidlyHop {
    pub from: Address,
    pub to: Address,
    pub stable: bool,
    pub factory: Address,
}

/// Protocol-specific path representation handed to the query and execution adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathPayload {
    /// Ordered token list for a V2 router
    V2(Vec<Address>),
    /// Packed `token | fee(3) | token ...` path, in quoting order
    V3Multi(Bytes),
    V3Single {
        token_in: Address,
        token_out: Address,
        fee: u32,
    },
    /// Packed `token | token ...` path for Algebra quoters, in quoting order
    AlgebraMulti(Bytes),
    AlgebraSingle {
        token_in: Address,
        token_out: Address,
    },
    Solidly(Vec<SolidlyHop>),
    Wrap(WrapAction),
}

impl PathPayload {
    /// Number of swaps along the path (zero for wraps)
    pub fn hop_count(&self) -> usize {
        match self {
            Self::V2(tokens) => tokens.len().saturating_sub(1),
            Self::V3Multi(bytes) => crate::path::hop_count(bytes, true),
            Self::AlgebraMulti(bytes) => crate::path::hop_count(bytes, false),
            Self::V3Single { .. } | Self::AlgebraSingle { .. } => 1,
            Self::Solidly(hops) => hops.len(),
            Self::Wrap(_) => 0,
        }
    }
}
