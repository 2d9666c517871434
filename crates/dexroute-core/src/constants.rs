//! Protocol-wide constants

use alloy_primitives::{address, Address};

/// Sentinel address standing in for a chain's native currency
pub const NATIVE_TOKEN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Decimals of every wrapped-native token in the registry
pub const NATIVE_DECIMALS: u8 = 18;

/// Concentrated-liquidity fee tiers probed when a dex does not override them
pub const DEFAULT_V3_FEE_TIERS: [u32; 4] = [500, 1500, 3000, 10000];

/// Basis-point denominator
pub const BPS_DENOM: u64 = 10_000;

/// Acceptable distance between the refined and the requested output (1.5%)
pub const DEFAULT_TOLERANCE_BPS: u64 = 150;

/// Upper bound on exact-output refinement iterations
pub const DEFAULT_MAX_REFINEMENT_ITERATIONS: u32 = 10;

/// Default slippage applied to route bounds (0.5%)
pub const DEFAULT_SLIPPAGE_BPS: u64 = 50;
