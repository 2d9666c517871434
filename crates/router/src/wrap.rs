use alloy_primitives::U256;
use dexroute_core::{ChainConfig, DexFamily, PathPayload, Quote, WrapAction};

/// Name reported for the wrapped-native contract
pub const WRAPPED_CONTRACT_NAME: &str = "WrappedContract";

/// 1:1 deposit or withdraw through the chain's wrapped-native contract
pub fn wrap_quote(chain: &ChainConfig, action: WrapAction, amount: U256) -> Quote {
    Quote {
        family: DexFamily::WrappedContract,
        dex_name: WRAPPED_CONTRACT_NAME.to_string(),
        router: chain.wrapped_native_router,
        path: PathPayload::Wrap(action),
        amount,
        fee_tier: Some(0),
        pool_factory: None,
        simulated_out: None,
    }
}
