use alloy_primitives::Address;

/// Direct path, every one-bridge path and every ordered two-bridge path.
///
/// `bridges` must already exclude the pair's own tokens (see
/// [`dexroute_core::PairRequest::usable_bridges`]), so no path revisits a token.
pub fn candidate_paths(token_in: Address, token_out: Address, bridges: &[Address]) -> Vec<Vec<Address>> {
    let mut paths = Vec::with_capacity(1 + bridges.len() * bridges.len());
    paths.push(vec![token_in, token_out]);

    for &b in bridges {
        paths.push(vec![token_in, b, token_out]);
    }
    for &first in bridges {
        for &second in bridges {
            if first != second {
                paths.push(vec![token_in, first, second, token_out]);
            }
        }
    }
    paths
}
