//! Packed path encoding for concentrated-liquidity quoters and routers
//!
//! Uniswap V3 paths alternate a 20-byte token address with a 3-byte fee:
//! `token0 | fee0 | token1 | fee1 | token2`. Algebra paths drop the fees
//! and pack addresses only. Exact-output quoting and swapping expects the
//! path reversed, starting from the output token.

use alloy_primitives::{Address, Bytes};

use crate::types::TradeDirection;

const ADDR_LEN: usize = 20;
const FEE_LEN: usize = 3;

/// Ordered tokens plus the fee of each leg between them
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HopSequence {
    pub tokens: Vec<Address>,
    /// One fee per leg, or empty for fee-less (Algebra) paths
    pub fees: Vec<u32>,
}

impl HopSequence {
    pub fn new(tokens: Vec<Address>, fees: Vec<u32>) -> Self {
        Self { tokens, fees }
    }

    pub fn without_fees(tokens: Vec<Address>) -> Self {
        Self {
            tokens,
            fees: Vec::new(),
        }
    }

    pub fn hop_count(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// True when no token appears twice
    pub fn is_acyclic(&self) -> bool {
        self.tokens
            .iter()
            .enumerate()
            .all(|(i, t)| !self.tokens[i + 1..].contains(t))
    }

    pub fn reversed(&self) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.reverse();
        let mut fees = self.fees.clone();
        fees.reverse();
        Self { tokens, fees }
    }

    /// Orient the sequence the way a quoter expects for `direction`
    pub fn oriented(&self, direction: TradeDirection) -> Self {
        match direction {
            TradeDirection::ExactInput => self.clone(),
            TradeDirection::ExactOutput => self.reversed(),
        }
    }

    /// Encode as `token | fee(3) | token ...`
    pub fn encode_v3(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.tokens.len() * ADDR_LEN + self.fees.len() * FEE_LEN);
        for (i, token) in self.tokens.iter().enumerate() {
            out.extend_from_slice(token.as_slice());
            if let Some(fee) = self.fees.get(i) {
                out.extend_from_slice(&fee.to_be_bytes()[1..]);
            }
        }
        Bytes::from(out)
    }

    /// Encode as `token | token ...`
    pub fn encode_algebra(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.tokens.len() * ADDR_LEN);
        for token in &self.tokens {
            out.extend_from_slice(token.as_slice());
        }
        Bytes::from(out)
    }
}

/// Decode a fee-tiered V3 path. Returns `None` on malformed lengths.
pub fn decode_v3(bytes: &[u8]) -> Option<HopSequence> {
    if bytes.len() < ADDR_LEN || (bytes.len() - ADDR_LEN) % (ADDR_LEN + FEE_LEN) != 0 {
        return None;
    }
    let legs = (bytes.len() - ADDR_LEN) / (ADDR_LEN + FEE_LEN);
    let mut tokens = Vec::with_capacity(legs + 1);
    let mut fees = Vec::with_capacity(legs);
    let mut offset = 0;
    tokens.push(Address::from_slice(&bytes[..ADDR_LEN]));
    offset += ADDR_LEN;
    for _ in 0..legs {
        let fee = &bytes[offset..offset + FEE_LEN];
        fees.push(u32::from_be_bytes([0, fee[0], fee[1], fee[2]]));
        offset += FEE_LEN;
        tokens.push(Address::from_slice(&bytes[offset..offset + ADDR_LEN]));
        offset += ADDR_LEN;
    }
    Some(HopSequence { tokens, fees })
}

/// Decode a fee-less Algebra path. Returns `None` on malformed lengths.
pub fn decode_algebra(bytes: &[u8]) -> Option<HopSequence> {
    if bytes.is_empty() || bytes.len() % ADDR_LEN != 0 {
        return None;
    }
    Some(HopSequence::without_fees(
        bytes.chunks(ADDR_LEN).map(Address::from_slice).collect(),
    ))
}

pub(crate) fn hop_count(bytes: &[u8], with_fees: bool) -> usize {
    let decoded = if with_fees {
        decode_v3(bytes)
    } else {
        decode_algebra(bytes)
    };
    decoded.map(|seq| seq.hop_count()).unwrap_or(0)
}
