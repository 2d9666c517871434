//! Amount math
//!
//! Decimal parsing, ratio scaling and constant-product swap math. Anything
//! that multiplies two on-chain amounts goes through `BigUint` so that the
//! intermediate product can exceed 256 bits.

use alloy_primitives::U256;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::constants::BPS_DENOM;
use crate::errors::RouteError;

/// Fee denominator for parts-per-million fees (V3 tiers, `3000` = 0.3%)
pub const FEE_PPM_DENOM: u32 = 1_000_000;

pub fn to_big(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

/// Convert back to `U256`; `None` on overflow
pub fn from_big(value: &BigUint) -> Option<U256> {
    U256::try_from_be_slice(&value.to_bytes_be())
}

/// Parse a human decimal amount ("2.5") into smallest units.
///
/// Fraction digits beyond `decimals` are truncated.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, RouteError> {
    let invalid = |message: &str| RouteError::InvalidAmount {
        message: format!("{message}: {amount:?}"),
    };

    let trimmed = amount.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("empty amount"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("not a non-negative decimal"));
    }

    let scale = decimals as usize;
    let mut digits = String::with_capacity(int_part.len() + scale);
    digits.push_str(int_part);
    if frac_part.len() >= scale {
        digits.push_str(&frac_part[..scale]);
    } else {
        digits.push_str(frac_part);
        digits.extend(std::iter::repeat('0').take(scale - frac_part.len()));
    }
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    let value = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| invalid("unparseable"))?;
    from_big(&value).ok_or_else(|| invalid("exceeds 256 bits"))
}

/// Render smallest units as a decimal string, trimming trailing zeros
pub fn format_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let scale = decimals as usize;
    if scale == 0 {
        return raw;
    }
    let padded = if raw.len() <= scale {
        format!("{}{}", "0".repeat(scale - raw.len() + 1), raw)
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// `a * b / d` in arbitrary precision. `None` when `d` is zero or the result overflows.
pub fn mul_div(a: U256, b: U256, d: U256) -> Option<U256> {
    if d.is_zero() {
        return None;
    }
    from_big(&(to_big(a) * to_big(b) / to_big(d)))
}

/// Whether `actual` lies within `tolerance_bps` of `desired`
pub fn within_tolerance(actual: U256, desired: U256, tolerance_bps: u64) -> bool {
    if desired.is_zero() {
        return actual.is_zero();
    }
    let diff = if actual > desired {
        actual - desired
    } else {
        desired - actual
    };
    to_big(diff) * BigUint::from(BPS_DENOM) <= to_big(desired) * BigUint::from(tolerance_bps)
}

/// Lower bound on output after slippage
pub fn apply_slippage_down(amount: U256, slippage_bps: u64) -> U256 {
    let keep = BPS_DENOM.saturating_sub(slippage_bps);
    mul_div(amount, U256::from(keep), U256::from(BPS_DENOM)).unwrap_or(U256::ZERO)
}

/// Upper bound on input after slippage (rounded up)
pub fn apply_slippage_up(amount: U256, slippage_bps: u64) -> U256 {
    let num = to_big(amount) * BigUint::from(BPS_DENOM + slippage_bps);
    let denom = BigUint::from(BPS_DENOM);
    let rounded = (num + &denom - BigUint::from(1u8)) / denom;
    from_big(&rounded).unwrap_or(U256::MAX)
}

/// Constant-product output for `amount_in`, fee in parts per million.
///
/// Formula: out = (reserve_out * in * (1e6 - fee)) / (reserve_in * 1e6 + in * (1e6 - fee))
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_ppm: u32) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let fee_num = BigUint::from(FEE_PPM_DENOM.saturating_sub(fee_ppm));
    let in_with_fee = to_big(amount_in) * fee_num;
    let numerator = to_big(reserve_out) * &in_with_fee;
    let denominator = to_big(reserve_in) * BigUint::from(FEE_PPM_DENOM) + in_with_fee;
    if denominator.is_zero() {
        return U256::ZERO;
    }
    from_big(&(numerator / denominator)).unwrap_or(U256::ZERO)
}

/// Constant-product input required for `amount_out` (rounded up).
///
/// `None` if the pool cannot supply `amount_out`.
pub fn amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256, fee_ppm: u32) -> Option<U256> {
    if amount_out.is_zero() || reserve_in.is_zero() || amount_out >= reserve_out {
        return None;
    }
    let fee_num = FEE_PPM_DENOM.saturating_sub(fee_ppm);
    if fee_num == 0 {
        return None;
    }
    let numerator = to_big(reserve_in) * to_big(amount_out) * BigUint::from(FEE_PPM_DENOM);
    let denominator = to_big(reserve_out - amount_out) * BigUint::from(fee_num);
    from_big(&(numerator / denominator + BigUint::from(1u8)))
}
