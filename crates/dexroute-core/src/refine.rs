//! Exact-output search over an exact-input-only quoting primitive
//!
//! Start from the reference price, simulate, rescale by desired/actual and
//! repeat until the simulated output is within tolerance. Iterations are
//! sequential and capped.

use std::future::Future;

use alloy_primitives::U256;
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_REFINEMENT_ITERATIONS, DEFAULT_TOLERANCE_BPS};
use crate::math::{mul_div, within_tolerance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineParams {
    pub tolerance_bps: u64,
    pub max_iterations: u32,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            tolerance_bps: DEFAULT_TOLERANCE_BPS,
            max_iterations: DEFAULT_MAX_REFINEMENT_ITERATIONS,
        }
    }
}

/// A converged estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refined {
    pub amount_in: U256,
    /// Simulated output at `amount_in`
    pub amount_out: U256,
    pub iterations: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefineError {
    #[error("reference quote is zero")]
    NoReference,

    #[error("simulation returned no output at {amount_in}")]
    NoLiquidity { amount_in: U256 },

    #[error("did not converge within {iterations} iterations")]
    NotConverged { iterations: u32 },
}

/// Find the input that yields `desired_out`, given one reference quote
/// (`reference_in` -> `reference_out`) and an exact-input simulator.
pub async fn refine_exact_output<F, Fut>(
    desired_out: U256,
    reference_in: U256,
    reference_out: U256,
    params: RefineParams,
    mut simulate: F,
) -> Result<Refined, RefineError>
where
    F: FnMut(U256) -> Fut,
    Fut: Future<Output = Option<U256>>,
{
    let mut estimate =
        mul_div(desired_out, reference_in, reference_out).ok_or(RefineError::NoReference)?;

    for iteration in 1..=params.max_iterations {
        if estimate.is_zero() {
            estimate = U256::from(1u8);
        }
        let actual = match simulate(estimate).await {
            Some(out) if !out.is_zero() => out,
            _ => return Err(RefineError::NoLiquidity { amount_in: estimate }),
        };
        if within_tolerance(actual, desired_out, params.tolerance_bps) {
            return Ok(Refined {
                amount_in: estimate,
                amount_out: actual,
                iterations: iteration,
            });
        }
        estimate = mul_div(estimate, desired_out, actual)
            .ok_or(RefineError::NoLiquidity { amount_in: estimate })?;
    }

    Err(RefineError::NotConverged {
        iterations: params.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::amount_out;
    use std::cell::Cell;

    fn e18(v: u64) -> U256 {
        U256::from(v) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[tokio::test]
    async fn test_linear_price_converges_immediately() {
        let calls = Cell::new(0u32);
        let refined = refine_exact_output(e18(5), e18(1), e18(2), RefineParams::default(), |x| {
            calls.set(calls.get() + 1);
            async move { Some(x * U256::from(2u8)) }
        })
        .await
        .unwrap();
        assert_eq!(refined.amount_in, e18(5) / U256::from(2u8));
        assert_eq!(refined.iterations, 1);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_constant_product_curve_converges() {
        let (r_in, r_out) = (e18(1_000), e18(2_000));
        let sim = |x: U256| async move { Some(amount_out(x, r_in, r_out, 3000)) };
        let reference_out = amount_out(e18(1), r_in, r_out, 3000);
        let desired = e18(300);
        let refined = refine_exact_output(desired, e18(1), reference_out, RefineParams::default(), sim)
            .await
            .unwrap();
        assert!(within_tolerance(refined.amount_out, desired, 150));
        assert!(refined.iterations > 1);
        assert!(refined.iterations <= 10);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let calls = Cell::new(0u32);
        // Output oscillates far away from any target
        let result = refine_exact_output(
            e18(100),
            e18(1),
            e18(1),
            RefineParams {
                tolerance_bps: 150,
                max_iterations: 10,
            },
            |_| {
                let n = calls.get() + 1;
                calls.set(n);
                async move { Some(if n % 2 == 0 { e18(1) } else { e18(10_000) }) }
            },
        )
        .await;
        assert_eq!(result, Err(RefineError::NotConverged { iterations: 10 }));
        assert_eq!(calls.get(), 10);
    }

    #[tokio::test]
    async fn test_failed_simulation_is_no_liquidity() {
        let result =
            refine_exact_output(e18(1), e18(1), e18(1), RefineParams::default(), |_| async {
                None
            })
            .await;
        assert!(matches!(result, Err(RefineError::NoLiquidity { .. })));

        let result =
            refine_exact_output(e18(1), e18(1), U256::ZERO, RefineParams::default(), |_| async {
                Some(e18(1))
            })
            .await;
        assert_eq!(result, Err(RefineError::NoReference));
    }
}
