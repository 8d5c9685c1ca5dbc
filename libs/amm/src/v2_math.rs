//! Constant-product ("x*y=k") AMM math over `U256`.
//!
//! Every amount here is an atomic-unit integer; there is no implicit
//! decimal scaling. Division rounds toward zero except where documented.

use crate::error::MathError;
use primitive_types::U256;

/// Basis-point denominator (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Result of a swap quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutput {
    pub amount_out: U256,
    pub fee_amount: U256,
    /// Price impact in basis points, floor-rounded.
    pub price_impact_bps: u32,
}

/// Pure V2 constant-product math. Stateless; every function takes its
/// reserves and fee as arguments.
pub struct V2Math;

impl V2Math {
    /// `amount_in * (10_000 - fee_bps) / 10_000`, floor.
    fn amount_after_fee(amount_in: U256, total_fee_bps: u32) -> Result<U256, MathError> {
        if total_fee_bps > BPS_DENOMINATOR {
            return Err(MathError::OutOfRange {
                value: total_fee_bps,
                min: 0,
                max: BPS_DENOMINATOR,
            });
        }
        let multiplier = U256::from(BPS_DENOMINATOR - total_fee_bps);
        Ok(amount_in * multiplier / U256::from(BPS_DENOMINATOR))
    }

    /// `swap_output` per §4.1: computes `amount_out`, `fee_amount`, and the
    /// price impact of the trade, all from the reserves at quote time.
    ///
    /// Edge cases: empty reserves fail with [`MathError::EmptyReserves`];
    /// `amount_in == 0` returns a zero-amount, zero-impact result.
    pub fn swap_output(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        total_fee_bps: u32,
    ) -> Result<SwapOutput, MathError> {
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(MathError::EmptyReserves {
                reserve_in: reserve_in.to_string(),
                reserve_out: reserve_out.to_string(),
            });
        }
        if amount_in.is_zero() {
            return Ok(SwapOutput {
                amount_out: U256::zero(),
                fee_amount: U256::zero(),
                price_impact_bps: 0,
            });
        }

        let amount_in_after_fee = Self::amount_after_fee(amount_in, total_fee_bps)?;
        let denominator = reserve_in + amount_in_after_fee;
        let amount_out = reserve_out * amount_in_after_fee / denominator;
        let fee_amount = amount_in * U256::from(total_fee_bps) / U256::from(BPS_DENOMINATOR);

        // price_before = reserve_out / reserve_in, price_after = (reserve_out -
        // amount_out) / (reserve_in + amount_in_after_fee). Cross-multiplied to
        // stay exact in integer arithmetic; see derivation in module tests.
        let diff_numerator = reserve_out * amount_in_after_fee + reserve_in * amount_out;
        let impact_denominator = denominator * reserve_out;
        let price_impact_bps = if impact_denominator.is_zero() {
            0
        } else {
            let bps = diff_numerator * U256::from(BPS_DENOMINATOR) / impact_denominator;
            bps.try_into().unwrap_or(u32::MAX)
        };

        Ok(SwapOutput {
            amount_out,
            fee_amount,
            price_impact_bps,
        })
    }

    /// `fee_split` per §4.1: splits `amount_in` into the portion retained by
    /// the treasury (`protocol_fee`) and the portion forwarded to the pool
    /// (`amount_to_pool`).
    pub fn fee_split(amount_in: U256, protocol_fee_bps: u32) -> Result<(U256, U256), MathError> {
        if protocol_fee_bps > BPS_DENOMINATOR {
            return Err(MathError::OutOfRange {
                value: protocol_fee_bps,
                min: 0,
                max: BPS_DENOMINATOR,
            });
        }
        let protocol_fee = amount_in * U256::from(protocol_fee_bps) / U256::from(BPS_DENOMINATOR);
        let amount_to_pool = amount_in - protocol_fee;
        Ok((protocol_fee, amount_to_pool))
    }

    /// `optimal_liquidity` per §4.1: given desired deposit amounts and the
    /// current reserves, returns the amounts that preserve the reserve
    /// ratio, rounding the complementary amount up so a deposit never
    /// shortchanges existing LPs.
    pub fn optimal_liquidity(
        a_desired: U256,
        b_desired: U256,
        reserve_a: U256,
        reserve_b: U256,
    ) -> Result<(U256, U256), MathError> {
        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((a_desired, b_desired));
        }

        let b_needed = ceil_div(a_desired * reserve_b, reserve_a);
        if b_needed <= b_desired {
            return Ok((a_desired, b_needed));
        }
        let a_needed = ceil_div(b_desired * reserve_a, reserve_b);
        Ok((a_needed, b_desired))
    }

    /// `lp_to_mint` per §4.1. `minimum_liquidity` is the permanently-burned
    /// lock subtracted from the very first mint.
    pub fn lp_to_mint(
        a: U256,
        b: U256,
        reserve_a: U256,
        reserve_b: U256,
        total_shares: U256,
        minimum_liquidity: U256,
    ) -> Result<U256, MathError> {
        if total_shares.is_zero() {
            let minted = isqrt(a * b);
            return Ok(minted.saturating_sub(minimum_liquidity));
        }
        let share_a = a * total_shares / reserve_a;
        let share_b = b * total_shares / reserve_b;
        Ok(share_a.min(share_b))
    }

    /// `burn_to_amounts` per §4.1, floor division.
    pub fn burn_to_amounts(
        shares: U256,
        total_shares: U256,
        reserve_a: U256,
        reserve_b: U256,
    ) -> Result<(U256, U256), MathError> {
        if total_shares.is_zero() {
            return Err(MathError::ZeroTotalShares);
        }
        let a = shares * reserve_a / total_shares;
        let b = shares * reserve_b / total_shares;
        Ok((a, b))
    }

    /// `min_amount_out` per §4.1. `slippage_percent` is a human percentage
    /// (e.g. `0.5` for 0.5%); converted to basis points by rounding.
    pub fn min_amount_out(amount_out: U256, slippage_percent: f64) -> Result<U256, MathError> {
        if !(0.0..=100.0).contains(&slippage_percent) {
            return Err(MathError::OutOfRange {
                value: slippage_percent as u32,
                min: 0,
                max: 100,
            });
        }
        let slippage_bps = (slippage_percent * 100.0).round() as u32;
        let slippage_bps = slippage_bps.min(BPS_DENOMINATOR);
        Ok(amount_out * U256::from(BPS_DENOMINATOR - slippage_bps) / U256::from(BPS_DENOMINATOR))
    }
}

/// Ceiling division for non-negative `U256` operands.
fn ceil_div(numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let (quotient, remainder) = numerator.div_mod(denominator);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    }
}

/// Integer square root (floor), via the `uint` crate's Newton's-method
/// implementation.
fn isqrt(value: U256) -> U256 {
    value.integer_sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_output_literal_scenario() {
        // S1: reserveA = 1e12, reserveB = 2e12, swap 1e10 TKA in, 30 bps total fee.
        let reserve_a = U256::from(1_000_000_000_000u64);
        let reserve_b = U256::from(2_000_000_000_000u64);
        let amount_in = U256::from(10_000_000_000u64);

        let result = V2Math::swap_output(amount_in, reserve_a, reserve_b, 30).unwrap();

        assert_eq!(result.fee_amount, U256::from(30_000_000u64));
        // amount_in_after_fee = 9_970_000_000
        let expected_out = U256::from(2_000_000_000_000u64) * U256::from(9_970_000_000u64)
            / (U256::from(1_000_000_000_000u64) + U256::from(9_970_000_000u64));
        assert_eq!(result.amount_out, expected_out);
    }

    #[test]
    fn swap_output_zero_amount_is_zero_impact() {
        let r = V2Math::swap_output(U256::zero(), U256::from(100), U256::from(100), 30).unwrap();
        assert_eq!(r.amount_out, U256::zero());
        assert_eq!(r.price_impact_bps, 0);
    }

    #[test]
    fn swap_output_empty_reserves_fails() {
        let err =
            V2Math::swap_output(U256::from(1), U256::zero(), U256::from(100), 30).unwrap_err();
        assert!(matches!(err, MathError::EmptyReserves { .. }));
    }

    #[test]
    fn fee_split_matches_spec_bps() {
        let (protocol_fee, to_pool) =
            V2Math::fee_split(U256::from(10_000_000_000u64), 5).unwrap();
        assert_eq!(protocol_fee, U256::from(5_000_000u64));
        assert_eq!(to_pool, U256::from(9_995_000_000u64));
    }

    #[test]
    fn optimal_liquidity_empty_pool_returns_inputs() {
        let (a, b) =
            V2Math::optimal_liquidity(U256::from(100), U256::from(400), U256::zero(), U256::zero())
                .unwrap();
        assert_eq!(a, U256::from(100));
        assert_eq!(b, U256::from(400));
    }

    #[test]
    fn optimal_liquidity_respects_ratio() {
        // reserves 1_000_000 : 4_000_000, desired 500_000 A -> needs 2_000_000 B.
        let (a, b) = V2Math::optimal_liquidity(
            U256::from(500_000u64),
            U256::from(10_000_000u64),
            U256::from(1_000_000u64),
            U256::from(4_000_000u64),
        )
        .unwrap();
        assert_eq!(a, U256::from(500_000u64));
        assert_eq!(b, U256::from(2_000_000u64));
    }

    #[test]
    fn lp_to_mint_first_deposit_matches_isqrt_minus_lock() {
        let minted = V2Math::lp_to_mint(
            U256::from(1_000_000u64),
            U256::from(4_000_000u64),
            U256::zero(),
            U256::zero(),
            U256::zero(),
            U256::from(1_000u64),
        )
        .unwrap();
        // isqrt(4e12) = 2_000_000
        assert_eq!(minted, U256::from(2_000_000u64 - 1_000));
    }

    #[test]
    fn lp_to_mint_subsequent_deposit_takes_minimum_share() {
        // reserves (1_000_000, 4_000_000), total_shares S, deposit 500_000 A / 2_000_000 B.
        let total_shares = U256::from(2_000_000u64);
        let minted = V2Math::lp_to_mint(
            U256::from(500_000u64),
            U256::from(2_000_000u64),
            U256::from(1_000_000u64),
            U256::from(4_000_000u64),
            total_shares,
            U256::zero(),
        )
        .unwrap();
        assert_eq!(minted, total_shares / 2);
    }

    #[test]
    fn burn_to_amounts_is_proportional() {
        let (a, b) = V2Math::burn_to_amounts(
            U256::from(1_000_000u64),
            U256::from(2_000_000u64),
            U256::from(1_000_000u64),
            U256::from(4_000_000u64),
        )
        .unwrap();
        assert_eq!(a, U256::from(500_000u64));
        assert_eq!(b, U256::from(2_000_000u64));
    }

    #[test]
    fn min_amount_out_boundaries() {
        let out = U256::from(1_000_000u64);
        assert_eq!(V2Math::min_amount_out(out, 0.0).unwrap(), out);
        assert_eq!(V2Math::min_amount_out(out, 100.0).unwrap(), U256::zero());
    }

    proptest::proptest! {
        #[test]
        fn p1_product_never_falls(
            reserve_a in 1_000u64..1_000_000_000_000u64,
            reserve_b in 1_000u64..1_000_000_000_000u64,
            amount_in in 1u64..10_000_000_000u64,
            fee_bps in 0u32..=1000u32,
        ) {
            let reserve_a = U256::from(reserve_a);
            let reserve_b = U256::from(reserve_b);
            let amount_in = U256::from(amount_in);
            let result = V2Math::swap_output(amount_in, reserve_a, reserve_b, fee_bps).unwrap();
            let amount_in_after_fee = amount_in * U256::from(BPS_DENOMINATOR - fee_bps) / U256::from(BPS_DENOMINATOR);
            let k_before = reserve_a * reserve_b;
            let k_after = (reserve_a + amount_in_after_fee) * (reserve_b - result.amount_out);
            prop_assert!(k_after >= k_before);
        }

        #[test]
        fn p5_quote_is_deterministic(
            reserve_a in 1_000u64..1_000_000_000_000u64,
            reserve_b in 1_000u64..1_000_000_000_000u64,
            amount_in in 1u64..10_000_000_000u64,
            fee_bps in 0u32..=1000u32,
        ) {
            let reserve_a = U256::from(reserve_a);
            let reserve_b = U256::from(reserve_b);
            let amount_in = U256::from(amount_in);
            let first = V2Math::swap_output(amount_in, reserve_a, reserve_b, fee_bps).unwrap();
            let second = V2Math::swap_output(amount_in, reserve_a, reserve_b, fee_bps).unwrap();
            prop_assert_eq!(first.amount_out, second.amount_out);
        }
    }

    #[test]
    fn product_floor_holds_after_swap() {
        let reserve_a = U256::from(1_000_000_000_000u64);
        let reserve_b = U256::from(2_000_000_000_000u64);
        let amount_in = U256::from(10_000_000_000u64);

        let result = V2Math::swap_output(amount_in, reserve_a, reserve_b, 30).unwrap();
        let amount_in_after_fee = U256::from(9_970_000_000u64);
        let k_before = reserve_a * reserve_b;
        let k_after = (reserve_a + amount_in_after_fee) * (reserve_b - result.amount_out);
        assert!(k_after >= k_before);
    }
}
