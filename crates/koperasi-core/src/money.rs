//! Rounding and percentage helpers shared by the loan and allocation engines.
//!
//! Every engine rounds with the same rule: half-up to the nearest whole
//! monetary unit, applied at the moment a line or share is produced.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::{Money, Percent, Rate};

const HUNDRED: Decimal = dec!(100);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Round half-up (midpoint away from zero) to the nearest whole unit.
pub fn round_whole(amount: Money) -> Money {
    round_money(amount, 0)
}

/// Round half-up to `dp` decimal places.
pub fn round_money(amount: Money, dp: u32) -> Money {
    amount
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// 18 -> 0.18
pub fn percent_to_rate(percent: Percent) -> Rate {
    percent / HUNDRED
}

/// Monthly flat rate for an annual percentage: `annual / 100 / 12`.
pub fn monthly_flat_rate(annual_percent: Percent) -> Rate {
    percent_to_rate(annual_percent) / MONTHS_PER_YEAR
}

/// Sum of `amounts`, or `None` once the running total leaves the 96-bit range.
pub fn sum_money<'a>(amounts: impl IntoIterator<Item = &'a Money>) -> Option<Money> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
}

/// `amount * part / whole`, multiplying first so repeating fractions are
/// only cut once. Returns `None` when `whole` is zero or the product overflows.
pub fn proportion_of(amount: Money, part: Money, whole: Money) -> Option<Money> {
    if whole.is_zero() {
        return None;
    }
    amount.checked_mul(part)?.checked_div(whole)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_whole_half_up() {
        assert_eq!(round_whole(dec!(66666666.5)), dec!(66666667));
        assert_eq!(round_whole(dec!(111111111.11)), dec!(111111111));
        assert_eq!(round_whole(dec!(0.49)), dec!(0));
        assert_eq!(round_whole(dec!(2.5)), dec!(3));
    }

    #[test]
    fn test_round_money_keeps_scale_small() {
        assert_eq!(round_money(dec!(1.005), 2), dec!(1.01));
        assert_eq!(round_money(dec!(120000.000), 0).to_string(), "120000");
    }

    #[test]
    fn test_percent_conversions() {
        assert_eq!(percent_to_rate(dec!(18)), dec!(0.18));
        assert_eq!(monthly_flat_rate(dec!(12)), dec!(0.01));
        assert_eq!(monthly_flat_rate(dec!(18)), dec!(0.015));
        assert_eq!(monthly_flat_rate(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_proportion_of() {
        assert_eq!(
            proportion_of(dec!(200000000), dec!(5000000), dec!(45000000))
                .map(round_whole),
            Some(dec!(22222222))
        );
        assert_eq!(proportion_of(dec!(100), dec!(1), Decimal::ZERO), None);
    }

    #[test]
    fn test_sum_money() {
        let amounts = [dec!(1.5), dec!(2.5), dec!(-1)];
        assert_eq!(sum_money(&amounts), Some(dec!(3)));
        assert_eq!(sum_money(&Vec::<Money>::new()), Some(Decimal::ZERO));
    }

    #[test]
    fn test_sum_money_overflow() {
        let amounts = [Decimal::MAX, Decimal::ONE];
        assert_eq!(sum_money(&amounts), None);
    }
}
