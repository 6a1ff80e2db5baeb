//! Common utility functions for projection calculations.
//!
//! Rounding, clamping, and compounding helpers shared by the tax, benefit,
//! account, and simulation modules.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use retire_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps negative values to zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use retire_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-5)), dec!(0));
/// assert_eq!(non_negative(dec!(5)), dec!(5));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Growth factor `(1 + rate)^years`, by repeated multiplication.
///
/// ```
/// use rust_decimal_macros::dec;
/// use retire_core::calculations::common::compound_factor;
///
/// assert_eq!(compound_factor(dec!(0.10), 2), dec!(1.21));
/// assert_eq!(compound_factor(dec!(0.10), 0), dec!(1));
/// ```
pub fn compound_factor(
    rate: Decimal,
    years: u32,
) -> Decimal {
    let base = Decimal::ONE + rate;
    (0..years).fold(Decimal::ONE, |acc, _| acc * base)
}

/// Like [`compound_factor`], but `None` once the factor no longer fits in a
/// `Decimal`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use retire_core::calculations::common::checked_compound_factor;
///
/// assert_eq!(checked_compound_factor(dec!(0.10), 2), Some(dec!(1.21)));
/// assert_eq!(checked_compound_factor(dec!(3), 80), None);
/// ```
pub fn checked_compound_factor(
    rate: Decimal,
    years: u32,
) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    (0..years).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(base))
}

/// Indexes `base_amount` from `start_age` to `age`:
/// `base_amount × (1 + rate)^(age − start_age)`.
///
/// Ages before `start_age` return the base amount unindexed.
pub fn indexed_amount(
    base_amount: Decimal,
    rate: Decimal,
    start_age: u32,
    age: u32,
) -> Decimal {
    base_amount * compound_factor(rate, age.saturating_sub(start_age))
}
