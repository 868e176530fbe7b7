//! Common utility functions for payroll calculations.
//!
//! Rounding and percentage helpers shared by the tax engine, the schedule
//! validator and the presentation layer.

use rust_decimal::{Decimal, RoundingStrategy};

/// Smallest currency unit (one toea).
pub const CURRENCY_UNIT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_currency;
///
/// assert_eq!(round_currency(dec!(958.3333)), dec!(958.33));
/// assert_eq!(round_currency(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_currency(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Applies a percentage rate (`22` means 22%) to an amount.
///
/// Returns `None` when the product leaves `Decimal`'s range.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of(dec!(7500), dec!(22)), Some(dec!(1650)));
/// ```
pub fn percent_of(
    amount: Decimal,
    rate: Decimal,
) -> Option<Decimal> {
    amount.checked_mul(rate)?.checked_div(Decimal::ONE_HUNDRED)
}
