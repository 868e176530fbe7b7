//! Bracket-table checks.
//!
//! A table authored by an administrator is only usable by the tax engine if
//! its rows are ordered, contiguous and carry a `base_tax` that agrees with
//! the rows below it. [`validate_schedule`] enforces that before a table is
//! stored, and [`derive_base_tax`] rebuilds the cumulative column.

use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::TaxBracket;
use crate::calculations::common::{CURRENCY_UNIT, percent_of};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("tax bracket table is empty")]
    Empty,

    #[error("table mixes tax years {0} and {1}")]
    MixedTaxYears(i32, i32),

    #[error("bracket number {0} must be positive")]
    InvalidBracketNumber(i32),

    #[error("bracket number {0} appears more than once")]
    DuplicateBracketNumber(i32),

    #[error("bracket {0} is out of order: min_income must ascend")]
    OutOfOrder(i32),

    #[error("bracket {0} has a negative amount")]
    NegativeAmount(i32),

    #[error("bracket {bracket} rate {rate} is outside 0-100")]
    RateOutOfRange { bracket: i32, rate: Decimal },

    #[error("bracket {0} max_income must exceed min_income")]
    EmptyRange(i32),

    #[error("bracket {bracket} starts at {found}, expected {expected}")]
    NotContiguous {
        bracket: i32,
        expected: Decimal,
        found: Decimal,
    },

    #[error("bracket {0} has no upper limit but is not the last bracket")]
    UnboundedNotLast(i32),

    #[error("the last bracket must have no upper limit")]
    MissingUnboundedBracket,

    #[error("bracket {bracket} base_tax is {found}, lower brackets add up to {expected}")]
    BaseTaxMismatch {
        bracket: i32,
        expected: Decimal,
        found: Decimal,
    },
}

/// Checks that `brackets` form a well-formed table for a single tax year.
///
/// Rows must arrive sorted by `min_income`. Consecutive rows may either
/// share a boundary or be one currency unit apart.
pub fn validate_schedule(brackets: &[TaxBracket]) -> Result<(), ScheduleError> {
    let first = brackets.first().ok_or(ScheduleError::Empty)?;
    let mut seen = HashSet::new();

    for (idx, bracket) in brackets.iter().enumerate() {
        let number = bracket.bracket_number;

        if bracket.tax_year != first.tax_year {
            return Err(ScheduleError::MixedTaxYears(first.tax_year, bracket.tax_year));
        }
        if number <= 0 {
            return Err(ScheduleError::InvalidBracketNumber(number));
        }
        if !seen.insert(number) {
            return Err(ScheduleError::DuplicateBracketNumber(number));
        }
        if bracket.min_income < Decimal::ZERO || bracket.base_tax < Decimal::ZERO {
            return Err(ScheduleError::NegativeAmount(number));
        }
        if bracket.tax_rate < Decimal::ZERO || bracket.tax_rate > Decimal::ONE_HUNDRED {
            return Err(ScheduleError::RateOutOfRange {
                bracket: number,
                rate: bracket.tax_rate,
            });
        }

        let is_last = idx + 1 == brackets.len();
        match bracket.max_income {
            Some(max) if max <= bracket.min_income => return Err(ScheduleError::EmptyRange(number)),
            Some(_) if is_last => return Err(ScheduleError::MissingUnboundedBracket),
            None if !is_last => return Err(ScheduleError::UnboundedNotLast(number)),
            _ => {}
        }

        if let Some(prev) = idx.checked_sub(1).map(|i| &brackets[i]) {
            check_contiguous(prev, bracket)?;
        }
    }

    for (bracket, expected) in brackets.iter().zip(derive_base_tax(brackets)) {
        if bracket.base_tax != expected {
            return Err(ScheduleError::BaseTaxMismatch {
                bracket: bracket.bracket_number,
                expected,
                found: bracket.base_tax,
            });
        }
    }

    Ok(())
}

fn check_contiguous(
    prev: &TaxBracket,
    next: &TaxBracket,
) -> Result<(), ScheduleError> {
    if next.min_income <= prev.min_income {
        return Err(ScheduleError::OutOfOrder(next.bracket_number));
    }
    // `prev` is bounded here: an unbounded non-last row is rejected first.
    let Some(prev_max) = prev.max_income else {
        return Err(ScheduleError::UnboundedNotLast(prev.bracket_number));
    };
    if next.min_income != prev_max && prev_max.checked_add(CURRENCY_UNIT) != Some(next.min_income) {
        return Err(ScheduleError::NotContiguous {
            bracket: next.bracket_number,
            expected: prev_max,
            found: next.min_income,
        });
    }
    Ok(())
}

/// Cumulative tax owed below each bracket's `min_income`, in table order.
///
/// The first entry is always zero; each later entry adds the full-width
/// tax of the bracket before it.
pub fn derive_base_tax(brackets: &[TaxBracket]) -> Vec<Decimal> {
    let mut running = Decimal::ZERO;
    brackets
        .iter()
        .map(|bracket| {
            let base = running;
            if let Some(width) = bracket.width() {
                // Saturates so an absurd row fails the base-tax comparison.
                running = percent_of(width, bracket.tax_rate)
                    .map_or(Decimal::MAX, |tax| running.saturating_add(tax));
            }
            base
        })
        .collect()
}

/// Active rows for `tax_year`, sorted ascending by `min_income`.
pub fn active_brackets(
    brackets: &[TaxBracket],
    tax_year: i32,
) -> Vec<TaxBracket> {
    let mut active: Vec<TaxBracket> = brackets
        .iter()
        .filter(|b| b.is_active && b.tax_year == tax_year)
        .cloned()
        .collect();
    active.sort_by(|a, b| a.min_income.cmp(&b.min_income));
    active
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn bracket(
        number: i32,
        min: Decimal,
        max: Option<Decimal>,
        rate: Decimal,
        base: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            tax_year: 2025,
            bracket_number: number,
            min_income: min,
            max_income: max,
            tax_rate: rate,
            base_tax: base,
            is_active: true,
        }
    }

    fn valid_table() -> Vec<TaxBracket> {
        vec![
            bracket(1, dec!(0), Some(dec!(12500)), dec!(0), dec!(0)),
            bracket(2, dec!(12500), Some(dec!(20000)), dec!(22), dec!(0)),
            bracket(3, dec!(20000), Some(dec!(33000)), dec!(30), dec!(1650)),
            bracket(4, dec!(33000), Some(dec!(70000)), dec!(35), dec!(5550)),
            bracket(5, dec!(70000), Some(dec!(250000)), dec!(40), dec!(18500)),
            bracket(6, dec!(250000), None, dec!(42), dec!(90500)),
        ]
    }

    #[test]
    fn accepts_valid_table() {
        assert_eq!(validate_schedule(&valid_table()), Ok(()));
    }

    #[test]
    fn accepts_one_toea_gap() {
        let mut table = valid_table();
        table[1].min_income = dec!(12500.01);
        // Width shrinks by 0.01 at 22%.
        for b in table.iter_mut().skip(2) {
            b.base_tax -= dec!(0.0022);
        }

        assert_eq!(validate_schedule(&table), Ok(()));
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(validate_schedule(&[]), Err(ScheduleError::Empty));
    }

    #[test]
    fn rejects_mixed_years() {
        let mut table = valid_table();
        table[3].tax_year = 2024;

        assert_eq!(validate_schedule(&table), Err(ScheduleError::MixedTaxYears(2025, 2024)));
    }

    #[test]
    fn rejects_duplicate_bracket_number() {
        let mut table = valid_table();
        table[2].bracket_number = 2;

        assert_eq!(validate_schedule(&table), Err(ScheduleError::DuplicateBracketNumber(2)));
    }

    #[test]
    fn rejects_zero_bracket_number() {
        let mut table = valid_table();
        table[0].bracket_number = 0;

        assert_eq!(validate_schedule(&table), Err(ScheduleError::InvalidBracketNumber(0)));
    }

    #[test]
    fn rejects_rate_above_hundred() {
        let mut table = valid_table();
        table[5].tax_rate = dec!(142);

        assert_eq!(
            validate_schedule(&table),
            Err(ScheduleError::RateOutOfRange {
                bracket: 6,
                rate: dec!(142)
            })
        );
    }

    #[test]
    fn rejects_gap_between_brackets() {
        let mut table = valid_table();
        table[2].min_income = dec!(20100);

        assert_eq!(
            validate_schedule(&table),
            Err(ScheduleError::NotContiguous {
                bracket: 3,
                expected: dec!(20000),
                found: dec!(20100),
            })
        );
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let mut table = valid_table();
        table[1].min_income = dec!(0);

        assert_eq!(validate_schedule(&table), Err(ScheduleError::OutOfOrder(2)));
    }

    #[test]
    fn rejects_unbounded_middle_bracket() {
        let mut table = valid_table();
        table[2].max_income = None;

        assert_eq!(validate_schedule(&table), Err(ScheduleError::UnboundedNotLast(3)));
    }

    #[test]
    fn rejects_bounded_last_bracket() {
        let mut table = valid_table();
        table[5].max_income = Some(dec!(500000));

        assert_eq!(validate_schedule(&table), Err(ScheduleError::MissingUnboundedBracket));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut table = valid_table();
        table[0].max_income = Some(dec!(0));

        assert_eq!(validate_schedule(&table), Err(ScheduleError::EmptyRange(1)));
    }

    #[test]
    fn rejects_inconsistent_base_tax() {
        let mut table = valid_table();
        table[3].base_tax = dec!(5500);

        assert_eq!(
            validate_schedule(&table),
            Err(ScheduleError::BaseTaxMismatch {
                bracket: 4,
                expected: dec!(5550),
                found: dec!(5500),
            })
        );
    }

    #[test]
    fn derive_base_tax_accumulates_widths() {
        let bases = derive_base_tax(&valid_table());

        assert_eq!(
            bases,
            vec![dec!(0), dec!(0), dec!(1650), dec!(5550), dec!(18500), dec!(90500)]
        );
    }

    #[test]
    fn rejects_base_tax_beyond_decimal_range() {
        let table = vec![
            bracket(1, dec!(0), Some(Decimal::MAX), dec!(42), dec!(0)),
            bracket(2, Decimal::MAX, None, dec!(42), dec!(0)),
        ];

        assert_eq!(
            validate_schedule(&table),
            Err(ScheduleError::BaseTaxMismatch {
                bracket: 2,
                expected: Decimal::MAX,
                found: dec!(0),
            })
        );
    }

    #[test]
    fn active_brackets_filters_and_sorts() {
        let mut table = valid_table();
        table.reverse();
        table[0].is_active = false; // bracket 6
        table[1].tax_year = 2024; // bracket 5

        let active = active_brackets(&table, 2025);

        let numbers: Vec<i32> = active.iter().map(|b| b.bracket_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
