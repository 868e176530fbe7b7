//! Graduated income-tax engine.
//!
//! Converts an annual gross income into a tax liability using an ordered
//! table of [`TaxBracket`]s, then derives the pay-period and net figures
//! shown on payslips.
//!
//! # Algorithm
//!
//! Brackets are walked in ascending order. For every bracket whose lower
//! bound the income exceeds, the portion of income inside the bracket is
//! taxed at the bracket rate and the running total is replaced by
//! `base_tax + in_bracket_tax`. The walk stops at the first bracket that
//! fully contains the income.
//!
//! | Bracket | Range            | Rate | Base tax |
//! |---------|------------------|------|----------|
//! | 1       | 0 – 12,500       | 0%   | 0        |
//! | 2       | 12,500 – 20,000  | 22%  | 0        |
//! | 3       | 20,000 – 33,000  | 30%  | 1,650    |
//! | 4       | 33,000 – 50,000  | 35%  | 5,550    |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use payroll_core::TaxBracket;
//! use payroll_core::calculations::compute_tax;
//!
//! let bracket = |n, min, max, rate, base| TaxBracket {
//!     tax_year: 2025,
//!     bracket_number: n,
//!     min_income: min,
//!     max_income: max,
//!     tax_rate: rate,
//!     base_tax: base,
//!     is_active: true,
//! };
//! let brackets = vec![
//!     bracket(1, dec!(0), Some(dec!(12500)), dec!(0), dec!(0)),
//!     bracket(2, dec!(12500), Some(dec!(20000)), dec!(22), dec!(0)),
//!     bracket(3, dec!(20000), Some(dec!(33000)), dec!(30), dec!(1650)),
//!     bracket(4, dec!(33000), Some(dec!(50000)), dec!(35), dec!(5550)),
//! ];
//!
//! let result = compute_tax(dec!(50000), &brackets).unwrap();
//!
//! assert_eq!(result.annual_tax, dec!(11500));
//! assert_eq!(result.net_annual, dec!(38500));
//! assert_eq!(result.effective_rate, dec!(23));
//! assert_eq!(result.tax_bracket, 4);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::calculations::common::percent_of;
use crate::{PayPeriod, TaxBracket, TaxCalculationResult};

/// Largest annual income the engine accepts. Keeps every intermediate
/// product well inside `Decimal`'s range.
pub const MAX_ANNUAL_INCOME: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Errors returned by the income-tax engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IncomeTaxError {
    /// The income was negative, too large, missing or not a number, or its
    /// tax under the given table falls outside `Decimal`'s range.
    #[error("invalid income: {0}")]
    InvalidInput(String),

    /// No bracket data is available for the requested tax year.
    #[error("no tax brackets available")]
    NoBrackets,
}

/// Where the tax owed on lower brackets comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseTaxPolicy {
    /// Trust each bracket's stored `base_tax`.
    #[default]
    Stored,

    /// Ignore `base_tax` and accumulate lower brackets' tax from their
    /// widths and rates.
    Derived,
}

/// Calculator over a borrowed bracket table.
///
/// Brackets must already be filtered to one tax year's active rows and
/// sorted ascending by `min_income`.
#[derive(Debug, Clone)]
pub struct IncomeTaxCalculator<'a> {
    brackets: &'a [TaxBracket],
    policy: BaseTaxPolicy,
}

impl<'a> IncomeTaxCalculator<'a> {
    pub fn new(brackets: &'a [TaxBracket]) -> Self {
        Self {
            brackets,
            policy: BaseTaxPolicy::default(),
        }
    }

    pub fn with_policy(
        mut self,
        policy: BaseTaxPolicy,
    ) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BaseTaxPolicy {
        self.policy
    }

    /// Computes tax liability and the derived period and net figures.
    ///
    /// # Errors
    ///
    /// * [`IncomeTaxError::InvalidInput`] if `annual_income` is negative or
    ///   above [`MAX_ANNUAL_INCOME`], or if a malformed bracket makes its tax
    ///   unrepresentable.
    /// * [`IncomeTaxError::NoBrackets`] if the table is empty.
    pub fn calculate(
        &self,
        annual_income: Decimal,
    ) -> Result<TaxCalculationResult, IncomeTaxError> {
        validate_income(annual_income)?;

        let first = self.brackets.first().ok_or(IncomeTaxError::NoBrackets)?;
        let (annual_tax, tax_bracket) = self.accumulate(annual_income, first.bracket_number)?;
        let overflow = || out_of_range(annual_income, tax_bracket);

        let net_annual = annual_income.checked_sub(annual_tax).ok_or_else(overflow)?;
        let effective_rate = if annual_income.is_zero() {
            Decimal::ZERO
        } else {
            annual_tax
                .checked_div(annual_income)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(overflow)?
        };

        debug!(
            %annual_income,
            tax_bracket,
            %annual_tax,
            policy = ?self.policy,
            "computed income tax"
        );

        Ok(TaxCalculationResult {
            annual_income,
            tax_bracket,
            annual_tax,
            monthly_tax: PayPeriod::Monthly.split(annual_tax),
            fortnightly_tax: PayPeriod::Fortnightly.split(annual_tax),
            net_annual,
            net_monthly: PayPeriod::Monthly.split(net_annual),
            net_fortnightly: PayPeriod::Fortnightly.split(net_annual),
            effective_rate,
        })
    }

    /// Walks the table and returns `(annual_tax, applicable_bracket)`.
    fn accumulate(
        &self,
        income: Decimal,
        first_bracket: i32,
    ) -> Result<(Decimal, i32), IncomeTaxError> {
        let mut total_tax = Decimal::ZERO;
        let mut applicable = first_bracket;
        // Tax on all fully consumed lower brackets, used by `Derived`.
        let mut lower_tax = Decimal::ZERO;

        for bracket in self.brackets {
            if income <= bracket.min_income {
                continue;
            }

            let contained = bracket.max_income.is_none_or(|max| income <= max);
            let portion = match bracket.max_income {
                Some(max) if !contained => max - bracket.min_income,
                _ => income - bracket.min_income,
            };
            let overflow = || out_of_range(income, bracket.bracket_number);
            let in_bracket = percent_of(portion, bracket.tax_rate).ok_or_else(overflow)?;

            let base = match self.policy {
                BaseTaxPolicy::Stored => bracket.base_tax,
                BaseTaxPolicy::Derived => lower_tax,
            };
            total_tax = base.checked_add(in_bracket).ok_or_else(overflow)?;
            applicable = bracket.bracket_number;

            trace!(
                bracket = bracket.bracket_number,
                %portion,
                %in_bracket,
                %total_tax,
                "bracket applied"
            );

            if contained {
                break;
            }
            lower_tax = lower_tax.checked_add(in_bracket).ok_or_else(overflow)?;
        }

        Ok((total_tax, applicable))
    }
}

/// Computes tax for `annual_income` using the stored base tax of each bracket.
pub fn compute_tax(
    annual_income: Decimal,
    brackets: &[TaxBracket],
) -> Result<TaxCalculationResult, IncomeTaxError> {
    IncomeTaxCalculator::new(brackets).calculate(annual_income)
}

/// Computes tax for `annual_income` with an explicit [`BaseTaxPolicy`].
pub fn compute_tax_with(
    annual_income: Decimal,
    brackets: &[TaxBracket],
    policy: BaseTaxPolicy,
) -> Result<TaxCalculationResult, IncomeTaxError> {
    IncomeTaxCalculator::new(brackets)
        .with_policy(policy)
        .calculate(annual_income)
}

/// Parses a user-entered income such as `"50,000.00"`.
///
/// Whitespace is trimmed and commas are treated as thousands separators.
/// Empty input is rejected rather than treated as zero.
pub fn parse_income(input: &str) -> Result<Decimal, IncomeTaxError> {
    let normalized = input.trim().replace(',', "");
    if normalized.is_empty() {
        return Err(IncomeTaxError::InvalidInput("income is required".to_string()));
    }

    let income = normalized
        .parse::<Decimal>()
        .map_err(|e| IncomeTaxError::InvalidInput(format!("'{input}' is not a number: {e}")))?;
    validate_income(income)?;
    Ok(income)
}

fn out_of_range(
    income: Decimal,
    bracket: i32,
) -> IncomeTaxError {
    IncomeTaxError::InvalidInput(format!(
        "tax on income {income} is out of range in bracket {bracket}"
    ))
}

fn validate_income(income: Decimal) -> Result<(), IncomeTaxError> {
    if income.is_sign_negative() && !income.is_zero() {
        return Err(IncomeTaxError::InvalidInput(format!(
            "income must not be negative, got {income}"
        )));
    }
    if income > MAX_ANNUAL_INCOME {
        return Err(IncomeTaxError::InvalidInput(format!(
            "income {income} exceeds the supported maximum of {MAX_ANNUAL_INCOME}"
        )));
    }
    Ok(())
}
