use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a graduated income-tax table.
///
/// `tax_rate` is a plain percentage (`22` means 22%). `base_tax` is the
/// cumulative tax owed on all income below `min_income`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub tax_year: i32,
    pub bracket_number: i32,
    pub min_income: Decimal,
    /// `None` marks the top bracket, which has no upper limit.
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
    pub base_tax: Decimal,
    pub is_active: bool,
}

impl TaxBracket {
    /// Width of the bracket, or `None` for the unbounded top bracket.
    pub fn width(&self) -> Option<Decimal> {
        self.max_income.map(|max| max - self.min_income)
    }

    /// Whether `income` falls inside this bracket.
    ///
    /// The lower bound is exclusive and the upper bound inclusive, so an
    /// income equal to `max_income` belongs here rather than to the next row.
    pub fn contains(
        &self,
        income: Decimal,
    ) -> bool {
        income > self.min_income && self.max_income.is_none_or(|max| income <= max)
    }
}
