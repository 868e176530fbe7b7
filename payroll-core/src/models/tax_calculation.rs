use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Output of the income-tax engine. Recomputed on every request; never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub annual_income: Decimal,
    /// Number of the bracket that contains `annual_income`.
    pub tax_bracket: i32,
    pub annual_tax: Decimal,
    pub monthly_tax: Decimal,
    pub fortnightly_tax: Decimal,
    pub net_annual: Decimal,
    pub net_monthly: Decimal,
    pub net_fortnightly: Decimal,
    /// Percentage of income paid as tax (`23` means 23%).
    pub effective_rate: Decimal,
}
