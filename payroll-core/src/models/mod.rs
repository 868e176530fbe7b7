mod pay_period;
mod shift;
mod tax_bracket;
mod tax_calculation;

pub use pay_period::PayPeriod;
pub use shift::{NewShift, Shift};
pub use tax_bracket::TaxBracket;
pub use tax_calculation::TaxCalculationResult;
