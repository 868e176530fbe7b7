use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pay cycles used to split annual figures.
///
/// Period counts are fixed; partial years are not prorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayPeriod {
    Monthly,
    Fortnightly,
}

impl PayPeriod {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Fortnightly => 26,
        }
    }

    /// Divides an annual amount evenly across the periods of one year.
    pub fn split(
        &self,
        annual: Decimal,
    ) -> Decimal {
        annual / Decimal::from(self.periods_per_year())
    }
}
