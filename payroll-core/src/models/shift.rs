use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: u32,
    pub is_active: bool,
}

/// For creating new shifts (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShift {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: u32,
    pub is_active: bool,
}

impl Shift {
    /// Paid hours for one occurrence of this shift.
    pub fn working_hours(&self) -> Result<rust_decimal::Decimal, crate::calculations::ShiftError> {
        crate::calculations::working_hours(self.start_time, self.end_time, self.break_minutes)
    }
}
