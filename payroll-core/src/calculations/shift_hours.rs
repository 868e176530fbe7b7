//! Working hours for a rostered shift.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::round_currency;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShiftError {
    #[error("break of {break_minutes} minutes exceeds shift length of {shift_minutes} minutes")]
    BreakExceedsShift {
        break_minutes: u32,
        shift_minutes: i64,
    },
}

/// Paid hours between `start` and `end`, less `break_minutes`, to 2 dp.
///
/// An `end` at or before `start` means the shift runs past midnight, so
/// `22:00`–`06:00` is eight hours and identical times are a full day.
///
/// ```
/// use chrono::NaiveTime;
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::working_hours;
///
/// let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
/// let end = NaiveTime::from_hms_opt(16, 30, 0).unwrap();
///
/// assert_eq!(working_hours(start, end, 30), Ok(dec!(8.00)));
/// ```
pub fn working_hours(
    start: NaiveTime,
    end: NaiveTime,
    break_minutes: u32,
) -> Result<Decimal, ShiftError> {
    let mut shift_minutes = (end - start).num_minutes();
    if shift_minutes <= 0 {
        shift_minutes += MINUTES_PER_DAY;
    }

    let worked = shift_minutes - i64::from(break_minutes);
    if worked < 0 {
        return Err(ShiftError::BreakExceedsShift {
            break_minutes,
            shift_minutes,
        });
    }

    Ok(round_currency(Decimal::from(worked) / Decimal::from(60)))
}
