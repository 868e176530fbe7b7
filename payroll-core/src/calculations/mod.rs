//! Payroll calculations.
//!
//! The income-tax engine, bracket-table validation and the shift
//! working-hours calculator. Everything here is pure and synchronous.

pub mod common;
pub mod income_tax;
pub mod schedule;
pub mod shift_hours;

pub use income_tax::{
    BaseTaxPolicy, IncomeTaxCalculator, IncomeTaxError, compute_tax, compute_tax_with,
    parse_income,
};
pub use schedule::{ScheduleError, active_brackets, derive_base_tax, validate_schedule};
pub use shift_hours::{ShiftError, working_hours};
