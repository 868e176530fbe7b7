pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod payroll_run;
pub mod utils;
