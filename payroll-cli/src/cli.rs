use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use payroll_core::PayrollRepository;
use payroll_core::calculations::{BaseTaxPolicy, parse_income, working_hours};
use payroll_core::db::DbConfig;
use rust_decimal::Decimal;
use tracing::debug;

use crate::app::{self, BracketTable, ShiftTable};
use crate::config::AppConfig;
use crate::payroll_run::{self, PayrollRun};
use crate::utils::parse_clock_time;

/// Papua New Guinea salary and wages tax calculator.
///
/// Reads bracket tables from the configured database and computes annual,
/// monthly and fortnightly tax and net pay.
#[derive(Debug, Parser)]
#[command(name = "png-payroll", version)]
pub struct Cli {
    /// TOML config file. Defaults to $PNG_PAYROLL_CONFIG, then
    /// ./png-payroll.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend, overriding the config file.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite this is a file path (e.g. `payroll.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Tax year, overriding `payroll.default_tax_year`.
    #[arg(long, global = true)]
    pub year: Option<i32>,

    /// Log level or EnvFilter directive, overriding the config file.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute tax on one annual income.
    Tax {
        /// Gross annual income in kina, e.g. `50000` or `50,000.00`.
        #[arg(long, value_parser = parse_income)]
        income: Decimal,

        /// Accumulate lower brackets' tax instead of trusting stored base tax.
        #[arg(long)]
        derived_base_tax: bool,
    },

    /// List the year's bracket table.
    Brackets {
        /// Include inactive rows.
        #[arg(long)]
        all: bool,
    },

    /// List tax years that have brackets loaded.
    Years,

    /// Payroll run over an `employee_id,annual_income` CSV.
    Batch {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        derived_base_tax: bool,
    },

    /// Paid hours for one shift.
    ShiftHours {
        /// Start time, `HH:MM`.
        #[arg(long, value_parser = parse_clock_time)]
        start: NaiveTime,

        /// End time, `HH:MM`. An end at or before the start runs past midnight.
        #[arg(long, value_parser = parse_clock_time)]
        end: NaiveTime,

        #[arg(long, default_value_t = 0)]
        break_minutes: u32,
    },

    /// List configured shifts and their paid hours.
    Shifts,
}

fn policy(derived: bool) -> BaseTaxPolicy {
    if derived {
        BaseTaxPolicy::Derived
    } else {
        BaseTaxPolicy::Stored
    }
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;

        if let Some(backend) = &self.backend {
            config.database.backend = backend.clone();
        }
        if let Some(db) = &self.db {
            config.database.connection_string = db.clone();
        }
        if let Some(year) = self.year {
            config.payroll.default_tax_year = year;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        Ok(config)
    }
}

async fn open_repository(config: &AppConfig) -> Result<Box<dyn PayrollRepository>> {
    let db_config = DbConfig::from(config.database.clone());
    debug!(backend = %db_config.backend, "connecting");
    app::build_registry().create(&db_config).await.with_context(|| {
        format!(
            "cannot open {} database '{}'",
            db_config.backend, db_config.connection_string
        )
    })
}

/// Runs `command` and writes its report to `out`.
pub async fn run(
    command: &Command,
    config: &AppConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let tax_year = config.payroll.default_tax_year;

    match command {
        Command::Tax {
            income,
            derived_base_tax,
        } => {
            let repo = open_repository(config).await?;
            let report =
                app::calculate_tax(&*repo, tax_year, *income, policy(*derived_base_tax)).await?;
            writeln!(out, "{report}")?;
        }
        Command::Brackets { all } => {
            let repo = open_repository(config).await?;
            let brackets = if *all {
                repo.list_all_tax_brackets(tax_year).await?
            } else {
                repo.get_tax_brackets(tax_year).await?
            };
            if brackets.is_empty() {
                bail!("no tax brackets loaded for tax year {tax_year}");
            }
            writeln!(out, "{}", BracketTable { tax_year, brackets })?;
        }
        Command::Years => {
            let repo = open_repository(config).await?;
            for year in repo.list_tax_years().await? {
                writeln!(out, "{year}")?;
            }
        }
        Command::Batch {
            file,
            derived_base_tax,
        } => {
            // Parse the whole file before touching the database.
            let employees = payroll_run::load_from_file(file)?;
            let repo = open_repository(config).await?;
            let brackets = app::load_brackets(&*repo, tax_year).await?;
            let run = PayrollRun::compute(tax_year, &brackets, &employees, policy(*derived_base_tax))?;
            writeln!(out, "{run}")?;
        }
        Command::ShiftHours {
            start,
            end,
            break_minutes,
        } => {
            let hours = working_hours(*start, *end, *break_minutes)?;
            writeln!(out, "{hours:.2}")?;
        }
        Command::Shifts => {
            let repo = open_repository(config).await?;
            writeln!(out, "{}", ShiftTable(repo.list_shifts().await?))?;
        }
    }
    Ok(())
}
