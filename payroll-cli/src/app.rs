use std::fmt;

use anyhow::{Context, Result};
use payroll_core::calculations::{BaseTaxPolicy, IncomeTaxError, compute_tax_with, validate_schedule};
use payroll_core::db::RepositoryRegistry;
use payroll_core::{PayrollRepository, Shift, TaxBracket, TaxCalculationResult};
use payroll_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

use crate::payroll_run::PayrollRun;
use crate::utils::{format_kina, format_limit, format_percent};

/// Build a registry with all compiled-in backends.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Active brackets for `tax_year`, ordered by `min_income`.
///
/// An empty table is reported as [`IncomeTaxError::NoBrackets`]. A table
/// that no longer forms a valid schedule, e.g. after its top bracket was
/// deactivated, fails with the underlying
/// [`ScheduleError`](payroll_core::calculations::ScheduleError).
pub async fn load_brackets(
    repo: &dyn PayrollRepository,
    tax_year: i32,
) -> Result<Vec<TaxBracket>> {
    let brackets = repo
        .get_tax_brackets(tax_year)
        .await
        .with_context(|| format!("failed to load tax brackets for {tax_year}"))?;

    if brackets.is_empty() {
        return Err(IncomeTaxError::NoBrackets)
            .with_context(|| format!("no tax brackets loaded for tax year {tax_year}"));
    }
    validate_schedule(&brackets)
        .with_context(|| format!("tax bracket table for {tax_year} is invalid"))?;

    debug!(tax_year, count = brackets.len(), "brackets loaded");
    Ok(brackets)
}

/// Loads the year's table and computes tax on `annual_income`.
pub async fn calculate_tax(
    repo: &dyn PayrollRepository,
    tax_year: i32,
    annual_income: rust_decimal::Decimal,
    policy: BaseTaxPolicy,
) -> Result<TaxReport> {
    let brackets = load_brackets(repo, tax_year).await?;
    let result = compute_tax_with(annual_income, &brackets, policy)
        .with_context(|| format!("tax calculation failed for income {annual_income}"))?;

    Ok(TaxReport { tax_year, result })
}

/// Single-employee tax figures, printed by `png-payroll tax`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxReport {
    pub tax_year: i32,
    pub result: TaxCalculationResult,
}

impl fmt::Display for TaxReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = &self.result;
        writeln!(f, "Tax year:          {}", self.tax_year)?;
        writeln!(f, "Annual income:     {}", format_kina(r.annual_income))?;
        writeln!(f, "Tax bracket:       {}", r.tax_bracket)?;
        writeln!(f, "Annual tax:        {}", format_kina(r.annual_tax))?;
        writeln!(f, "Monthly tax:       {}", format_kina(r.monthly_tax))?;
        writeln!(f, "Fortnightly tax:   {}", format_kina(r.fortnightly_tax))?;
        writeln!(f, "Net annual:        {}", format_kina(r.net_annual))?;
        writeln!(f, "Net monthly:       {}", format_kina(r.net_monthly))?;
        writeln!(f, "Net fortnightly:   {}", format_kina(r.net_fortnightly))?;
        write!(f, "Effective rate:    {}", format_percent(r.effective_rate))
    }
}

/// A year's bracket table, printed by `png-payroll brackets`.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    pub tax_year: i32,
    pub brackets: Vec<TaxBracket>,
}

impl fmt::Display for BracketTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Tax brackets for {}", self.tax_year)?;
        write!(
            f,
            "{:>3}  {:>16}  {:>16}  {:>7}  {:>16}",
            "#", "From", "To", "Rate", "Base tax"
        )?;
        for b in &self.brackets {
            write!(
                f,
                "\n{:>3}  {:>16}  {:>16}  {:>7}  {:>16}",
                b.bracket_number,
                format_kina(b.min_income),
                format_limit(b.max_income),
                format_percent(b.tax_rate),
                format_kina(b.base_tax),
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for PayrollRun {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Payroll run for {}", self.tax_year)?;
        writeln!(
            f,
            "{:<12}  {:>18}  {:>3}  {:>16}  {:>14}  {:>14}  {:>18}",
            "Employee", "Annual income", "#", "Annual tax", "Monthly tax", "Fortnightly", "Net annual"
        )?;
        for line in &self.lines {
            let r = &line.result;
            writeln!(
                f,
                "{:<12}  {:>18}  {:>3}  {:>16}  {:>14}  {:>14}  {:>18}",
                line.employee_id,
                format_kina(r.annual_income),
                r.tax_bracket,
                format_kina(r.annual_tax),
                format_kina(r.monthly_tax),
                format_kina(r.fortnightly_tax),
                format_kina(r.net_annual),
            )?;
        }
        write!(
            f,
            "{:<12}  {:>18}  {:>3}  {:>16}  {:>14}  {:>14}  {:>18}",
            format!("Total ({})", self.lines.len()),
            format_kina(self.total_income),
            "",
            format_kina(self.total_tax),
            "",
            "",
            format_kina(self.total_net),
        )
    }
}

/// Shift roster with paid hours, printed by `png-payroll shifts`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftTable(pub Vec<Shift>);

impl fmt::Display for ShiftTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{:>3}  {:<12}  {:>5}  {:>5}  {:>5}  {:>6}",
            "id", "Name", "Start", "End", "Break", "Hours"
        )?;
        for shift in &self.0 {
            let hours = shift
                .working_hours()
                .map(|h| format!("{h:.2}"))
                .unwrap_or_else(|_| "n/a".to_string());
            write!(
                f,
                "\n{:>3}  {:<12}  {:>5}  {:>5}  {:>5}  {:>6}{}",
                shift.id,
                shift.name,
                shift.start_time.format("%H:%M").to_string(),
                shift.end_time.format("%H:%M").to_string(),
                shift.break_minutes,
                hours,
                if shift.is_active { "" } else { "  (inactive)" },
            )?;
        }
        Ok(())
    }
}
