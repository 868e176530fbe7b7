//! Batch payroll run over an employee income CSV.
//!
//! ## CSV Format
//!
//! Headers are matched by name and column order does not matter.
//!
//! | Column          | Required | Type    | Notes                          |
//! |-----------------|----------|---------|--------------------------------|
//! | `employee_id`   | yes      | string  | Any non-empty identifier       |
//! | `annual_income` | yes      | decimal | Gross annual income in kina    |
//!
//! ```csv
//! employee_id,annual_income
//! E001,50000.00
//! E002,18000
//! ```
//!
//! Every row must parse before any tax is computed; a run either produces a
//! line for every employee or fails.

use std::path::Path;

use payroll_core::calculations::{BaseTaxPolicy, IncomeTaxCalculator, IncomeTaxError};
use payroll_core::{TaxBracket, TaxCalculationResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CsvRow {
    employee_id: String,
    annual_income: Decimal,
}

/// One employee's input to a payroll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeIncome {
    pub employee_id: String,
    pub annual_income: Decimal,
}

/// Errors from reading the employee CSV or computing the run.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    /// Structural CSV problem: missing column, bad decimal, wrong arity.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `row` is 1-based, header excluded.
    #[error("row {row}: employee_id is empty")]
    MissingEmployeeId { row: usize },

    #[error("row {row} ({employee_id}): {source}")]
    Tax {
        row: usize,
        employee_id: String,
        #[source]
        source: IncomeTaxError,
    },
}

/// Parses the full CSV contents. Rows are returned in file order.
pub fn load_from_str(input: &str) -> Result<Vec<EmployeeIncome>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            if row.employee_id.is_empty() {
                return Err(CsvLoadError::MissingEmployeeId { row: idx + 1 });
            }
            Ok(EmployeeIncome {
                employee_id: row.employee_id,
                annual_income: row.annual_income,
            })
        })
        .collect()
}

/// Reads `path` and delegates to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<EmployeeIncome>, CsvLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_from_str(&contents)
}

/// Tax figures for one employee.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollLine {
    pub employee_id: String,
    pub result: TaxCalculationResult,
}

/// Outcome of a payroll run.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollRun {
    pub tax_year: i32,
    pub lines: Vec<PayrollLine>,
    pub total_income: Decimal,
    pub total_tax: Decimal,
    pub total_net: Decimal,
}

impl PayrollRun {
    /// Computes every employee's tax against one year's bracket table.
    pub fn compute(
        tax_year: i32,
        brackets: &[TaxBracket],
        employees: &[EmployeeIncome],
        policy: BaseTaxPolicy,
    ) -> Result<Self, CsvLoadError> {
        let calculator = IncomeTaxCalculator::new(brackets).with_policy(policy);

        let lines = employees
            .iter()
            .enumerate()
            .map(|(idx, employee)| {
                let result = calculator.calculate(employee.annual_income).map_err(|source| {
                    CsvLoadError::Tax {
                        row: idx + 1,
                        employee_id: employee.employee_id.clone(),
                        source,
                    }
                })?;
                debug!(employee = %employee.employee_id, tax = %result.annual_tax, "employee computed");
                Ok(PayrollLine {
                    employee_id: employee.employee_id.clone(),
                    result,
                })
            })
            .collect::<Result<Vec<_>, CsvLoadError>>()?;

        let total_income = lines.iter().map(|l| l.result.annual_income).sum();
        let total_tax = lines.iter().map(|l| l.result.annual_tax).sum();
        let total_net = lines.iter().map(|l| l.result.net_annual).sum();

        info!(tax_year, employees = lines.len(), %total_tax, "payroll run complete");

        Ok(Self {
            tax_year,
            lines,
            total_income,
            total_tax,
            total_net,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn bracket(
        n: i32,
        min: Decimal,
        max: Option<Decimal>,
        rate: Decimal,
        base: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            tax_year: 2025,
            bracket_number: n,
            min_income: min,
            max_income: max,
            tax_rate: rate,
            base_tax: base,
            is_active: true,
        }
    }

    fn table() -> Vec<TaxBracket> {
        vec![
            bracket(1, dec!(0), Some(dec!(12500)), dec!(0), dec!(0)),
            bracket(2, dec!(12500), Some(dec!(20000)), dec!(22), dec!(0)),
            bracket(3, dec!(20000), Some(dec!(33000)), dec!(30), dec!(1650)),
            bracket(4, dec!(33000), Some(dec!(70000)), dec!(35), dec!(5550)),
            bracket(5, dec!(70000), Some(dec!(250000)), dec!(40), dec!(18500)),
            bracket(6, dec!(250000), None, dec!(42), dec!(90500)),
        ]
    }

    const EMPLOYEES_CSV: &str = "\
employee_id,annual_income
E001,50000.00
E002, 10000
E003,20000
";

    #[test]
    fn test_load_rows_in_file_order() {
        let employees = load_from_str(EMPLOYEES_CSV).expect("should parse");

        assert_eq!(
            employees,
            vec![
                EmployeeIncome {
                    employee_id: "E001".to_string(),
                    annual_income: dec!(50000.00),
                },
                EmployeeIncome {
                    employee_id: "E002".to_string(),
                    annual_income: dec!(10000),
                },
                EmployeeIncome {
                    employee_id: "E003".to_string(),
                    annual_income: dec!(20000),
                },
            ]
        );
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "annual_income,employee_id\n50000,E001\n";
        let employees = load_from_str(csv).expect("should parse");
        assert_eq!(employees[0].employee_id, "E001");
    }

    #[test]
    fn test_header_only_is_empty() {
        let employees = load_from_str("employee_id,annual_income\n").expect("header-only CSV is valid");
        assert!(employees.is_empty());
    }

    #[test]
    fn test_bad_income_is_parse_error() {
        let result = load_from_str("employee_id,annual_income\nE001,lots\n");
        assert!(matches!(result, Err(CsvLoadError::Parse(_))));
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let result = load_from_str("employee_id\nE001\n");
        assert!(matches!(result, Err(CsvLoadError::Parse(_))));
    }

    #[test]
    fn test_empty_employee_id_reports_row() {
        let csv = "employee_id,annual_income\nE001,100\n ,200\n";
        match load_from_str(csv) {
            Err(CsvLoadError::MissingEmployeeId { row }) => assert_eq!(row, 2),
            other => panic!("expected MissingEmployeeId, got {other:?}"),
        }
    }

    #[test]
    fn test_run_totals() {
        let employees = load_from_str(EMPLOYEES_CSV).unwrap();

        let run = PayrollRun::compute(2025, &table(), &employees, BaseTaxPolicy::Stored).unwrap();

        assert_eq!(run.lines.len(), 3);
        assert_eq!(run.lines[0].result.annual_tax, dec!(11500));
        assert_eq!(run.lines[1].result.annual_tax, dec!(0));
        assert_eq!(run.lines[2].result.annual_tax, dec!(1650));
        assert_eq!(run.total_income, dec!(80000));
        assert_eq!(run.total_tax, dec!(13150));
        assert_eq!(run.total_net, run.total_income - run.total_tax);
    }

    #[test]
    fn test_negative_income_fails_whole_run() {
        let employees = vec![
            EmployeeIncome {
                employee_id: "E001".to_string(),
                annual_income: dec!(50000),
            },
            EmployeeIncome {
                employee_id: "E002".to_string(),
                annual_income: dec!(-1),
            },
        ];

        match PayrollRun::compute(2025, &table(), &employees, BaseTaxPolicy::Stored) {
            Err(CsvLoadError::Tax { row, employee_id, source }) => {
                assert_eq!(row, 2);
                assert_eq!(employee_id, "E002");
                assert!(matches!(source, IncomeTaxError::InvalidInput(_)));
            }
            other => panic!("expected Tax error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_table_is_no_brackets() {
        let employees = load_from_str(EMPLOYEES_CSV).unwrap();

        let result = PayrollRun::compute(2025, &[], &employees, BaseTaxPolicy::Stored);

        assert!(matches!(
            result,
            Err(CsvLoadError::Tax {
                source: IncomeTaxError::NoBrackets,
                ..
            })
        ));
    }
}
