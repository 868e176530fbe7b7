use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use payroll_core::calculations::{ScheduleError, active_brackets, validate_schedule};
use payroll_core::{PayrollRepository, RepositoryError, TaxBracket};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading tax bracket data.
#[derive(Debug, Error)]
pub enum TaxBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid schedule for tax year {tax_year}: {source}")]
    InvalidSchedule {
        tax_year: i32,
        #[source]
        source: ScheduleError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the tax brackets CSV file.
///
/// - `tax_year`: The tax year (e.g., 2025)
/// - `bracket_number`: Position of the bracket within the year, from 1
/// - `min_income`: Lower bound of the bracket
/// - `max_income`: Upper bound (empty for the unbounded top bracket)
/// - `tax_rate`: Percentage rate (e.g., 22 for 22%)
/// - `base_tax`: Tax owed on all income below `min_income`
/// - `is_active`: Optional, defaults to `true`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub bracket_number: i32,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
    pub base_tax: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl From<&TaxBracketRecord> for TaxBracket {
    fn from(record: &TaxBracketRecord) -> Self {
        TaxBracket {
            tax_year: record.tax_year,
            bracket_number: record.bracket_number,
            min_income: record.min_income,
            max_income: record.max_income,
            tax_rate: record.tax_rate,
            base_tax: record.base_tax,
            is_active: record.is_active,
        }
    }
}

/// Loader for tax bracket data from CSV files.
///
/// Reads CSV data and writes it through the `PayrollRepository` trait, so it
/// works with any database backend.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, TaxBracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed tax bracket records");
        Ok(records)
    }

    /// Group records by tax year, sorted by `min_income` within each year.
    pub fn group_by_year(records: &[TaxBracketRecord]) -> BTreeMap<i32, Vec<TaxBracket>> {
        let mut groups: BTreeMap<i32, Vec<TaxBracket>> = BTreeMap::new();
        for record in records {
            groups.entry(record.tax_year).or_default().push(record.into());
        }
        for brackets in groups.values_mut() {
            brackets.sort_by(|a, b| a.min_income.cmp(&b.min_income));
        }
        groups
    }

    /// Load tax bracket records into the database.
    ///
    /// Every tax year in `records` is validated first: bracket numbers must be
    /// positive and unique across all rows of a year, active or not, and the
    /// active rows must form a valid schedule. Nothing is written if any year
    /// fails. Each year is then swapped in with a single
    /// `replace_tax_brackets` call, so loading the same file twice gives the
    /// same result and a failed write leaves the stored year intact.
    pub async fn load<R: PayrollRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, TaxBracketLoaderError> {
        let groups = Self::group_by_year(records);

        for (tax_year, brackets) in &groups {
            check_bracket_numbers(brackets)
                .and_then(|()| validate_schedule(&active_brackets(brackets, *tax_year)))
                .map_err(|source| TaxBracketLoaderError::InvalidSchedule {
                    tax_year: *tax_year,
                    source,
                })?;
        }

        let mut inserted = 0;
        for (tax_year, brackets) in groups {
            repo.replace_tax_brackets(tax_year, &brackets).await?;
            inserted += brackets.len();
            info!(tax_year, count = brackets.len(), "loaded tax brackets");
        }

        Ok(inserted)
    }
}

/// Bracket numbers key the stored rows, so they are checked on inactive rows too.
fn check_bracket_numbers(brackets: &[TaxBracket]) -> Result<(), ScheduleError> {
    let mut seen = HashSet::new();
    for bracket in brackets {
        let number = bracket.bracket_number;
        if number <= 0 {
            return Err(ScheduleError::InvalidBracketNumber(number));
        }
        if !seen.insert(number) {
            return Err(ScheduleError::DuplicateBracketNumber(number));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const TEST_CSV: &str = r#"tax_year,bracket_number,min_income,max_income,tax_rate,base_tax,is_active
2025,1,0,12500,0,0,true
2025,2,12500,20000,22,0,true
2025,3,20000,33000,30,1650,true
2025,4,33000,70000,35,5550,true
2025,5,70000,250000,40,18500,true
2025,6,250000,,42,90500,true
2024,1,0,12500,0,0,true
2024,2,12500,20000,22,0,true
2024,3,20000,33000,30,1650,true
2024,4,33000,,35,5550,true
"#;

    #[test]
    fn test_parse_csv_single_bracket() {
        let csv = "tax_year,bracket_number,min_income,max_income,tax_rate,base_tax\n2025,2,12500,20000,22,0";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![TaxBracketRecord {
                tax_year: 2025,
                bracket_number: 2,
                min_income: dec!(12500),
                max_income: Some(dec!(20000)),
                tax_rate: dec!(22),
                base_tax: dec!(0),
                is_active: true,
            }]
        );
    }

    #[test]
    fn test_parse_csv_unlimited_max_income() {
        let csv = "tax_year,bracket_number,min_income,max_income,tax_rate,base_tax\n2025,6,250000,,42,90500";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].max_income, None);
        assert_eq!(records[0].base_tax, dec!(90500));
    }

    #[test]
    fn test_parse_csv_trims_whitespace() {
        let csv = "tax_year, bracket_number, min_income, max_income, tax_rate, base_tax, is_active\n2025, 1, 0, 12500 , 0, 0, false";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].max_income, Some(dec!(12500)));
        assert!(!records[0].is_active);
    }

    #[test]
    fn test_parse_all_years() {
        let records = TaxBracketLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 10);
        assert_eq!(records.iter().filter(|r| r.tax_year == 2024).count(), 4);
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let csv = "tax_year,bracket_number,min_income\n2025,1,0";

        let err = TaxBracketLoader::parse(csv.as_bytes()).expect_err("Should fail for missing column");

        let TaxBracketLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "Expected 'missing field' in error, got: {}", msg);
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let csv = "tax_year,bracket_number,min_income,max_income,tax_rate,base_tax\n2025,1,abc,12500,0,0";

        let result = TaxBracketLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(TaxBracketLoaderError::CsvParse(_))));
    }

    #[test]
    fn test_parse_empty_csv() {
        let csv = "tax_year,bracket_number,min_income,max_income,tax_rate,base_tax\n";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert!(records.is_empty());
    }

    #[test]
    fn test_inactive_row_reusing_bracket_number_is_rejected() {
        let csv = format!("{TEST_CSV}2025,2,15000,20000,25,0,false\n");
        let records = TaxBracketLoader::parse(csv.as_bytes()).unwrap();
        let groups = TaxBracketLoader::group_by_year(&records);

        assert_eq!(check_bracket_numbers(&groups[&2024]), Ok(()));
        assert_eq!(
            check_bracket_numbers(&groups[&2025]),
            Err(ScheduleError::DuplicateBracketNumber(2))
        );
    }

    #[test]
    fn test_inactive_row_with_zero_bracket_number_is_rejected() {
        let csv = format!("{TEST_CSV}2024,0,0,12500,0,0,false\n");
        let records = TaxBracketLoader::parse(csv.as_bytes()).unwrap();
        let groups = TaxBracketLoader::group_by_year(&records);

        assert_eq!(
            check_bracket_numbers(&groups[&2024]),
            Err(ScheduleError::InvalidBracketNumber(0))
        );
    }

    #[test]
    fn test_group_by_year_sorts_rows() {
        let mut records = TaxBracketLoader::parse(TEST_CSV.as_bytes()).unwrap();
        records.reverse();

        let groups = TaxBracketLoader::group_by_year(&records);

        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![2024, 2025]);
        let numbers: Vec<i32> = groups[&2025].iter().map(|b| b.bracket_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }
}
