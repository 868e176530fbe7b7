use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewShift, Shift, TaxBracket};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for the reference data the payroll calculations read.
#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Tax years
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Tax brackets

    /// Active brackets for `tax_year`, ascending by `min_income`.
    async fn get_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, RepositoryError>;

    /// Every bracket for `tax_year`, including inactive rows.
    async fn list_all_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, RepositoryError>;

    async fn insert_tax_bracket(
        &self,
        bracket: &TaxBracket,
    ) -> Result<(), RepositoryError>;

    async fn delete_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<(), RepositoryError>;

    /// Replaces every row of `tax_year` with `brackets` as one unit.
    ///
    /// On error the year's previous rows are left as they were.
    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError>;

    async fn set_bracket_active(
        &self,
        tax_year: i32,
        bracket_number: i32,
        active: bool,
    ) -> Result<(), RepositoryError>;

    // Shifts
    async fn list_shifts(&self) -> Result<Vec<Shift>, RepositoryError>;

    async fn get_shift(
        &self,
        id: i64,
    ) -> Result<Shift, RepositoryError>;

    async fn create_shift(
        &self,
        shift: NewShift,
    ) -> Result<Shift, RepositoryError>;

    async fn delete_shift(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;
}
