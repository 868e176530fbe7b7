use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveTime;
use payroll_core::{NewShift, PayrollRepository, RepositoryError, Shift, TaxBracket};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

const TIME_FORMAT: &str = "%H:%M:%S";

const BRACKET_COLUMNS: &str =
    "tax_year, bracket_number, min_income, max_income, tax_rate, base_tax, is_active";

const INSERT_BRACKET: &str = "INSERT INTO tax_brackets
     (tax_year, bracket_number, min_income, max_income, tax_rate, base_tax, is_active)
     VALUES (?, ?, ?, ?, ?, ?, ?)";

const SHIFT_COLUMNS: &str = "id, name, start_time, end_time, break_minutes, is_active";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url`, creating the database file if it is missing.
    ///
    /// Accepts sqlx URLs (`sqlite:payroll.db`, `sqlite::memory:`) as well as a
    /// bare path or `:memory:`. In-memory databases use a single connection
    /// so every query sees the same data.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepositoryError::Connection(format!("{database_url}: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{database_url}: {e}")))?;

        debug!(database_url, max_connections, "connected to sqlite");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        info!("database migrations complete");
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(seed = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_tax_bracket(row: &SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        tax_year: row.try_get("tax_year").map_err(db_error)?,
        bracket_number: row.try_get("bracket_number").map_err(db_error)?,
        min_income: get_decimal(row, "min_income")?,
        max_income: get_optional_decimal(row, "max_income")?,
        tax_rate: get_decimal(row, "tax_rate")?,
        base_tax: get_decimal(row, "base_tax")?,
        is_active: row.try_get("is_active").map_err(db_error)?,
    })
}

fn insert_bracket_query(bracket: &TaxBracket) -> Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(INSERT_BRACKET)
        .bind(bracket.tax_year)
        .bind(bracket.bracket_number)
        .bind(decimal_to_text(bracket.min_income))
        .bind(bracket.max_income.map(decimal_to_text))
        .bind(decimal_to_text(bracket.tax_rate))
        .bind(decimal_to_text(bracket.base_tax))
        .bind(bracket.is_active)
}

fn parse_time(
    row: &SqliteRow,
    column: &str,
) -> Result<NaiveTime, RepositoryError> {
    let raw: String = row.try_get(column).map_err(db_error)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(|e| RepositoryError::Database(format!("Failed to parse time '{}': {}", raw, e)))
}

fn row_to_shift(row: &SqliteRow) -> Result<Shift, RepositoryError> {
    let break_minutes: i64 = row.try_get("break_minutes").map_err(db_error)?;

    Ok(Shift {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        start_time: parse_time(row, "start_time")?,
        end_time: parse_time(row, "end_time")?,
        break_minutes: u32::try_from(break_minutes).map_err(|_| {
            RepositoryError::Database(format!("Invalid break_minutes: {}", break_minutes))
        })?,
        is_active: row.try_get("is_active").map_err(db_error)?,
    })
}

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT tax_year FROM tax_brackets ORDER BY tax_year DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| row.try_get("tax_year").map_err(db_error))
            .collect()
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM tax_brackets
             WHERE tax_year = ? AND is_active = 1
             ORDER BY CAST(min_income AS REAL), bracket_number"
        ))
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn list_all_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM tax_brackets
             WHERE tax_year = ?
             ORDER BY CAST(min_income AS REAL), bracket_number"
        ))
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn insert_tax_bracket(
        &self,
        bracket: &TaxBracket,
    ) -> Result<(), RepositoryError> {
        insert_bracket_query(bracket)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }

    async fn delete_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }

    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        // Dropping `tx` before commit rolls back, leaving the old rows in place.
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for bracket in brackets {
            if bracket.tax_year != tax_year {
                return Err(RepositoryError::Database(format!(
                    "bracket {} belongs to tax year {}, not {tax_year}",
                    bracket.bracket_number, bracket.tax_year
                )));
            }
            insert_bracket_query(bracket)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(tax_year, count = brackets.len(), "replaced tax brackets");
        Ok(())
    }

    async fn set_bracket_active(
        &self,
        tax_year: i32,
        bracket_number: i32,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_brackets SET is_active = ? WHERE tax_year = ? AND bracket_number = ?",
        )
        .bind(active)
        .bind(tax_year)
        .bind(bracket_number)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_shifts(&self) -> Result<Vec<Shift>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY start_time, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(row_to_shift).collect()
    }

    async fn get_shift(
        &self,
        id: i64,
    ) -> Result<Shift, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_shift(&row)
    }

    async fn create_shift(
        &self,
        shift: NewShift,
    ) -> Result<Shift, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO shifts (name, start_time, end_time, break_minutes, is_active)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&shift.name)
        .bind(shift.start_time.format(TIME_FORMAT).to_string())
        .bind(shift.end_time.format(TIME_FORMAT).to_string())
        .bind(i64::from(shift.break_minutes))
        .bind(shift.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_shift(result.last_insert_rowid()).await
    }

    async fn delete_shift(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
