use payroll_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Get a decimal value from a row.
///
/// Amounts are written as TEXT, but INTEGER and REAL values (hand-edited
/// rows, numeric literals in seed files) are accepted too.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Err(RepositoryError::Database(format!(
            "Column '{}' is NULL, expected a decimal",
            column
        )));
    }

    let type_info = value_ref.type_info();
    match type_info.name() {
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            val.trim().parse::<Decimal>().map_err(|e| {
                RepositoryError::Database(format!("Failed to parse decimal '{}': {}", val, e))
            })
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{}': {}", column, e))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        other => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            other, column
        ))),
    }
}

/// Get an optional decimal value from a row, returning None for NULL values.
pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    get_decimal(row, column).map(Some)
}

/// Canonical TEXT form used when writing a decimal column.
pub fn decimal_to_text(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE test_decimals (
                id INTEGER PRIMARY KEY,
                value
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch(
        pool: &SqlitePool,
        insert: &str,
    ) -> SqliteRow {
        sqlx::query(insert)
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        sqlx::query("SELECT value FROM test_decimals WHERE id = 1")
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row")
    }

    #[tokio::test]
    async fn test_get_decimal_from_text() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, '1650.0025')").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(1650.0025)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_integer() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 12500)").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(12500)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_real() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 123.45)").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(123.45)));
    }

    #[tokio::test]
    async fn test_get_decimal_rejects_null() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, NULL)").await;

        assert!(matches!(get_decimal(&row, "value"), Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_decimal_rejects_non_numeric_text() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 'twelve')").await;

        let err = get_decimal(&row, "value").expect_err("should fail for bad text");
        let RepositoryError::Database(msg) = err else {
            panic!("Expected Database error, got: {:?}", err);
        };
        assert!(msg.contains("twelve"), "unexpected message: {msg}");
    }

    #[tokio::test]
    async fn test_get_decimal_column_not_found() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, '1')").await;

        assert!(matches!(
            get_decimal(&row, "missing"),
            Err(RepositoryError::Database(msg)) if msg.contains("missing")
        ));
    }

    #[tokio::test]
    async fn test_get_optional_decimal_null_is_none() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, NULL)").await;

        assert_eq!(get_optional_decimal(&row, "value"), Ok(None));
    }

    #[tokio::test]
    async fn test_get_optional_decimal_some() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, '250000')").await;

        assert_eq!(get_optional_decimal(&row, "value"), Ok(Some(dec!(250000))));
    }

    #[test]
    fn test_decimal_to_text_strips_trailing_zeros() {
        assert_eq!(decimal_to_text(dec!(1650.00)), "1650");
        assert_eq!(decimal_to_text(dec!(0.0025)), "0.0025");
    }
}
