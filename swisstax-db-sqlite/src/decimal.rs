use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{Row, TypeInfo, ValueRef};
use swisstax_core::RepositoryError;

/// Read a decimal column. TEXT is parsed exactly; INTEGER and REAL are
/// accepted for hand-written rows.
pub fn get_decimal(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    get_optional_decimal(row, column)?
        .ok_or_else(|| RepositoryError::Database(format!("Column '{column}' is NULL")))
}

/// Read a nullable decimal column.
pub fn get_optional_decimal(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    let type_name = value_ref.type_info().name().to_string();
    let value = match type_name.as_str() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{column}': {e}"))
            })?;
            parse_decimal(&text).ok_or_else(|| {
                RepositoryError::Database(format!(
                    "Invalid decimal '{text}' in column '{column}'"
                ))
            })?
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{column}': {e}"))
            })?;
            Decimal::from(val)
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{column}': {e}"))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {val} to Decimal: {e}"))
            })?
        }
        other => {
            return Err(RepositoryError::Database(format!(
                "Unexpected type '{other}' for column '{column}'"
            )));
        }
    };

    Ok(Some(value))
}

/// Parses plain or scientific notation, ignoring surrounding whitespace.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Decimal as stored in TEXT columns. Trailing zeros are dropped so equal
/// values compare equal in SQL.
pub fn decimal_to_text(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> sqlx::sqlite::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE test_decimals (
                id INTEGER PRIMARY KEY,
                int_value INTEGER,
                real_value REAL,
                text_value TEXT,
                blob_value BLOB
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch(
        pool: &sqlx::sqlite::SqlitePool,
        insert: &str,
        column: &str,
    ) -> sqlx::sqlite::SqliteRow {
        sqlx::query(insert)
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        sqlx::query(&format!("SELECT {column} FROM test_decimals WHERE id = 1"))
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row")
    }

    #[tokio::test]
    async fn test_get_decimal_from_text_is_exact() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, text_value) VALUES (1, '27.25')",
            "text_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "text_value"), Ok(dec!(27.25)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_integer() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, int_value) VALUES (1, 209800)",
            "int_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "int_value"), Ok(dec!(209800)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_real() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, real_value) VALUES (1, 37.5)",
            "real_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "real_value"), Ok(dec!(37.5)));
    }

    #[tokio::test]
    async fn test_get_decimal_rejects_null() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, text_value) VALUES (1, NULL)",
            "text_value",
        )
        .await;

        assert_eq!(
            get_decimal(&row, "text_value"),
            Err(RepositoryError::Database(
                "Column 'text_value' is NULL".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_get_optional_decimal_from_null_returns_none() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, text_value) VALUES (1, NULL)",
            "text_value",
        )
        .await;

        assert_eq!(get_optional_decimal(&row, "text_value"), Ok(None));
    }

    #[tokio::test]
    async fn test_get_decimal_rejects_garbage_text() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, text_value) VALUES (1, 'not a number')",
            "text_value",
        )
        .await;

        assert_eq!(
            get_decimal(&row, "text_value"),
            Err(RepositoryError::Database(
                "Invalid decimal 'not a number' in column 'text_value'".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_get_decimal_unexpected_type() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id, blob_value) VALUES (1, x'00')",
            "blob_value",
        )
        .await;

        assert_eq!(
            get_decimal(&row, "blob_value"),
            Err(RepositoryError::Database(
                "Unexpected type 'BLOB' for column 'blob_value'".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_get_decimal_column_not_found() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO test_decimals (id) VALUES (1)",
            "id",
        )
        .await;

        let result = get_decimal(&row, "nonexistent_column");

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.starts_with("Column 'nonexistent_column' not found:")));
    }

    #[test]
    fn test_parse_decimal_accepts_scientific_and_padding() {
        assert_eq!(parse_decimal(" 119 "), Some(dec!(119)));
        assert_eq!(parse_decimal("1.5e2"), Some(dec!(150)));
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_decimal_to_text_drops_trailing_zeros() {
        assert_eq!(decimal_to_text(dec!(27.250)), "27.25");
        assert_eq!(decimal_to_text(dec!(100)), "100");
        assert_eq!(decimal_to_text(Decimal::ZERO), "0");
    }
}
