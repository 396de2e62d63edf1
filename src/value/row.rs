//! `may_postgres` rows → [`MergedRow`].
//!
//! Columns are converted by their Postgres type name into the matching
//! `sea_query::Value` variant, keeping SQL NULL as the variant's `None`.

use crate::error::{MergeError, MergeResult};
use crate::hydration::row::MergedRow;
use may_postgres::types::FromSql;
use may_postgres::Row;
use sea_query::{Nullable, Value};

fn get<'a, T>(row: &'a Row, index: usize, name: &str) -> MergeResult<Value>
where
    T: FromSql<'a> + Into<Value> + Nullable,
{
    row.try_get::<_, Option<T>>(index)
        .map(Value::from)
        .map_err(|e| MergeError::ParseError(format!("column {name}: {e}")))
}

/// Convert one row, keeping column order
///
/// # Errors
///
/// Returns `MergeError::ParseError` for a column type with no `Value` counterpart.
pub fn row_to_merged_row(row: &Row) -> MergeResult<MergedRow> {
    let mut merged = MergedRow::new();

    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let value = match column.type_().name() {
            "bool" => get::<bool>(row, index, name)?,
            "int2" => get::<i16>(row, index, name)?,
            "int4" => get::<i32>(row, index, name)?,
            "int8" => get::<i64>(row, index, name)?,
            "float4" => get::<f32>(row, index, name)?,
            "float8" => get::<f64>(row, index, name)?,
            // NULL placeholders of a view column come back as text
            "text" | "varchar" | "bpchar" | "name" | "unknown" => get::<String>(row, index, name)?,
            "bytea" => get::<Vec<u8>>(row, index, name)?,
            "json" | "jsonb" => get::<serde_json::Value>(row, index, name)?,
            "uuid" => get::<uuid::Uuid>(row, index, name)?,
            "date" => get::<chrono::NaiveDate>(row, index, name)?,
            "time" => get::<chrono::NaiveTime>(row, index, name)?,
            "timestamp" => get::<chrono::NaiveDateTime>(row, index, name)?,
            "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, index, name)?,
            "numeric" => get::<rust_decimal::Decimal>(row, index, name)?,
            other => {
                return Err(MergeError::ParseError(format!(
                    "column {name}: unsupported type {other}"
                )))
            }
        };
        merged.push(name, value);
    }

    Ok(merged)
}
