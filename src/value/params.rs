//! SeaQuery `Values` → `may_postgres` bind parameters.

use crate::error::{MergeError, MergeResult};
use may_postgres::types::ToSql;
use sea_query::{Value, ValueType, Values};

type BoxedParam = Box<dyn ToSql + Sync>;

fn unsupported(value: &Value) -> MergeError {
    MergeError::Other(format!("Unsupported value type in query: {value:?}"))
}

/// Convert through SeaQuery's own `ValueType` so boxed and unboxed variants read alike
fn typed<T>(value: &Value) -> MergeResult<BoxedParam>
where
    Option<T>: ValueType + ToSql + Sync + 'static,
{
    <Option<T> as ValueType>::try_from(value.clone())
        .map(|typed| Box::new(typed) as BoxedParam)
        .map_err(|_| unsupported(value))
}

fn to_param(value: &Value) -> MergeResult<BoxedParam> {
    let param: BoxedParam = match value {
        Value::Bool(v) => Box::new(*v),
        // Postgres has no one-byte integer
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let converted = v.map(i64::try_from).transpose().map_err(|_| {
                MergeError::Other(format!(
                    "BigUnsigned value {v:?} exceeds i64::MAX ({}), cannot be safely cast to i64",
                    i64::MAX
                ))
            })?;
            Box::new(converted)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.clone()),
        Value::Char(v) => Box::new(v.map(|c| c.to_string())),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Json(v) => Box::new(v.as_deref().cloned()),
        Value::Uuid(_) => typed::<uuid::Uuid>(value)?,
        Value::ChronoDate(_) => typed::<chrono::NaiveDate>(value)?,
        Value::ChronoTime(_) => typed::<chrono::NaiveTime>(value)?,
        Value::ChronoDateTime(_) => typed::<chrono::NaiveDateTime>(value)?,
        Value::ChronoDateTimeUtc(_) => typed::<chrono::DateTime<chrono::Utc>>(value)?,
        Value::Decimal(_) => typed::<rust_decimal::Decimal>(value)?,
        _ => return Err(unsupported(value)),
    };
    Ok(param)
}

/// Convert SeaQuery values to `may_postgres` parameters and run `f` with them.
///
/// The converted parameters only live for the duration of `f`.
///
/// # Errors
///
/// Returns `MergeError::Other` for a value with no Postgres binding, or whatever `f` returns.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> MergeResult<R>
where
    F: FnOnce(&[&dyn ToSql]) -> MergeResult<R>,
{
    let owned = values.iter().map(to_param).collect::<MergeResult<Vec<_>>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|param| param.as_ref() as &dyn ToSql).collect();
    f(&params)
}
