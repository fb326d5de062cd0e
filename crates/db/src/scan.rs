//! Row decoding — renders Postgres rows into JSON objects.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use uuid::Uuid;

use crate::DbError;

/// Convert one row to a JSON object, column by column.
///
/// Types without a direct JSON rendering fall back to their text form;
/// anything undecodable becomes null.
pub fn row_to_json(row: &PgRow) -> Result<Value, DbError> {
    let mut object = serde_json::Map::with_capacity(row.columns().len());

    for (index, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(index)?
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "INT2" => int_value(row.try_get::<Option<i16>, _>(index)?.map(i64::from)),
            "INT4" => int_value(row.try_get::<Option<i32>, _>(index)?.map(i64::from)),
            "INT8" => int_value(row.try_get::<Option<i64>, _>(index)?),
            "FLOAT4" => float_value(row.try_get::<Option<f32>, _>(index)?.map(f64::from)),
            "FLOAT8" => float_value(row.try_get::<Option<f64>, _>(index)?),
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(index)?
                .map(Value::String)
                .unwrap_or(Value::Null),
            "UUID" => row
                .try_get::<Option<Uuid>, _>(index)?
                .map(|u| Value::String(u.to_string()))
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(|t| Value::String(t.to_rfc3339()))
                .unwrap_or(Value::Null),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(index)?
                .map(|t| Value::String(t.to_string()))
                .unwrap_or(Value::Null),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(index)?
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null),
            "JSON" | "JSONB" => row
                .try_get::<Option<Value>, _>(index)?
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String)
                .unwrap_or(Value::Null),
        };
        object.insert(column.name().to_owned(), value);
    }

    Ok(Value::Object(object))
}

fn int_value(value: Option<i64>) -> Value {
    value.map(|i| Value::Number(i.into())).unwrap_or(Value::Null)
}

fn float_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
