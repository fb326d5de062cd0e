//! SQL compilation from structured clause maps.
//!
//! Where-clauses are `field → scalar` (equality shorthand) or
//! `field → {op → value}` with `eq gt lt gte lte like in`. Conditions join
//! with AND; every value flows as a positional `$N` parameter; `in` expands
//! an array into one placeholder per element. Clause iteration follows the
//! map's (sorted) key order, so the emitted SQL is deterministic and the
//! placeholder order matches the argument vector.
//!
//! Compilation is strict: an unknown operator, a non-array or empty `in`
//! list, or a null insert value is an error, never a dropped clause.

use serde_json::Value;

use adapters::JsonMap;

use crate::DbError;

/// `SELECT <columns> FROM <table> [WHERE …]`. Empty `columns` selects `*`.
pub fn build_select(
    table: &str,
    columns: &[String],
    filter: &JsonMap,
) -> Result<(String, Vec<Value>), DbError> {
    let column_list = if columns.is_empty() {
        "*".to_owned()
    } else {
        columns.join(", ")
    };
    let mut sql = format!("SELECT {column_list} FROM {table}");
    let mut args = Vec::new();
    append_where(&mut sql, &mut args, filter)?;
    Ok((sql, args))
}

/// `INSERT INTO <table> (…) VALUES (…)`.
pub fn build_insert(table: &str, row: &JsonMap) -> Result<(String, Vec<Value>), DbError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    let mut args = Vec::with_capacity(row.len());

    for (column, value) in row {
        if value.is_null() {
            return Err(DbError::InvalidRequest(format!(
                "column '{column}' cannot be null"
            )));
        }
        columns.push(column.as_str());
        placeholders.push(format!("${}", args.len() + 1));
        args.push(value.clone());
    }

    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", "),
    );
    Ok((sql, args))
}

/// `UPDATE <table> SET … [WHERE …]`. Placeholder numbering continues from
/// the SET clause into the WHERE clause.
pub fn build_update(
    table: &str,
    set: &JsonMap,
    filter: &JsonMap,
) -> Result<(String, Vec<Value>), DbError> {
    let mut assignments = Vec::with_capacity(set.len());
    let mut args = Vec::new();
    for (column, value) in set {
        args.push(value.clone());
        assignments.push(format!("{column} = ${}", args.len()));
    }

    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    append_where(&mut sql, &mut args, filter)?;
    Ok((sql, args))
}

/// `DELETE FROM <table> [WHERE …]`.
pub fn build_delete(table: &str, filter: &JsonMap) -> Result<(String, Vec<Value>), DbError> {
    let mut sql = format!("DELETE FROM {table}");
    let mut args = Vec::new();
    append_where(&mut sql, &mut args, filter)?;
    Ok((sql, args))
}

fn append_where(sql: &mut String, args: &mut Vec<Value>, filter: &JsonMap) -> Result<(), DbError> {
    if filter.is_empty() {
        return Ok(());
    }
    let clause = build_where(args, filter)?;
    sql.push_str(" WHERE ");
    sql.push_str(&clause);
    Ok(())
}

/// Compile the conditions, pushing their values onto `args` and numbering
/// placeholders after whatever is already there.
fn build_where(args: &mut Vec<Value>, filter: &JsonMap) -> Result<String, DbError> {
    let mut clauses = Vec::with_capacity(filter.len());

    for (field, condition) in filter {
        match condition {
            Value::Object(ops) => {
                for (op, value) in ops {
                    let sql_op = match op.as_str() {
                        "eq" => "=",
                        "gt" => ">",
                        "lt" => "<",
                        "gte" => ">=",
                        "lte" => "<=",
                        "like" => "LIKE",
                        "in" => {
                            clauses.push(in_clause(field, value, args)?);
                            continue;
                        }
                        other => {
                            return Err(DbError::InvalidRequest(format!(
                                "unknown where operator '{other}' on column '{field}'"
                            )));
                        }
                    };
                    clauses.push(comparison(field, sql_op, value, args));
                }
            }
            scalar => clauses.push(comparison(field, "=", scalar, args)),
        }
    }

    Ok(clauses.join(" AND "))
}

fn in_clause(field: &str, value: &Value, args: &mut Vec<Value>) -> Result<String, DbError> {
    let Value::Array(items) = value else {
        return Err(DbError::InvalidRequest(format!(
            "'in' condition on column '{field}' requires an array"
        )));
    };
    if items.is_empty() {
        return Err(DbError::InvalidRequest(format!(
            "'in' condition on column '{field}' requires a non-empty array"
        )));
    }

    let placeholders: Vec<String> = items
        .iter()
        .map(|item| {
            args.push(item.clone());
            format!("${}", args.len())
        })
        .collect();
    Ok(format!("{field} IN ({})", placeholders.join(", ")))
}

fn comparison(field: &str, op: &str, value: &Value, args: &mut Vec<Value>) -> String {
    args.push(value.clone());
    format!("{field} {op} ${}", args.len())
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn select_with_equality_shorthand() {
        let (sql, args) =
            build_select("t", &["id".to_owned()], &map(json!({ "id": 7 }))).unwrap();
        assert_eq!(sql, "SELECT id FROM t WHERE id = $1");
        assert_eq!(args, vec![json!(7)]);
    }

    #[test]
    fn select_without_columns_uses_star() {
        let (sql, args) = build_select("users", &[], &JsonMap::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(args.is_empty());
    }

    #[test]
    fn operator_conditions_and_join_with_and() {
        // serde_json::Map iterates in sorted key order.
        let (sql, args) = build_select(
            "orders",
            &[],
            &map(json!({ "status": "open", "total": { "gte": 100 } })),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders WHERE status = $1 AND total >= $2"
        );
        assert_eq!(args, vec![json!("open"), json!(100)]);
    }

    #[test]
    fn like_condition() {
        let (sql, args) =
            build_select("users", &[], &map(json!({ "name": { "like": "a%" } }))).unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE name LIKE $1");
        assert_eq!(args, vec![json!("a%")]);
    }

    #[test]
    fn in_condition_expands_placeholders() {
        let (sql, args) =
            build_select("t", &[], &map(json!({ "id": { "in": [1, 2, 3] } }))).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN ($1, $2, $3)");
        assert_eq!(args, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn unknown_operator_is_rejected_not_dropped() {
        let err =
            build_select("t", &[], &map(json!({ "status": { "contains": "x" } }))).unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
        assert!(err.to_string().contains("contains"), "got: {err}");
    }

    #[test]
    fn in_condition_requires_an_array() {
        let err = build_select("t", &[], &map(json!({ "id": { "in": "7" } }))).unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
    }

    #[test]
    fn in_condition_rejects_an_empty_array() {
        let err = build_select("t", &[], &map(json!({ "id": { "in": [] } }))).unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
    }

    #[test]
    fn insert_columns_follow_map_order() {
        let (sql, args) =
            build_insert("users", &map(json!({ "age": 36, "name": "ada" }))).unwrap();
        assert_eq!(sql, "INSERT INTO users (age, name) VALUES ($1, $2)");
        assert_eq!(args, vec![json!(36), json!("ada")]);
    }

    #[test]
    fn insert_rejects_null_values() {
        let err = build_insert("users", &map(json!({ "name": null }))).unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
    }

    #[test]
    fn update_placeholders_continue_into_where() {
        let (sql, args) = build_update(
            "users",
            &map(json!({ "name": "ada" })),
            &map(json!({ "id": 7 })),
        )
        .unwrap();
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(args, vec![json!("ada"), json!(7)]);
    }

    #[test]
    fn update_with_bad_operator_is_rejected() {
        let err = build_update(
            "users",
            &map(json!({ "name": "ada" })),
            &map(json!({ "id": { "within": [1] } })),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
    }

    #[test]
    fn delete_without_filter_has_no_where() {
        let (sql, args) = build_delete("sessions", &JsonMap::new()).unwrap();
        assert_eq!(sql, "DELETE FROM sessions");
        assert!(args.is_empty());
    }

    #[test]
    fn delete_with_filter() {
        let (sql, args) = build_delete("sessions", &map(json!({ "expired": true }))).unwrap();
        assert_eq!(sql, "DELETE FROM sessions WHERE expired = $1");
        assert_eq!(args, vec![json!(true)]);
    }
}
