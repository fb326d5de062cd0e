//! Row filtering for the `filter` step kind.

use std::cmp::Ordering;

use serde_json::Value;

use crate::model::JsonMap;
use crate::ops::OpError;
use crate::resolve::stringify;

/// Retain the rows that satisfy every condition.
///
/// A condition is either `field: value` (deep equality) or
/// `field: {op: value}` with `op ∈ {gt, gte, lt, lte, ne}`. A missing field
/// compares as null.
pub fn apply_filter(dataset: &[Value], conditions: &JsonMap) -> Result<Vec<Value>, OpError> {
    let mut result = Vec::new();
    for item in dataset {
        let row = item.as_object().ok_or(OpError::NotRows("filter"))?;
        if matches(row, conditions)? {
            result.push(item.clone());
        }
    }
    Ok(result)
}

fn matches(row: &JsonMap, conditions: &JsonMap) -> Result<bool, OpError> {
    for (field, condition) in conditions {
        let actual = row.get(field).unwrap_or(&Value::Null);
        match condition {
            Value::Object(ops) => {
                for (op, expected) in ops {
                    if !holds(actual, op, expected)? {
                        return Ok(false);
                    }
                }
            }
            literal => {
                if actual != literal {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn holds(actual: &Value, op: &str, expected: &Value) -> Result<bool, OpError> {
    let result = match op {
        "gt" => compare(actual, expected) == Ordering::Greater,
        "gte" => compare(actual, expected) != Ordering::Less,
        "lt" => compare(actual, expected) == Ordering::Less,
        "lte" => compare(actual, expected) != Ordering::Greater,
        "ne" => actual != expected,
        other => return Err(OpError::UnknownOperator(other.to_owned())),
    };
    Ok(result)
}

/// Numeric comparison when both sides are numbers, string form otherwise.
fn compare(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    stringify(a).cmp(&stringify(b))
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({ "id": 1, "total": 10.0, "status": "open" }),
            json!({ "id": 2, "total": 25.0, "status": "open" }),
            json!({ "id": 3, "total": 40.0, "status": "closed" }),
        ]
    }

    fn conditions(value: Value) -> JsonMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn literal_condition_is_deep_equality() {
        let result = apply_filter(&rows(), &conditions(json!({ "status": "open" }))).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn operator_conditions_compare_numerically() {
        let result = apply_filter(&rows(), &conditions(json!({ "total": { "gt": 20 } }))).unwrap();
        assert_eq!(result.len(), 2);

        let result =
            apply_filter(&rows(), &conditions(json!({ "total": { "lte": 25 } }))).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn conditions_combine_with_and() {
        let result = apply_filter(
            &rows(),
            &conditions(json!({ "status": "open", "total": { "gte": 25 } })),
        )
        .unwrap();
        assert_eq!(result, vec![json!({ "id": 2, "total": 25.0, "status": "open" })]);
    }

    #[test]
    fn ne_treats_missing_fields_as_null() {
        let result =
            apply_filter(&rows(), &conditions(json!({ "ghost": { "ne": 1 } }))).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert_eq!(
            apply_filter(&rows(), &conditions(json!({ "total": { "between": 1 } }))),
            Err(OpError::UnknownOperator("between".into()))
        );
    }

    #[test]
    fn non_object_rows_are_rejected() {
        assert_eq!(
            apply_filter(&[json!(1)], &JsonMap::new()),
            Err(OpError::NotRows("filter"))
        );
    }
}
