//! Inner/left/right joins over two in-memory result sets.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{JoinKind, JsonMap};
use crate::ops::OpError;

/// Join two datasets on the given key pairs (`left column → right column`).
///
/// Matching uses deep equality across every pair; matched rows merge with
/// right-hand fields winning on collisions. Left/right joins keep unmatched
/// rows of their side as-is, pairing each row with at most the first match.
pub fn perform_join(
    left: &[Value],
    right: &[Value],
    on: &BTreeMap<String, String>,
    kind: JoinKind,
) -> Result<Vec<Value>, OpError> {
    let left_rows = as_rows(left, "join left")?;
    let right_rows = as_rows(right, "join right")?;

    let mut result = Vec::new();
    match kind {
        JoinKind::Inner => {
            for left_row in &left_rows {
                for right_row in &right_rows {
                    if rows_match(left_row, right_row, on) {
                        result.push(merge(left_row, right_row));
                    }
                }
            }
        }
        JoinKind::Left => {
            for left_row in &left_rows {
                match right_rows.iter().find(|r| rows_match(left_row, r, on)) {
                    Some(right_row) => result.push(merge(left_row, right_row)),
                    None => result.push(Value::Object((*left_row).clone())),
                }
            }
        }
        JoinKind::Right => {
            for right_row in &right_rows {
                match left_rows.iter().find(|l| rows_match(l, right_row, on)) {
                    Some(left_row) => result.push(merge(left_row, right_row)),
                    None => result.push(Value::Object((*right_row).clone())),
                }
            }
        }
    }
    Ok(result)
}

fn as_rows<'a>(dataset: &'a [Value], side: &'static str) -> Result<Vec<&'a JsonMap>, OpError> {
    dataset
        .iter()
        .map(|item| item.as_object().ok_or(OpError::NotRows(side)))
        .collect()
}

fn rows_match(left: &JsonMap, right: &JsonMap, on: &BTreeMap<String, String>) -> bool {
    on.iter().all(|(left_key, right_key)| {
        left.get(left_key).unwrap_or(&Value::Null) == right.get(right_key).unwrap_or(&Value::Null)
    })
}

fn merge(left: &JsonMap, right: &JsonMap) -> Value {
    let mut merged = left.clone();
    for (key, value) in right {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}
