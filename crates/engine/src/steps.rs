//! Per-kind step execution.
//!
//! Each executor resolves its parameters against the run context, performs
//! the step's effect, and reports the value to publish plus the successors
//! to fan out to. Only the condition step deviates from `then` fan-out: its
//! `then` branch fires on a true predicate, its `else` branch on false.

use serde_json::Value;

use crate::condition;
use crate::error::StepError;
use crate::executor::Execution;
use crate::model::{Step, StepParams};
use crate::ops;
use crate::resolve;

/// What a finished step hands back to the scheduler.
pub(crate) struct StepOutput {
    /// The value published under the step's id.
    pub value: Value,
    /// Control-edge successors to spawn.
    pub successors: Vec<String>,
}

pub(crate) async fn run(step: &Step, exec: &Execution) -> Result<StepOutput, StepError> {
    let ctx = &exec.ctx;

    match &step.params {
        StepParams::Query {
            table,
            select,
            where_clause,
        } => {
            let filter = resolve::resolve_map(where_clause, ctx)?;
            let rows = exec.store.retrieve(table, select, &filter).await?;
            Ok(fan_out(Value::Array(rows), step))
        }

        StepParams::Insert { table, map } => {
            let row = resolve::resolve_map(map, ctx)?;
            let ack = exec.store.create(table, &row).await?;
            Ok(fan_out(ack, step))
        }

        StepParams::Update {
            table,
            set,
            where_clause,
        } => {
            let set = resolve::resolve_map(set, ctx)?;
            let filter = resolve::resolve_map(where_clause, ctx)?;
            let count = exec.store.update(table, &set, &filter).await?;
            Ok(fan_out(count, step))
        }

        StepParams::Delete {
            table,
            where_clause,
        } => {
            let filter = resolve::resolve_map(where_clause, ctx)?;
            let count = exec.store.delete(table, &filter).await?;
            Ok(fan_out(count, step))
        }

        StepParams::Http {
            method,
            url,
            headers,
            query,
            body,
        } => {
            let url = match resolve::resolve_str(url, ctx)? {
                Value::String(s) => s,
                other => resolve::stringify(&other),
            };
            let query = resolve::resolve_map(query, ctx)?;
            let body = resolve::resolve_map(body, ctx)?;
            let mut resolved_headers = std::collections::HashMap::new();
            for (key, value) in headers {
                let resolved = resolve::resolve_str(value, ctx)?;
                resolved_headers.insert(key.clone(), resolve::stringify(&resolved));
            }

            let response = exec
                .http
                .send(*method, &url, &query, &body, &resolved_headers)
                .await?;
            let value = serde_json::to_value(&response)
                .map_err(|e| StepError::InvalidParams(e.to_string()))?;
            Ok(fan_out(value, step))
        }

        StepParams::Condition {
            predicate,
            else_branch,
        } => {
            let truthy = condition::evaluate(predicate, ctx)?;
            let successors = if truthy {
                step.then.clone()
            } else {
                else_branch.clone()
            };
            // A condition carries control, not data.
            Ok(StepOutput {
                value: Value::Null,
                successors,
            })
        }

        StepParams::Join {
            left,
            right,
            on,
            kind,
        } => {
            if step.depends_on.len() != 2 {
                return Err(StepError::InvalidParams(
                    "join step requires exactly two dependencies".into(),
                ));
            }
            let left_rows = dataset(exec, left)?;
            let right_rows = dataset(exec, right)?;
            let joined = ops::perform_join(&left_rows, &right_rows, on, *kind)?;
            Ok(fan_out(Value::Array(joined), step))
        }

        StepParams::Filter { filter } => {
            let [dependency] = step.depends_on.as_slice() else {
                return Err(StepError::InvalidParams(
                    "filter step requires exactly one dependency".into(),
                ));
            };
            let rows = dataset(exec, dependency)?;
            let kept = ops::apply_filter(&rows, filter)?;
            Ok(fan_out(Value::Array(kept), step))
        }

        StepParams::Output { source, .. } => {
            let value = resolve::resolve_str(source, ctx)?;
            Ok(fan_out(value, step))
        }

        StepParams::Map { .. } => Err(StepError::Unsupported("map")),
    }
}

fn fan_out(value: Value, step: &Step) -> StepOutput {
    StepOutput {
        value,
        successors: step.then.clone(),
    }
}

/// Fetch a predecessor's result as an array of rows.
fn dataset(exec: &Execution, step_id: &str) -> Result<Vec<Value>, StepError> {
    let value = exec
        .ctx
        .result(step_id)
        .ok_or_else(|| StepError::MissingResult(step_id.to_owned()))?;
    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err(StepError::InvalidParams(format!(
            "result of step '{step_id}' is not an array"
        ))),
    }
}
