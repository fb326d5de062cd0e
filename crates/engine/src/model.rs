//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory. They serialise to/from the on-wire DAG JSON (camelCase field
//! names) and to the JSONB `definition` column of the `dags` table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use adapters::{HttpMethod, JsonMap};

// ---------------------------------------------------------------------------
// Dag
// ---------------------------------------------------------------------------

/// A complete workflow definition: a directed acyclic graph of typed steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dag {
    /// Assigned on save; empty for ad-hoc executions.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema the run input must satisfy. `null` means unconstrained.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
    pub steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
///
/// `then` lists control edges: the steps fanned out to after this one
/// succeeds. `depends_on` lists data edges: the steps whose results must
/// exist before this one runs. The two are independent — a step that reads
/// `$results.x` must list `x` in `depends_on` even if it is also reached
/// through `x`'s `then`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within the workflow (referenced by edges).
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Kind-specific parameters, tagged by the `type` field.
    #[serde(flatten)]
    pub params: StepParams,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<String>,
    #[serde(rename = "dependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Parameters per step kind.
///
/// Each variant carries only its own fields; an unknown `type` string is a
/// deserialisation failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepParams {
    /// `SELECT` against the relational store.
    Query {
        table: String,
        #[serde(default)]
        select: Vec<String>,
        #[serde(rename = "where", default)]
        where_clause: JsonMap,
    },
    /// `INSERT` one row built from `map` (column → expression).
    Insert {
        table: String,
        map: JsonMap,
    },
    /// `UPDATE` matching rows with the resolved `set` map.
    Update {
        table: String,
        set: JsonMap,
        #[serde(rename = "where", default)]
        where_clause: JsonMap,
    },
    /// `DELETE` matching rows.
    Delete {
        table: String,
        #[serde(rename = "where", default)]
        where_clause: JsonMap,
    },
    /// Outbound HTTP call.
    Http {
        method: HttpMethod,
        url: String,
        #[serde(default)]
        headers: std::collections::HashMap<String, String>,
        #[serde(default)]
        query: JsonMap,
        #[serde(default)]
        body: JsonMap,
    },
    /// Predicate branch: `then` fires on true, `else` on false.
    Condition {
        #[serde(rename = "if")]
        predicate: Condition,
        #[serde(rename = "else", default)]
        else_branch: Vec<String>,
    },
    /// In-memory join of two predecessor result sets.
    Join {
        left: String,
        right: String,
        #[serde(default)]
        on: std::collections::BTreeMap<String, String>,
        // Not "type": that key is the step-kind tag on the flattened wire
        // shape, so the join flavour needs its own name.
        #[serde(rename = "joinType", default)]
        kind: JoinKind,
    },
    /// Retain the rows of the single predecessor that match every condition.
    Filter {
        filter: JsonMap,
    },
    /// The distinguished step whose resolved `source` is the run's result.
    Output {
        #[serde(default)]
        schema: Value,
        source: String,
    },
    /// Named mapping functions of the legacy format. Parsed for wire
    /// compatibility; rejected at execution.
    Map {
        function: String,
    },
}

impl StepParams {
    /// Short kind name, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Http { .. } => "http",
            Self::Condition { .. } => "condition",
            Self::Join { .. } => "join",
            Self::Filter { .. } => "filter",
            Self::Output { .. } => "output",
            Self::Map { .. } => "map",
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Join flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Comparison and combination operators for condition steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    And,
    Or,
}

/// A recursive predicate. Either side may be a literal, a `$` expression
/// string, or a nested condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub left: Operand,
    pub right: Operand,
    pub operator: Operator,
}

/// One side of a condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// Nested condition, evaluated to a boolean first.
    Nested(Box<Condition>),
    /// Literal JSON value; strings go through the value resolver.
    Literal(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_params_tag_on_type_field() {
        let step: Step = serde_json::from_value(json!({
            "id": "fetch",
            "name": "fetch users",
            "type": "query",
            "table": "users",
            "select": ["id", "name"],
            "where": { "active": true },
            "then": ["notify"],
            "dependsOn": []
        }))
        .unwrap();

        match &step.params {
            StepParams::Query {
                table,
                select,
                where_clause,
            } => {
                assert_eq!(table, "users");
                assert_eq!(select, &["id", "name"]);
                assert_eq!(where_clause.get("active"), Some(&json!(true)));
            }
            other => panic!("expected query params, got {}", other.kind()),
        }
        assert_eq!(step.then, vec!["notify"]);
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        let result: Result<Step, _> = serde_json::from_value(json!({
            "id": "x",
            "type": "teleport"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_http_method_is_rejected() {
        let result: Result<Step, _> = serde_json::from_value(json!({
            "id": "x",
            "type": "http",
            "method": "BREW",
            "url": "https://example.com"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn join_flavour_has_its_own_wire_name() {
        let step: Step = serde_json::from_value(json!({
            "id": "j",
            "type": "join",
            "left": "a",
            "right": "b",
            "on": { "id": "user_id" },
            "joinType": "left",
            "dependsOn": ["a", "b"]
        }))
        .unwrap();

        match &step.params {
            StepParams::Join { kind, on, .. } => {
                assert_eq!(*kind, JoinKind::Left);
                assert_eq!(on.get("id").map(String::as_str), Some("user_id"));
            }
            other => panic!("expected join params, got {}", other.kind()),
        }
    }

    #[test]
    fn join_flavour_defaults_to_inner() {
        let step: Step = serde_json::from_value(json!({
            "id": "j",
            "type": "join",
            "left": "a",
            "right": "b",
            "on": {}
        }))
        .unwrap();
        assert!(matches!(
            step.params,
            StepParams::Join { kind: JoinKind::Inner, .. }
        ));
    }

    #[test]
    fn condition_operands_nest() {
        let cond: Condition = serde_json::from_value(json!({
            "left": {
                "left": "$input.n",
                "right": 10,
                "operator": "gt"
            },
            "right": true,
            "operator": "eq"
        }))
        .unwrap();

        assert!(matches!(cond.left, Operand::Nested(_)));
        assert!(matches!(cond.right, Operand::Literal(Value::Bool(true))));
        assert_eq!(cond.operator, Operator::Eq);
    }

    #[test]
    fn dag_round_trips_through_json() {
        let original = json!({
            "id": "d-1",
            "name": "orders",
            "inputSchema": { "type": "object" },
            "steps": [
                {
                    "id": "a",
                    "type": "query",
                    "table": "orders",
                    "select": [],
                    "where": { "id": "$input.id" },
                    "then": ["out"]
                },
                {
                    "id": "out",
                    "name": "output",
                    "type": "output",
                    "schema": { "type": "array" },
                    "source": "$results.a",
                    "dependsOn": ["a"]
                }
            ]
        });

        let dag: Dag = serde_json::from_value(original).unwrap();
        let reparsed: Dag = serde_json::from_value(serde_json::to_value(&dag).unwrap()).unwrap();

        assert_eq!(reparsed.id, dag.id);
        assert_eq!(reparsed.steps.len(), dag.steps.len());
        assert_eq!(reparsed.steps[1].depends_on, vec!["a"]);
        assert!(matches!(reparsed.steps[1].params, StepParams::Output { .. }));
    }
}
