//! Structural validation — run this before persisting or executing a DAG.
//!
//! Rules enforced:
//! 1. Step IDs must be unique within the workflow.
//! 2. Every reference (`then`, `dependsOn`, condition `else`, join
//!    `left`/`right`) must name an existing step.
//! 3. No step may reference itself.
//! 4. Exactly one step carries output params.
//! 5. At least one step must be a root (nobody's successor, no
//!    dependencies), or nothing could ever start.
//!
//! Returns an execution plan on success: the step index, the root set, and
//! the output step id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::{Dag, Step, StepParams};
use crate::EngineError;

/// The validated shape of a DAG, ready for the executor.
pub struct Plan {
    /// Step id → step.
    pub steps: HashMap<String, Arc<Step>>,
    /// Steps with no predecessor; all started concurrently.
    pub roots: Vec<String>,
    /// Id of the single output step.
    pub output: String,
}

/// Validate the workflow's structure and compute its execution plan.
///
/// # Errors
/// - [`EngineError::DuplicateStepId`] if two steps share an ID.
/// - [`EngineError::UnknownStepReference`] for a dangling reference.
/// - [`EngineError::SelfDependency`] if a step names itself.
/// - [`EngineError::NoOutputStep`] / [`EngineError::MultipleOutputSteps`].
/// - [`EngineError::NoRootStep`] if no step could ever start.
pub fn plan(dag: &Dag) -> Result<Plan, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Index steps, rejecting duplicate IDs.
    // -----------------------------------------------------------------------
    let mut steps: HashMap<String, Arc<Step>> = HashMap::with_capacity(dag.steps.len());
    for step in &dag.steps {
        if steps
            .insert(step.id.clone(), Arc::new(step.clone()))
            .is_some()
        {
            return Err(EngineError::DuplicateStepId(step.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Check every reference and collect successor-ship.
    // -----------------------------------------------------------------------
    let mut has_predecessor: HashSet<&str> = HashSet::new();
    for step in &dag.steps {
        for reference in references(step) {
            if !steps.contains_key(reference) {
                return Err(EngineError::UnknownStepReference {
                    referenced: reference.to_owned(),
                    by: step.id.clone(),
                });
            }
            if reference == step.id {
                return Err(EngineError::SelfDependency(step.id.clone()));
            }
        }
        for successor in successor_refs(step) {
            has_predecessor.insert(successor);
        }
    }

    // -----------------------------------------------------------------------
    // 3. Exactly one output step.
    // -----------------------------------------------------------------------
    let mut outputs = dag
        .steps
        .iter()
        .filter(|s| matches!(s.params, StepParams::Output { .. }));
    let output = match (outputs.next(), outputs.next()) {
        (Some(step), None) => step.id.clone(),
        (Some(_), Some(_)) => return Err(EngineError::MultipleOutputSteps),
        (None, _) => return Err(EngineError::NoOutputStep),
    };

    // -----------------------------------------------------------------------
    // 4. Root discovery: nobody's successor, no declared dependencies.
    // -----------------------------------------------------------------------
    let roots: Vec<String> = dag
        .steps
        .iter()
        .filter(|s| !has_predecessor.contains(s.id.as_str()) && s.depends_on.is_empty())
        .map(|s| s.id.clone())
        .collect();
    if roots.is_empty() && !dag.steps.is_empty() {
        return Err(EngineError::NoRootStep);
    }

    Ok(Plan {
        steps,
        roots,
        output,
    })
}

/// Every step id this step mentions.
fn references(step: &Step) -> impl Iterator<Item = &str> {
    let join_refs: Vec<&str> = match &step.params {
        StepParams::Join { left, right, .. } => vec![left.as_str(), right.as_str()],
        _ => Vec::new(),
    };
    step.then
        .iter()
        .map(String::as_str)
        .chain(step.depends_on.iter().map(String::as_str))
        .chain(else_branch(step))
        .chain(join_refs)
}

/// The ids this step fans out to (control edges only).
fn successor_refs(step: &Step) -> impl Iterator<Item = &str> {
    step.then.iter().map(String::as_str).chain(else_branch(step))
}

fn else_branch(step: &Step) -> impl Iterator<Item = &str> {
    let branch: &[String] = match &step.params {
        StepParams::Condition { else_branch, .. } => else_branch,
        _ => &[],
    };
    branch.iter().map(String::as_str)
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dag(steps: serde_json::Value) -> Dag {
        serde_json::from_value(json!({
            "name": "test",
            "inputSchema": null,
            "steps": steps
        }))
        .unwrap()
    }

    fn query(id: &str) -> serde_json::Value {
        json!({ "id": id, "type": "query", "table": "t" })
    }

    fn output(id: &str, depends_on: &[&str]) -> serde_json::Value {
        json!({
            "id": id,
            "type": "output",
            "source": "$results.a",
            "dependsOn": depends_on
        })
    }

    #[test]
    fn linear_dag_has_single_root() {
        let mut a = query("a");
        a["then"] = json!(["out"]);
        let plan = plan(&dag(json!([a, output("out", &["a"])]))).unwrap();
        assert_eq!(plan.roots, vec!["a"]);
        assert_eq!(plan.output, "out");
    }

    #[test]
    fn diamond_has_one_root() {
        //   a
        //  / \
        // b   c
        //  \ /
        //  out
        let mut a = query("a");
        a["then"] = json!(["b", "c"]);
        let mut b = query("b");
        b["then"] = json!(["out"]);
        let mut c = query("c");
        c["then"] = json!(["out"]);
        let plan = plan(&dag(json!([a, b, c, output("out", &["b", "c"])]))).unwrap();
        assert_eq!(plan.roots, vec!["a"]);
    }

    #[test]
    fn parallel_roots_are_all_discovered() {
        let plan = plan(&dag(json!([query("a"), query("b"), output("out", &["a", "b"])])))
            .unwrap();
        let mut roots = plan.roots;
        roots.sort();
        assert_eq!(roots, vec!["a", "b"]);
    }

    #[test]
    fn duplicate_step_id_is_rejected() {
        let result = plan(&dag(json!([query("a"), query("a"), output("out", &[])])));
        assert!(matches!(result, Err(EngineError::DuplicateStepId(id)) if id == "a"));
    }

    #[test]
    fn dangling_then_reference_is_rejected() {
        let mut a = query("a");
        a["then"] = json!(["ghost"]);
        let result = plan(&dag(json!([a, output("out", &[])])));
        assert!(matches!(
            result,
            Err(EngineError::UnknownStepReference { referenced, .. }) if referenced == "ghost"
        ));
    }

    #[test]
    fn dangling_join_reference_is_rejected() {
        let j = json!({
            "id": "j",
            "type": "join",
            "left": "a",
            "right": "missing",
            "on": {},
            "dependsOn": ["a", "a"]
        });
        let result = plan(&dag(json!([query("a"), j, output("out", &[])])));
        assert!(matches!(
            result,
            Err(EngineError::UnknownStepReference { referenced, .. }) if referenced == "missing"
        ));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut a = query("a");
        a["dependsOn"] = json!(["a"]);
        let result = plan(&dag(json!([a, output("out", &[])])));
        assert!(matches!(result, Err(EngineError::SelfDependency(id)) if id == "a"));
    }

    #[test]
    fn exactly_one_output_step_is_required() {
        assert!(matches!(
            plan(&dag(json!([query("a")]))),
            Err(EngineError::NoOutputStep)
        ));
        assert!(matches!(
            plan(&dag(json!([output("o1", &[]), output("o2", &[])]))),
            Err(EngineError::MultipleOutputSteps)
        ));
    }

    #[test]
    fn dag_where_everything_waits_is_rejected() {
        let mut a = query("a");
        a["dependsOn"] = json!(["out"]);
        let result = plan(&dag(json!([a, output("out", &["a"])])));
        assert!(matches!(result, Err(EngineError::NoRootStep)));
    }
}
