//! The per-run [`Context`]: immutable input plus the write-once results map.
//!
//! Created at run start, shared by every step task, discarded at run end.
//! Nothing persists between runs.

use std::sync::RwLock;

use serde_json::Value;

use crate::model::JsonMap;

/// Shared run state. `results` is keyed by step id and write-once per key;
/// readers only observe an entry after the producing step has published it.
pub struct Context {
    input: Value,
    results: RwLock<JsonMap>,
}

impl Context {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            results: RwLock::new(JsonMap::new()),
        }
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn has_result(&self, step_id: &str) -> bool {
        self.results.read().unwrap().contains_key(step_id)
    }

    /// Clone of one step's published result.
    pub fn result(&self, step_id: &str) -> Option<Value> {
        self.results.read().unwrap().get(step_id).cloned()
    }

    /// Publish a step result. Returns false (and leaves the map untouched)
    /// if the step already has one — results are write-once.
    pub fn publish(&self, step_id: &str, value: Value) -> bool {
        let mut results = self.results.write().unwrap();
        if results.contains_key(step_id) {
            return false;
        }
        results.insert(step_id.to_owned(), value);
        true
    }

    /// Run `f` against the results map without cloning it.
    pub fn with_results<R>(&self, f: impl FnOnce(&JsonMap) -> R) -> R {
        f(&self.results.read().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_are_write_once() {
        let ctx = Context::new(json!({}));
        assert!(ctx.publish("a", json!(1)));
        assert!(!ctx.publish("a", json!(2)));
        assert_eq!(ctx.result("a"), Some(json!(1)));
    }

    #[test]
    fn missing_result_is_none() {
        let ctx = Context::new(json!({}));
        assert!(!ctx.has_result("ghost"));
        assert_eq!(ctx.result("ghost"), None);
    }
}
