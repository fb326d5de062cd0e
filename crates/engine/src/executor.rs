//! The parallel workflow executor.
//!
//! `Executor` is the long-lived entry point: it validates input against the
//! DAG's schema, plans the graph, then runs one tokio task per started step.
//!
//! Scheduling model:
//! - every step owns a one-shot readiness channel; publishing a result flips
//!   it, and dependents await the channels of their `dependsOn` list;
//! - a spawned-set deduplicates fan-in, so a step reached from several
//!   `then` lists starts at most once;
//! - the first step failure is recorded, an abort signal unwinds all waiting
//!   tasks, and no further tasks spawn; in-flight work runs to its next
//!   suspension point and any later errors are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use adapters::{HttpAdapter, RelationalStore};

use crate::context::Context;
use crate::error::{EngineError, StepError};
use crate::model::{Dag, Step, StepParams};
use crate::validate::{self, Plan};
use crate::{schema, steps};

/// Stateless orchestrator that runs DAG executions against a relational
/// store and an HTTP client.
pub struct Executor {
    store: Arc<dyn RelationalStore>,
    http: Arc<dyn HttpAdapter>,
}

impl Executor {
    pub fn new(store: Arc<dyn RelationalStore>, http: Arc<dyn HttpAdapter>) -> Self {
        Self { store, http }
    }

    /// Run the DAG to completion and return the schema-validated output.
    ///
    /// # Errors
    /// Structural problems and input-schema violations fail before any step
    /// runs; otherwise the first step failure aborts the run and surfaces as
    /// `step <id> failed: <cause>`.
    #[instrument(skip(self, dag, input), fields(dag_id = %dag.id, dag_name = %dag.name))]
    pub async fn execute(&self, dag: &Dag, input: Value) -> Result<Value, EngineError> {
        schema::validate(&dag.input_schema, &input).map_err(EngineError::InputValidation)?;

        let plan = validate::plan(dag)?;
        info!(steps = plan.steps.len(), roots = plan.roots.len(), "dag validated");

        let execution = Execution::new(&plan, input, self.store.clone(), self.http.clone());
        for root in &plan.roots {
            execution.spawn(root);
        }
        execution.drain().await;

        if let Some((step_id, source)) = execution.take_error() {
            error!(step_id = %step_id, "run aborted");
            return Err(EngineError::StepFailed { step_id, source });
        }

        let output = execution.take_output().ok_or(EngineError::MissingOutput)?;
        let output_schema = match &plan.steps[&plan.output].params {
            StepParams::Output { schema, .. } => schema.clone(),
            _ => Value::Null,
        };
        schema::validate(&output_schema, &output).map_err(EngineError::OutputValidation)?;

        info!("run succeeded");
        Ok(output)
    }
}

/// Shared state of one in-flight run.
pub(crate) struct Execution {
    steps: HashMap<String, Arc<Step>>,
    pub(crate) ctx: Context,
    pub(crate) store: Arc<dyn RelationalStore>,
    pub(crate) http: Arc<dyn HttpAdapter>,

    /// Per-step readiness; flipped exactly once, after the result publishes.
    ready: HashMap<String, watch::Sender<bool>>,
    /// Steps already handed to the scheduler (the fan-in wait list).
    spawned: Mutex<HashSet<String>>,
    /// Handles of every spawned task, drained by the run driver.
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// First failure wins; later ones are dropped.
    first_error: Mutex<Option<(String, StepError)>>,
    /// Broadcast that unwinds waiting tasks after a failure.
    abort: watch::Sender<bool>,
    /// The output step's resolved value.
    output: Mutex<Option<Value>>,
    output_step: String,
}

// Execution is shared via Arc so step tasks can spawn their successors.
type Shared = Arc<Execution>;

impl Execution {
    fn new(
        plan: &Plan,
        input: Value,
        store: Arc<dyn RelationalStore>,
        http: Arc<dyn HttpAdapter>,
    ) -> Shared {
        let ready = plan
            .steps
            .keys()
            .map(|id| (id.clone(), watch::channel(false).0))
            .collect();

        Arc::new(Self {
            steps: plan.steps.clone(),
            ctx: Context::new(input),
            store,
            http,
            ready,
            spawned: Mutex::new(HashSet::new()),
            handles: Mutex::new(Vec::new()),
            first_error: Mutex::new(None),
            abort: watch::channel(false).0,
            output: Mutex::new(None),
            output_step: plan.output.clone(),
        })
    }

    /// Start a step task unless it already ran, is running, or the run has
    /// aborted. Safe to call from several predecessors — first one wins.
    fn spawn(self: &Shared, step_id: &str) {
        if *self.abort.borrow() {
            return;
        }
        if !self.spawned.lock().unwrap().insert(step_id.to_owned()) {
            return;
        }
        let step = self.steps[step_id].clone();
        let execution = self.clone();
        let handle = tokio::spawn(async move { execution.drive(step).await });
        self.handles.lock().unwrap().push(handle);
    }

    /// One step's lifecycle: wait for dependencies, execute, publish,
    /// fan out.
    async fn drive(self: Shared, step: Arc<Step>) {
        for dependency in &step.depends_on {
            if self.ctx.has_result(dependency) {
                continue;
            }
            let mut ready = self.ready[dependency].subscribe();
            let mut abort = self.abort.subscribe();
            tokio::select! {
                _ = abort.wait_for(|aborted| *aborted) => return,
                result = ready.wait_for(|done| *done) => {
                    if result.is_err() {
                        return;
                    }
                }
            }
        }
        if *self.abort.borrow() {
            return;
        }

        debug!(step_id = %step.id, kind = step.params.kind(), "executing step");
        match steps::run(&step, &self).await {
            Err(err) => self.fail(&step.id, err),
            Ok(output) => {
                self.ctx.publish(&step.id, output.value.clone());
                if step.id == self.output_step {
                    *self.output.lock().unwrap() = Some(output.value);
                }
                // send_replace stores the flag even when nobody subscribed
                // yet; a late dependent then takes the has_result fast path
                // or observes the stored value on subscribe.
                self.ready[&step.id].send_replace(true);
                debug!(step_id = %step.id, "step succeeded");

                for successor in &output.successors {
                    self.spawn(successor);
                }
            }
        }
    }

    fn fail(&self, step_id: &str, err: StepError) {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some((step_id.to_owned(), err));
        }
        // Later failures are dropped in favour of the first; everyone still
        // sees the abort.
        self.abort.send_replace(true);
    }

    /// Await every spawned task, including ones spawned while draining.
    async fn drain(&self) {
        loop {
            let handle = self.handles.lock().unwrap().pop();
            match handle {
                Some(handle) => {
                    let _ = handle.await;
                }
                None => break,
            }
        }
    }

    fn take_error(&self) -> Option<(String, StepError)> {
        self.first_error.lock().unwrap().take()
    }

    fn take_output(&self) -> Option<Value> {
        self.output.lock().unwrap().take()
    }
}
