//! Engine-level error types.

use thiserror::Error;

use crate::resolve::ResolveError;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Structural errors (detected before execution) ------

    /// Two or more steps share the same ID.
    #[error("duplicate step id: '{0}'")]
    DuplicateStepId(String),

    /// An edge or join references a step ID that doesn't exist.
    #[error("step '{by}' references unknown step '{referenced}'")]
    UnknownStepReference { referenced: String, by: String },

    /// A step names itself in `then`, `dependsOn` or `else`.
    #[error("step '{0}' depends on itself")]
    SelfDependency(String),

    /// No step carries output params.
    #[error("workflow has no output step")]
    NoOutputStep,

    /// More than one step carries output params.
    #[error("workflow has more than one output step")]
    MultipleOutputSteps,

    /// Every step is someone's successor or waits on a dependency, so
    /// nothing could ever start.
    #[error("workflow has no runnable root step")]
    NoRootStep,

    // ------ Run errors ------

    /// The run input failed the DAG's input schema.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// The resolved output failed the output step's schema.
    #[error("output validation failed: {0}")]
    OutputValidation(String),

    /// A step failed; the run was aborted.
    #[error("step {step_id} failed: {source}")]
    StepFailed {
        step_id: String,
        #[source]
        source: StepError,
    },

    /// The run drained without the output step recording a value.
    #[error("output step produced no value")]
    MissingOutput,
}

impl EngineError {
    /// True for errors a caller could have avoided by submitting a
    /// well-formed DAG (the HTTP layer maps these to 400).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStepId(_)
                | Self::UnknownStepReference { .. }
                | Self::SelfDependency(_)
                | Self::NoOutputStep
                | Self::MultipleOutputSteps
                | Self::NoRootStep
        )
    }
}

/// Errors from executing a single step.
#[derive(Debug, Error)]
pub enum StepError {
    /// A `$` reference or `${…}` interpolation could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The relational store or HTTP client failed.
    #[error(transparent)]
    Adapter(#[from] adapters::AdapterError),

    /// In-memory join/filter rejected its input.
    #[error(transparent)]
    Op(#[from] crate::ops::OpError),

    /// The step's parameters or wiring are unusable
    /// (join without two dependencies, missing operand, …).
    #[error("{0}")]
    InvalidParams(String),

    /// A declared dependency finished but left no readable result.
    #[error("result of step '{0}' is not available")]
    MissingResult(String),

    /// The step type parses but has no executor.
    #[error("unsupported step type: {0}")]
    Unsupported(&'static str),
}
