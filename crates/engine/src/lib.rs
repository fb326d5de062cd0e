//! `engine` crate — the DAG data model, the value-resolution sublanguage,
//! and the parallel execution engine.

pub mod condition;
pub mod context;
pub mod error;
pub mod executor;
pub mod model;
pub mod ops;
pub mod resolve;
pub mod schema;
pub mod validate;

mod steps;

pub use context::Context;
pub use error::{EngineError, StepError};
pub use executor::Executor;
pub use model::{Condition, Dag, JoinKind, JsonMap, Operand, Operator, Step, StepParams};
pub use validate::plan;
