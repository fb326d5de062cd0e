//! In-memory dataset operations backing the `join` and `filter` step kinds.

pub mod filter;
pub mod join;

use thiserror::Error;

pub use filter::apply_filter;
pub use join::perform_join;

/// Rejections of malformed join/filter inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpError {
    /// The operand dataset is not an array of row objects.
    #[error("{0} input must be an array of rows")]
    NotRows(&'static str),

    /// A filter condition used an operator outside gt/gte/lt/lte/ne.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),
}
