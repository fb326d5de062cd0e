//! Typed errors for the persistence layer.

use thiserror::Error;

/// Failures from the pool, the SQL compiler, and the dags repository.
#[derive(Debug, Error)]
pub enum DbError {
    /// A structured clause map could not be compiled into SQL: an unknown
    /// where-operator, a non-array or empty `in` list, or a null insert
    /// value. Dropping such a clause instead would silently widen the
    /// query to every row.
    #[error("invalid query: {0}")]
    InvalidRequest(String),

    /// The requested DAG definition does not exist.
    #[error("dag not found")]
    NotFound,

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
