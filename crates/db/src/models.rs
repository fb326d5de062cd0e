//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted DAG definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DagRow {
    /// Generated UUID, also stamped into the definition's `id` field.
    pub id: String,
    /// Full JSON DAG definition (steps, schema, …).
    pub definition: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
