//! DAG definition CRUD.
//!
//! Definitions are stored as JSONB documents keyed by a generated UUID; the
//! same id is stamped into the definition's `id` field so the document the
//! caller reads back names itself.

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DagRow;
use crate::DbError;

/// Insert a new definition under a fresh UUID and return the stored row.
pub async fn save_dag(pool: &PgPool, definition: &Value) -> Result<DagRow, DbError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut definition = definition.clone();
    if let Some(object) = definition.as_object_mut() {
        object.insert("id".into(), Value::String(id.clone()));
    }

    sqlx::query("INSERT INTO dags (id, definition, created_at) VALUES ($1, $2, $3)")
        .bind(&id)
        .bind(&definition)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(DagRow {
        id,
        definition,
        created_at: now,
    })
}

/// Fetch a single definition by id.
pub async fn get_dag(pool: &PgPool, id: &str) -> Result<DagRow, DbError> {
    sqlx::query_as::<_, DagRow>(
        "SELECT id, definition, created_at FROM dags WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Return all definitions, newest first.
pub async fn list_dags(pool: &PgPool) -> Result<Vec<DagRow>, DbError> {
    let rows = sqlx::query_as::<_, DagRow>(
        "SELECT id, definition, created_at FROM dags ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replace a definition by id. The path id wins over whatever `id` the body
/// carried.
pub async fn update_dag(pool: &PgPool, id: &str, definition: &Value) -> Result<(), DbError> {
    let mut definition = definition.clone();
    if let Some(object) = definition.as_object_mut() {
        object.insert("id".into(), Value::String(id.to_owned()));
    }

    let result = sqlx::query("UPDATE dags SET definition = $2 WHERE id = $1")
        .bind(id)
        .bind(&definition)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Permanently delete a definition by id.
pub async fn delete_dag(pool: &PgPool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM dags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
