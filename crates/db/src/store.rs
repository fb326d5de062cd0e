//! `PgStore` — the Postgres implementation of `RelationalStore`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};

use adapters::{AdapterError, JsonMap, RelationalStore};

use crate::pool::{self, DbPool};
use crate::{query, scan, DbError};

/// Handles the relational operations workflow steps execute against.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect and verify the connection.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = pool::create_pool(database_url).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close the pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run `f` inside a transaction: any error rolls back, success commits.
    pub async fn execute_in_transaction<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut Transaction<'static, Postgres>) -> BoxFuture<'t, Result<T, DbError>>
            + Send,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    async fn fetch(&self, sql: &str, args: &[Value]) -> Result<Vec<PgRow>, AdapterError> {
        let mut q = sqlx::query(sql);
        for arg in args {
            q = bind_value(q, arg);
        }
        q.fetch_all(&self.pool)
            .await
            .map_err(|e| AdapterError::Database(e.to_string()))
    }

    async fn mutate(&self, sql: &str, args: &[Value]) -> Result<u64, AdapterError> {
        let mut q = sqlx::query(sql);
        for arg in args {
            q = bind_value(q, arg);
        }
        let result = q
            .execute(&self.pool)
            .await
            .map_err(|e| AdapterError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

/// Clause-compilation failures are the caller's fault; everything else is
/// the database's.
fn compile_error(err: DbError) -> AdapterError {
    match err {
        DbError::InvalidRequest(message) => AdapterError::InvalidRequest(message),
        other => AdapterError::Database(other.to_string()),
    }
}

/// Bind one JSON value with its natural Postgres type; objects and arrays
/// go over as JSONB.
fn bind_value<'q>(
    q: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => q.bind(Option::<String>::None),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else {
                q.bind(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => q.bind(s.clone()),
        container => q.bind(container.clone()),
    }
}

#[async_trait]
impl RelationalStore for PgStore {
    async fn create(&self, table: &str, row: &JsonMap) -> Result<Value, AdapterError> {
        let (sql, args) = query::build_insert(table, row).map_err(compile_error)?;
        let affected = self.mutate(&sql, &args).await?;
        Ok(json!(affected))
    }

    async fn retrieve(
        &self,
        table: &str,
        columns: &[String],
        filter: &JsonMap,
    ) -> Result<Vec<Value>, AdapterError> {
        let (sql, args) = query::build_select(table, columns, filter).map_err(compile_error)?;
        let rows = self.fetch(&sql, &args).await?;
        rows.iter()
            .map(|row| scan::row_to_json(row).map_err(|e| AdapterError::Database(e.to_string())))
            .collect()
    }

    async fn update(
        &self,
        table: &str,
        set: &JsonMap,
        filter: &JsonMap,
    ) -> Result<Value, AdapterError> {
        let (sql, args) = query::build_update(table, set, filter).map_err(compile_error)?;
        let affected = self.mutate(&sql, &args).await?;
        Ok(json!(affected))
    }

    async fn delete(&self, table: &str, filter: &JsonMap) -> Result<Value, AdapterError> {
        let (sql, args) = query::build_delete(table, filter).map_err(compile_error)?;
        let affected = self.mutate(&sql, &args).await?;
        Ok(json!(affected))
    }

    async fn table_names(&self) -> Result<Vec<String>, AdapterError> {
        let mut filter = JsonMap::new();
        filter.insert("table_schema".into(), json!("public"));
        let rows = self
            .retrieve(
                "information_schema.tables",
                &["table_name".to_owned()],
                &filter,
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("table_name").and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<BTreeMap<String, String>, AdapterError> {
        let mut filter = JsonMap::new();
        filter.insert("table_name".into(), json!(table));
        filter.insert("table_schema".into(), json!("public"));
        let rows = self
            .retrieve(
                "information_schema.columns",
                &["column_name".to_owned(), "udt_name".to_owned()],
                &filter,
            )
            .await?;

        let mut columns = BTreeMap::new();
        for row in &rows {
            if let (Some(name), Some(udt)) = (
                row.get("column_name").and_then(Value::as_str),
                row.get("udt_name").and_then(Value::as_str),
            ) {
                columns.insert(name.to_owned(), udt.to_owned());
            }
        }
        Ok(columns)
    }
}
