//! The `RelationalStore` and `HttpAdapter` traits — the contracts every
//! backing store must fulfil.
//!
//! Defined here (below the engine crate) so both the engine and the concrete
//! implementations can import them without a circular dependency.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AdapterError;

/// A JSON object, as produced by `serde_json`.
pub type JsonMap = serde_json::Map<String, Value>;

/// Relational persistence used by the query/insert/update/delete step kinds.
///
/// `filter` maps are structured where-clauses: `field → scalar` is an
/// equality shorthand, `field → {op → value}` selects an operator
/// (`eq`, `gt`, `lt`, `gte`, `lte`, `like`, `in`).
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Insert one row; returns the store's acknowledgement (affected-row
    /// count or generated id).
    async fn create(&self, table: &str, row: &JsonMap) -> Result<Value, AdapterError>;

    /// Fetch rows. An empty `columns` slice selects `*`.
    async fn retrieve(
        &self,
        table: &str,
        columns: &[String],
        filter: &JsonMap,
    ) -> Result<Vec<Value>, AdapterError>;

    /// Update matching rows; returns the affected-row count.
    async fn update(
        &self,
        table: &str,
        set: &JsonMap,
        filter: &JsonMap,
    ) -> Result<Value, AdapterError>;

    /// Delete matching rows; returns the affected-row count.
    async fn delete(&self, table: &str, filter: &JsonMap) -> Result<Value, AdapterError>;

    /// Names of the user tables visible to the store.
    async fn table_names(&self) -> Result<Vec<String>, AdapterError>;

    /// Column name → type name for one table.
    async fn columns(&self, table: &str) -> Result<BTreeMap<String, String>, AdapterError>;
}

/// The HTTP methods a workflow step may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "PATCH")]
    Patch,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        };
        f.write_str(s)
    }
}

/// A decoded HTTP response as seen by downstream steps.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedResponse {
    /// The JSON-decoded response body.
    pub data: Value,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// The response body as received, before decoding.
    pub raw: String,
}

/// Outbound JSON HTTP used by the http step kind.
#[async_trait]
pub trait HttpAdapter: Send + Sync {
    /// Issue one request. `query` values are stringified into the URL;
    /// `body` is sent as JSON for methods that carry one.
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        query: &JsonMap,
        body: &JsonMap,
        headers: &HashMap<String, String>,
    ) -> Result<ParsedResponse, AdapterError>;
}
