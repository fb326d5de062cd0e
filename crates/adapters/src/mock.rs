//! Recording test doubles for [`RelationalStore`] and [`HttpAdapter`].
//!
//! Useful in unit and integration tests where a real Postgres or network is
//! either unavailable or irrelevant. Every call is recorded in order so
//! tests can assert scheduling properties (executed once, executed after…).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::traits::{HttpAdapter, HttpMethod, JsonMap, ParsedResponse, RelationalStore};
use crate::AdapterError;

/// One recorded store operation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    /// "retrieve", "create", "update" or "delete".
    pub op: &'static str,
    pub table: String,
    /// Selected columns (retrieve only).
    pub columns: Vec<String>,
    /// Row map (create) or set map (update).
    pub values: JsonMap,
    pub filter: JsonMap,
}

/// A mock store that returns canned rows per table and records every call.
#[derive(Default)]
pub struct MockStore {
    rows: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned result set for `retrieve` against `table`.
    pub fn with_rows(self, table: impl Into<String>, rows: Vec<Value>) -> Self {
        self.rows.lock().unwrap().insert(table.into(), rows);
        self
    }

    /// Make every operation against `table` fail.
    pub fn failing(self, table: impl Into<String>) -> Self {
        self.failing.lock().unwrap().insert(table.into());
        self
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// How many calls hit `table`.
    pub fn call_count(&self, table: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.table == table)
            .count()
    }

    /// Position of the first call against `table` in the call order.
    pub fn call_position(&self, table: &str) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| c.table == table)
    }

    fn record(&self, call: StoreCall) -> Result<(), AdapterError> {
        let table = call.table.clone();
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&table) {
            return Err(AdapterError::Database(format!(
                "mock failure for table '{table}'"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for MockStore {
    async fn create(&self, table: &str, row: &JsonMap) -> Result<Value, AdapterError> {
        self.record(StoreCall {
            op: "create",
            table: table.to_owned(),
            columns: Vec::new(),
            values: row.clone(),
            filter: JsonMap::new(),
        })?;
        Ok(json!(1))
    }

    async fn retrieve(
        &self,
        table: &str,
        columns: &[String],
        filter: &JsonMap,
    ) -> Result<Vec<Value>, AdapterError> {
        self.record(StoreCall {
            op: "retrieve",
            table: table.to_owned(),
            columns: columns.to_vec(),
            values: JsonMap::new(),
            filter: filter.clone(),
        })?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        table: &str,
        set: &JsonMap,
        filter: &JsonMap,
    ) -> Result<Value, AdapterError> {
        self.record(StoreCall {
            op: "update",
            table: table.to_owned(),
            columns: Vec::new(),
            values: set.clone(),
            filter: filter.clone(),
        })?;
        Ok(json!(1))
    }

    async fn delete(&self, table: &str, filter: &JsonMap) -> Result<Value, AdapterError> {
        self.record(StoreCall {
            op: "delete",
            table: table.to_owned(),
            columns: Vec::new(),
            values: JsonMap::new(),
            filter: filter.clone(),
        })?;
        Ok(json!(1))
    }

    async fn table_names(&self) -> Result<Vec<String>, AdapterError> {
        Ok(self.rows.lock().unwrap().keys().cloned().collect())
    }

    async fn columns(&self, _table: &str) -> Result<BTreeMap<String, String>, AdapterError> {
        Ok(BTreeMap::new())
    }
}

/// One recorded outbound request.
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub method: HttpMethod,
    pub url: String,
    pub query: JsonMap,
    pub body: JsonMap,
    pub headers: HashMap<String, String>,
}

/// A mock HTTP adapter returning a canned response.
pub struct MockHttp {
    response: Value,
    status_code: u16,
    fail: Option<String>,
    calls: Mutex<Vec<HttpCall>>,
}

impl MockHttp {
    /// Always respond 200 with the given body.
    pub fn returning(response: Value) -> Self {
        Self {
            response,
            status_code: 200,
            fail: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Value::Null,
            status_code: 0,
            fail: Some(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HttpCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpAdapter for MockHttp {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        query: &JsonMap,
        body: &JsonMap,
        headers: &HashMap<String, String>,
    ) -> Result<ParsedResponse, AdapterError> {
        self.calls.lock().unwrap().push(HttpCall {
            method,
            url: url.to_owned(),
            query: query.clone(),
            body: body.clone(),
            headers: headers.clone(),
        });
        if let Some(message) = &self.fail {
            return Err(AdapterError::Http(message.clone()));
        }
        Ok(ParsedResponse {
            data: self.response.clone(),
            status_code: self.status_code,
            raw: self.response.to_string(),
        })
    }
}
