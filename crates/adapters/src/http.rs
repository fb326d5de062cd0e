//! `JsonHttpClient` — the reqwest-backed implementation of [`HttpAdapter`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{HttpAdapter, HttpMethod, JsonMap, ParsedResponse};
use crate::AdapterError;

/// Outbound HTTP client that speaks JSON in both directions.
pub struct JsonHttpClient {
    client: reqwest::Client,
}

impl JsonHttpClient {
    /// Build a client with a 10 second connect timeout.
    pub fn new() -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    fn build_url(url: &str, query: &JsonMap) -> Result<reqwest::Url, AdapterError> {
        if url.is_empty() {
            return Err(AdapterError::InvalidRequest("url is empty".into()));
        }
        let mut parsed = reqwest::Url::parse(url)
            .map_err(|e| AdapterError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;
        if !query.is_empty() {
            let mut pairs = parsed.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, &plain_string(value));
            }
        }
        Ok(parsed)
    }
}

/// Query-string rendering: bare strings, compact JSON for everything else.
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

#[async_trait]
impl HttpAdapter for JsonHttpClient {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        query: &JsonMap,
        body: &JsonMap,
        headers: &HashMap<String, String>,
    ) -> Result<ParsedResponse, AdapterError> {
        let parsed_url = Self::build_url(url, query)?;

        let mut request = self
            .client
            .request(method.into(), parsed_url)
            .header("Content-Type", "application/json");
        for (key, value) in headers {
            request = request.header(key, value);
        }

        // GET and DELETE only carry a body when one was actually given.
        let carries_body = match method {
            HttpMethod::Get | HttpMethod::Delete => !body.is_empty(),
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => true,
        };
        if carries_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let status_code = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        let data: Value =
            serde_json::from_str(&raw).map_err(|e| AdapterError::Decode(e.to_string()))?;

        Ok(ParsedResponse {
            data,
            status_code,
            raw,
        })
    }
}
