use async_trait::async_trait;
use serde_json::{json, Value};

use querysmith_core::api::{ExecutionError, QueryExecutor, SourceConfig};

use crate::http::{auth, build_client, join_url, preview_body};

/// Runs queries with `POST {base_url}{query_path}` and body `{"query": ...}`.
///
/// Non-2xx responses carrying `{error, details}` are passed through as-is so
/// callers can refine the request.
pub struct HttpQueryExecutor {
    http: reqwest::Client,
    api_key: String,
    url_query: String,
}

impl HttpQueryExecutor {
    pub fn new(cfg: &SourceConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            api_key: cfg.api_key.clone(),
            url_query: join_url(&cfg.base_url, &cfg.query_path),
        })
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute(&self, query: &str) -> Result<Vec<Value>, ExecutionError> {
        let url = &self.url_query;
        tracing::debug!(
            target: "querysmith.execution",
            stage = "execution.http.in",
            url = %url,
            query_len = query.len()
        );
        let req = self.http.post(url).json(&json!({ "query": query }));
        let resp = auth(req, &self.api_key).send().await.map_err(|err| {
            ExecutionError::with_details("request failed", json!({ "message": err.to_string() }))
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|err| {
            ExecutionError::with_details("response unreadable", json!({ "message": err.to_string() }))
        })?;
        tracing::debug!(
            target: "querysmith.execution",
            stage = "execution.http.out",
            status = %status,
            body_len = body.len()
        );

        let parsed = serde_json::from_str::<Value>(&body).ok();
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), parsed, &body));
        }
        match parsed {
            Some(value) => rows_from(value),
            None if body.trim().is_empty() => Ok(Vec::new()),
            None => Err(ExecutionError::with_details(
                "response is not JSON",
                json!({ "body": preview_body(&body) }),
            )),
        }
    }
}

fn error_from_body(status: u16, parsed: Option<Value>, body: &str) -> ExecutionError {
    if let Some(Value::Object(mut map)) = parsed {
        if let Some(Value::String(error)) = map.remove("error") {
            let details = map.remove("details").unwrap_or(Value::Null);
            return ExecutionError::with_details(error, details);
        }
    }
    ExecutionError::with_details(
        format!("HTTP {status}"),
        json!({ "status": status, "body": preview_body(body) }),
    )
}

/// Accepts `{"records": [...]}`, `{"rows": [...]}` or a bare array.
fn rows_from(value: Value) -> Result<Vec<Value>, ExecutionError> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("rows")) {
            Some(Value::Array(rows)) => Ok(rows),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ExecutionError::with_details(
                "rows field is not an array",
                other,
            )),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(ExecutionError::with_details("unexpected result shape", other)),
    }
}
