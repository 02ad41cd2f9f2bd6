use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExecutionError;

/// Downstream endpoint that runs validated read-only queries.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn name(&self) -> &str;
    /// Rows on success; the data source's `{error, details}` on rejection.
    async fn execute(&self, query: &str) -> Result<Vec<Value>, ExecutionError>;
}
