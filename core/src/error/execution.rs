use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure reported by the downstream query endpoint.
///
/// `details` carries the structured payload untouched so callers can refine
/// the request.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[error("{error}")]
pub struct ExecutionError {
    pub error: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(error: impl Into<String>, details: Value) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}
