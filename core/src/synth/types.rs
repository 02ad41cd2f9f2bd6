use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::transitions::SynthesisPhase;
use crate::error::SynthesisError;
use crate::generation::OutputSchema;

pub const MAX_RATIONALE_CHARS: usize = 500;

/// Structured output of query generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub query: String,
    #[serde(alias = "tables_used")]
    pub tables_used: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    pub confidence: f64,
}

impl QueryPlan {
    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "QueryPlan".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "A single read-only query statement"},
                    "tablesUsed": {"type": "array", "items": {"type": "string"}, "minItems": 1},
                    "rationale": {"type": "string", "maxLength": MAX_RATIONALE_CHARS},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                },
                "required": ["query", "tablesUsed", "rationale", "confidence"],
                "additionalProperties": false
            }),
        }
    }

    /// Decode a generated object. Shape problems are generation errors;
    /// policy checks happen later in validation.
    pub fn from_generated(value: Value) -> Result<Self, SynthesisError> {
        let mut plan: QueryPlan = serde_json::from_value(value).map_err(|e| {
            SynthesisError::generation_with("generated plan has the wrong shape", e.into())
        })?;
        if !plan.confidence.is_finite() || !(0.0..=1.0).contains(&plan.confidence) {
            return Err(SynthesisError::generation(format!(
                "generated confidence {} is outside [0, 1]",
                plan.confidence
            )));
        }
        plan.query = plan.query.trim().to_string();
        plan.tables_used = plan
            .tables_used
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        plan.rationale = truncate_chars(plan.rationale.trim(), MAX_RATIONALE_CHARS);
        Ok(plan)
    }
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub description: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

impl QueryRequest {
    pub fn new(description: impl Into<String>, tables: &[&str]) -> Self {
        Self {
            description: description.into(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub request_id: String,
    pub context_field_count: usize,
    pub result_field_count: usize,
    pub row_count: usize,
    pub tables_referenced: Vec<String>,
    pub tool_steps: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedQuery {
    pub plan: QueryPlan,
    pub rows: Vec<Value>,
    pub metadata: ExecutionMetadata,
}

/// A plan that passed validation but has not been executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedPlan {
    pub request_id: String,
    pub plan: QueryPlan,
    pub context_field_count: usize,
    pub tool_steps: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<QueryPlan>,
    /// Phase the run was in when it was rejected.
    pub phase: SynthesisPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Validated(ValidatedPlan),
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Executed(ExecutedQuery),
    Rejected(Rejection),
}

impl SynthesisOutcome {
    pub fn executed(&self) -> Option<&ExecutedQuery> {
        match self {
            Self::Executed(q) => Some(q),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Executed(_) => None,
        }
    }
}

/// CSV column to schema column pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    #[serde(alias = "source_field")]
    pub source_field: String,
    #[serde(alias = "target_field")]
    pub target_field: String,
    #[serde(default, alias = "target_type")]
    pub target_type: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingOutcome {
    pub table: String,
    pub mappings: Vec<FieldMapping>,
    /// CSV headers with no mapping, in file order.
    pub unmapped_headers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
