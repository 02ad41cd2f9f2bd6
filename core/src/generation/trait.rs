use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema the final answer must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

/// A read-only function the model may call before answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub output: Value,
}

/// One model turn that asked for tools, plus what the tools returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRound {
    pub calls: Vec<ToolCall>,
    pub results: Vec<ToolResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub output_schema: OutputSchema,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    /// Earlier tool rounds of the same request, oldest first.
    #[serde(default)]
    pub transcript: Vec<ToolRound>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, output_schema: OutputSchema) -> Self {
        Self {
            prompt: prompt.into(),
            output_schema,
            tools: Vec::new(),
            transcript: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GenerationResponse {
    /// Structured object matching the output schema.
    Final(Value),
    ToolCalls(Vec<ToolCall>),
}

/// Black-box structured generation: prompt + output schema in, object out.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse>;
}
