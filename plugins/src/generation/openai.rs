//! OpenAI-compatible chat completions as a structured generation capability.
//!
//! The output schema goes out as `response_format: json_schema`; tool rounds
//! are replayed as assistant `tool_calls` messages followed by `tool`
//! messages, oldest first.

use async_trait::async_trait;
use serde_json::{json, Value};

use querysmith_core::api::{
    GenerationCapability, GenerationConfig, GenerationRequest, GenerationResponse, ToolCall,
};

use crate::http::{auth, build_client, join_url, parse_json_response, HttpError};

pub struct OpenAiChatGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    url_chat: String,
}

impl OpenAiChatGenerator {
    pub fn new(cfg: &GenerationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            url_chat: join_url(&cfg.base_url, "chat/completions"),
        })
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        let mut messages = vec![
            json!({
                "role": "system",
                "content": format!(
                    "Respond only with a JSON object that satisfies the {} schema.",
                    request.output_schema.name
                ),
            }),
            json!({"role": "user", "content": request.prompt}),
        ];
        for round in &request.transcript {
            let calls: Vec<Value> = round
                .calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        },
                    })
                })
                .collect();
            messages.push(json!({"role": "assistant", "content": Value::Null, "tool_calls": calls}));
            for result in &round.results {
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": result.call_id,
                    "content": result.output.to_string(),
                }));
            }
        }

        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.output_schema.name,
                    "schema": request.output_schema.schema,
                    "strict": true,
                },
            },
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

#[async_trait]
impl GenerationCapability for OpenAiChatGenerator {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse> {
        let url = &self.url_chat;
        tracing::debug!(
            target: "querysmith.generation",
            stage = "generation.http.in",
            url = %url,
            model = %self.model,
            prompt_len = request.prompt.len(),
            tools = request.tools.len(),
            rounds = request.transcript.len()
        );
        let req = self.http.post(url).json(&self.body(request));
        let resp = auth(req, &self.api_key)
            .send()
            .await
            .map_err(|err| HttpError::transport(url.clone(), err))?;
        let status = resp.status();
        let value = parse_json_response(resp).await?;
        tracing::debug!(
            target: "querysmith.generation",
            stage = "generation.http.out",
            status = %status
        );
        parse_completion(&value)
    }
}

fn parse_completion(value: &Value) -> anyhow::Result<GenerationResponse> {
    let message = value
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow::anyhow!("completion has no choices[0].message"))?;

    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        if !calls.is_empty() {
            return calls
                .iter()
                .map(parse_tool_call)
                .collect::<anyhow::Result<Vec<_>>>()
                .map(GenerationResponse::ToolCalls);
        }
    }

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("completion message has no content"))?;
    let object: Value = serde_json::from_str(strip_fences(content))
        .map_err(|e| anyhow::anyhow!("completion content is not JSON: {e}"))?;
    Ok(GenerationResponse::Final(object))
}

fn parse_tool_call(call: &Value) -> anyhow::Result<ToolCall> {
    let function = call
        .get("function")
        .ok_or_else(|| anyhow::anyhow!("tool call without function"))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("tool call without name"))?;
    // Arguments arrive as a JSON-encoded string; some servers send an object.
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) if raw.trim().is_empty() => json!({}),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("tool call {name} has invalid arguments: {e}"))?,
        Some(other) => other.clone(),
        None => json!({}),
    };
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
    Ok(ToolCall {
        id,
        name: name.to_string(),
        arguments,
    })
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
