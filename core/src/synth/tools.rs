//! Read-only schema tools offered to the model during generation.

use serde_json::{json, Value};

use crate::generation::{ToolCall, ToolSpec};
use crate::schema::{JoinPath, SchemaGraph};

pub const LIST_TABLES: &str = "list_tables";
pub const GET_TABLE_INFO: &str = "get_table_info";
pub const FIND_JOIN_PATH: &str = "find_join_path";

pub struct SchemaTools<'a> {
    graph: &'a SchemaGraph,
}

impl<'a> SchemaTools<'a> {
    pub fn new(graph: &'a SchemaGraph) -> Self {
        Self { graph }
    }

    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: LIST_TABLES.to_string(),
                description: "List every table in the discovered schema.".to_string(),
                parameters: json!({"type": "object", "properties": {}, "additionalProperties": false}),
            },
            ToolSpec {
                name: GET_TABLE_INFO.to_string(),
                description: "Columns and foreign keys of one table.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"table": {"type": "string"}},
                    "required": ["table"],
                    "additionalProperties": false
                }),
            },
            ToolSpec {
                name: FIND_JOIN_PATH.to_string(),
                description: "Shortest chain of relationships connecting two tables.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"from": {"type": "string"}, "to": {"type": "string"}},
                    "required": ["from", "to"],
                    "additionalProperties": false
                }),
            },
        ]
    }

    /// Run one call. Failures come back as `{"error": ...}` so the model
    /// can recover; they never abort the pipeline.
    pub fn call(&self, call: &ToolCall) -> Value {
        tracing::debug!(target: "querysmith.tools", tool = %call.name, args = %call.arguments, "tool call");
        match call.name.as_str() {
            LIST_TABLES => json!({"tables": self.graph.table_names()}),
            GET_TABLE_INFO => {
                let Some(table) = string_arg(&call.arguments, "table") else {
                    return tool_error("missing argument: table");
                };
                match self.graph.table_info(table, None) {
                    Some(info) => serde_json::to_value(info).unwrap_or_else(|e| tool_error(&e.to_string())),
                    None => tool_error(&format!("table not found: {table}")),
                }
            }
            FIND_JOIN_PATH => {
                let (Some(from), Some(to)) = (
                    string_arg(&call.arguments, "from"),
                    string_arg(&call.arguments, "to"),
                ) else {
                    return tool_error("missing argument: from and to are required");
                };
                match self.graph.find_join_path(from, to) {
                    JoinPath::Found(steps) => json!({
                        "found": true,
                        "steps": steps,
                        "onClauses": steps.iter().map(|s| s.on_clause()).collect::<Vec<_>>(),
                    }),
                    JoinPath::NoPath => json!({"found": false}),
                    JoinPath::UnknownTable(name) => tool_error(&format!("table not found: {name}")),
                }
            }
            other => tool_error(&format!("unknown tool: {other}")),
        }
    }
}

fn string_arg<'v>(args: &'v Value, key: &str) -> Option<&'v str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn tool_error(message: &str) -> Value {
    json!({"error": message})
}
