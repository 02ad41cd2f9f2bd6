use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::schema::{ColumnInfo, JoinStep};
use crate::vector::FieldDocument;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldContext {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub picklist_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
}

impl From<&ColumnInfo> for FieldContext {
    fn from(column: &ColumnInfo) -> Self {
        Self {
            name: column.name.clone(),
            field_type: column.data_type.clone(),
            label: column.label.clone().filter(|l| l != &column.name),
            primary_key: column.is_primary_key,
            picklist_values: column.picklist_values.clone(),
            relationship_name: column.relationship_name.clone(),
            reference_to: column.reference_to.clone(),
        }
    }
}

impl From<FieldDocument> for FieldContext {
    fn from(doc: FieldDocument) -> Self {
        Self {
            primary_key: doc.field_type == "id",
            label: doc.label.filter(|l| l != &doc.field),
            name: doc.field,
            field_type: doc.field_type,
            picklist_values: doc.picklist_values,
            relationship_name: doc.relationship_name,
            reference_to: doc.reference_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRelationshipContext {
    pub child_table: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableContext {
    pub fields: Vec<FieldContext>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_relationships: Vec<ChildRelationshipContext>,
}

impl TableContext {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextOrigin {
    Graph,
    Vector,
    Mixed,
}

/// Join route between two requested tables, as ON clauses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinHint {
    pub from: String,
    pub to: String,
    pub steps: Vec<JoinStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaContext {
    pub tables: BTreeMap<String, TableContext>,
    pub origin: ContextOrigin,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_tables: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub join_hints: Vec<JoinHint>,
}

impl SchemaContext {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.keys().any(|t| t.eq_ignore_ascii_case(name.trim()))
    }

    pub fn field_count(&self) -> usize {
        self.tables.values().map(|t| t.fields.len()).sum()
    }

    /// The `{table: {fields, childRelationships}}` map handed to generation.
    pub fn to_prompt_value(&self) -> Value {
        serde_json::to_value(&self.tables).unwrap_or(Value::Null)
    }
}
