//! Payloads returned by a live schema introspection source.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
    #[serde(default)]
    pub child_relationships: Vec<ChildRelationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Missing for some fields on partially broken describes.
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default = "default_nillable")]
    pub nillable: bool,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub primary_key: Option<bool>,
    #[serde(default, deserialize_with = "picklist_values")]
    pub picklist_values: Vec<String>,
    #[serde(default)]
    pub relationship_name: Option<String>,
    #[serde(default)]
    pub reference_to: Vec<String>,
}

fn default_nillable() -> bool {
    true
}

impl FieldDescription {
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            field_type: Some(field_type.to_string()),
            nillable: true,
            length: None,
            precision: None,
            primary_key: None,
            picklist_values: Vec::new(),
            relationship_name: None,
            reference_to: Vec::new(),
        }
    }

    /// Explicit flag wins; otherwise `id`-typed fields are primary keys.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
            .unwrap_or_else(|| self.field_type.as_deref() == Some("id"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRelationship {
    #[serde(alias = "childSObject")]
    pub child_table: String,
    pub field: String,
    #[serde(default)]
    pub relationship_name: Option<String>,
}

/// Accepts either plain strings or `{value, label, active}` objects.
fn picklist_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Plain(String),
        Object {
            value: String,
            #[serde(default = "default_active")]
            active: bool,
        },
    }

    fn default_active() -> bool {
        true
    }

    let entries = Option::<Vec<Entry>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|e| match e {
            Entry::Plain(v) => Some(v),
            Entry::Object { value, active } => active.then_some(value),
        })
        .collect())
}
