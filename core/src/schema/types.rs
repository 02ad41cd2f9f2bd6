use serde::{Deserialize, Serialize};

/// Sentinel type for columns whose type introspection could not resolve.
pub const UNKNOWN_TYPE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Table,
    Column,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Table => "TABLE",
            NodeType::Column => "COLUMN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAttrs {
    /// Owning table node id.
    pub table_id: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub picklist_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Table,
    Column(ColumnAttrs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: NodeKind,
}

impl GraphNode {
    pub fn table(name: &str, namespace: Option<&str>, label: Option<&str>) -> Self {
        Self {
            id: table_node_id(name, namespace),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            label: label.map(str::to_string),
            kind: NodeKind::Table,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Table => NodeType::Table,
            NodeKind::Column(_) => NodeType::Column,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, NodeKind::Table)
    }

    pub fn column(&self) -> Option<&ColumnAttrs> {
        match &self.kind {
            NodeKind::Column(attrs) => Some(attrs),
            NodeKind::Table => None,
        }
    }
}

pub fn table_node_id(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("table:{ns}.{name}"),
        _ => format!("table:{name}"),
    }
}

pub fn column_node_id(table_id: &str, column: &str) -> String {
    let table = table_id.strip_prefix("table:").unwrap_or(table_id);
    format!("column:{table}.{column}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// table -> column
    Contains,
    /// column -> referenced table
    ForeignKey,
    /// child table -> parent table, derived from child relationship metadata
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
    /// Lookup name on the child column (`Contact.Account`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    /// Name the parent uses for its children (`Account.Contacts`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_relationship_name: Option<String>,
}

impl GraphEdge {
    pub fn contains(table_id: &str, column_id: &str) -> Self {
        Self {
            kind: EdgeKind::Contains,
            source: table_id.to_string(),
            target: column_id.to_string(),
            column_name: None,
            referenced_table: None,
            referenced_column: None,
            relationship_name: None,
            child_relationship_name: None,
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self.kind, EdgeKind::ForeignKey | EdgeKind::Relationship)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub picklist_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
}

impl ColumnInfo {
    pub(crate) fn from_node(node: &GraphNode, attrs: &ColumnAttrs) -> Self {
        Self {
            name: node.name.clone(),
            label: node.label.clone(),
            data_type: attrs.data_type.clone(),
            is_nullable: attrs.is_nullable,
            is_primary_key: attrs.is_primary_key,
            max_length: attrs.max_length,
            precision: attrs.precision,
            picklist_values: attrs.picklist_values.clone(),
            relationship_name: attrs.relationship_name.clone(),
            reference_to: attrs.reference_to.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

/// Immutable projection of one table, built once per introspection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableInfo {
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    /// This table holds the referencing column.
    Outgoing,
    /// Another table references this one.
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRelationship {
    /// The table on the other end of the edge.
    pub table: String,
    /// Referencing column, always on the child side.
    pub column: String,
    pub referenced_column: String,
    pub direction: RelationDirection,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_relationship_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    /// child -> parent, along the edge
    Forward,
    /// parent -> child, against the edge
    Reverse,
}

/// One hop of a join path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStep {
    pub from_table: String,
    pub to_table: String,
    pub child_table: String,
    pub column_name: String,
    pub parent_table: String,
    pub referenced_column: String,
    pub direction: StepDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

impl JoinStep {
    pub fn on_clause(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.child_table, self.column_name, self.parent_table, self.referenced_column
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum JoinPath {
    /// Ordered hops from the source table; empty when source == target.
    Found(Vec<JoinStep>),
    NoPath,
    UnknownTable(String),
}

impl JoinPath {
    pub fn steps(&self) -> Option<&[JoinStep]> {
        match self {
            JoinPath::Found(steps) => Some(steps),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, JoinPath::Found(_))
    }
}
