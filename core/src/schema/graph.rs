//! Table/column graph with relationship analysis and join-path search.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::describe::TableDescription;
use super::types::{
    column_node_id, table_node_id, ColumnAttrs, ColumnInfo, EdgeKind, ForeignKey, GraphEdge, GraphNode,
    JoinPath, JoinStep, NodeKind, NodeType, RelationDirection, StepDirection, TableInfo,
    TableRelationship, UNKNOWN_TYPE,
};
use crate::error::SchemaError;

const SNAPSHOT_VERSION: u32 = 1;
const DEFAULT_KEY_COLUMN: &str = "Id";

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    version: u32,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

/// Structural model of a discovered schema.
///
/// Single writer: mutation needs `&mut self`. Share behind an `Arc` once
/// built.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    name_index: HashMap<String, Vec<usize>>,
    edges: Vec<GraphEdge>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from introspection payloads.
    ///
    /// References to tables outside `descriptions` stay on the column
    /// (`reference_to`) but produce no edge.
    pub fn from_descriptions(descriptions: &[TableDescription]) -> Result<Self, SchemaError> {
        let mut graph = SchemaGraph::new();

        for desc in descriptions {
            let node = GraphNode::table(
                &desc.name,
                desc.namespace.as_deref(),
                desc.label.as_deref(),
            );
            if graph.node_index.contains_key(&node.id) {
                tracing::warn!(target: "querysmith.schema", table = %desc.name, "duplicate table description skipped");
                continue;
            }
            graph.add_node(node)?;
        }

        for desc in descriptions {
            let table_id = table_node_id(&desc.name, desc.namespace.as_deref());
            for field in &desc.fields {
                let column_id = column_node_id(&table_id, &field.name);
                if graph.node_index.contains_key(&column_id) {
                    continue;
                }
                let data_type = match field.field_type.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => {
                        tracing::debug!(
                            target: "querysmith.schema",
                            table = %desc.name,
                            field = %field.name,
                            "field type missing, using sentinel"
                        );
                        UNKNOWN_TYPE.to_string()
                    }
                };
                graph.add_node(GraphNode {
                    id: column_id.clone(),
                    name: field.name.clone(),
                    namespace: desc.namespace.clone(),
                    label: field.label.clone(),
                    kind: NodeKind::Column(ColumnAttrs {
                        table_id: table_id.clone(),
                        data_type,
                        is_nullable: field.nillable,
                        is_primary_key: field.is_primary_key(),
                        max_length: field.length.filter(|l| *l > 0),
                        precision: field.precision.filter(|p| *p > 0),
                        picklist_values: field.picklist_values.clone(),
                        relationship_name: field.relationship_name.clone(),
                        reference_to: field.reference_to.clone(),
                    }),
                })?;
                graph.add_edge(GraphEdge::contains(&table_id, &column_id))?;
            }
        }

        // Foreign keys need every table and column in place first.
        let mut linked: HashSet<(String, String, String)> = HashSet::new();
        for desc in descriptions {
            let table_id = table_node_id(&desc.name, desc.namespace.as_deref());
            for field in &desc.fields {
                let column_id = column_node_id(&table_id, &field.name);
                for referenced in &field.reference_to {
                    let Some(target) = graph.find_table(referenced).map(|n| n.id.clone()) else {
                        continue;
                    };
                    if !linked.insert((table_id.clone(), field.name.clone(), target.clone())) {
                        continue;
                    }
                    let referenced_column = graph.key_column_of(&target);
                    graph.add_edge(GraphEdge {
                        kind: EdgeKind::ForeignKey,
                        source: column_id.clone(),
                        target,
                        column_name: Some(field.name.clone()),
                        referenced_table: Some(referenced.clone()),
                        referenced_column: Some(referenced_column),
                        relationship_name: field.relationship_name.clone(),
                        child_relationship_name: None,
                    })?;
                }
            }
        }

        for desc in descriptions {
            let parent_id = table_node_id(&desc.name, desc.namespace.as_deref());
            for child in &desc.child_relationships {
                let Some(child_id) = graph.find_table(&child.child_table).map(|n| n.id.clone())
                else {
                    continue;
                };
                // Already covered by the child's own foreign key; only the
                // child-side name is new.
                if !linked.insert((child_id.clone(), child.field.clone(), parent_id.clone())) {
                    let column_id = column_node_id(&child_id, &child.field);
                    let existing = graph.outgoing.get(&column_id).into_iter().flatten().copied().find(|&i| {
                        graph.edges[i].kind == EdgeKind::ForeignKey && graph.edges[i].target == parent_id
                    });
                    if let Some(idx) = existing {
                        let edge = &mut graph.edges[idx];
                        if edge.child_relationship_name.is_none() {
                            edge.child_relationship_name = child.relationship_name.clone();
                        }
                    }
                    continue;
                }
                let referenced_column = graph.key_column_of(&parent_id);
                graph.add_edge(GraphEdge {
                    kind: EdgeKind::Relationship,
                    source: child_id,
                    target: parent_id.clone(),
                    column_name: Some(child.field.clone()),
                    referenced_table: Some(desc.name.clone()),
                    referenced_column: Some(referenced_column),
                    relationship_name: None,
                    child_relationship_name: child.relationship_name.clone(),
                })?;
            }
        }

        tracing::debug!(
            target: "querysmith.schema",
            tables = graph.nodes_by_type(NodeType::Table).len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "schema graph built"
        );
        Ok(graph)
    }

    pub fn add_node(&mut self, node: GraphNode) -> Result<(), SchemaError> {
        if self.node_index.contains_key(&node.id) {
            return Err(SchemaError::DuplicateNode(node.id));
        }
        let idx = self.nodes.len();
        self.node_index.insert(node.id.clone(), idx);
        self.name_index.entry(node.name.clone()).or_default().push(idx);
        self.nodes.push(node);
        Ok(())
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<(), SchemaError> {
        for id in [&edge.source, &edge.target] {
            if !self.node_index.contains_key(id) {
                return Err(SchemaError::DanglingEdge(id.clone()));
            }
        }
        let idx = self.edges.len();
        self.outgoing.entry(edge.source.clone()).or_default().push(idx);
        self.incoming.entry(edge.target.clone()).or_default().push(idx);
        self.edges.push(edge);
        Ok(())
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes_by_type(&self, node_type: NodeType) -> Vec<&GraphNode> {
        self.nodes
            .iter()
            .filter(|n| n.node_type() == node_type)
            .collect()
    }

    /// Exact-name lookup. A table and its columns (or columns of different
    /// tables) may share a name.
    pub fn nodes_by_name(&self, name: &str) -> Vec<&GraphNode> {
        self.name_index
            .get(name)
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Resolve a table by name, exact match first, then case-insensitive.
    pub fn find_table(&self, name: &str) -> Option<&GraphNode> {
        let name = name.trim();
        if let Some(node) = self.nodes_by_name(name).into_iter().find(|n| n.is_table()) {
            return Some(node);
        }
        self.nodes
            .iter()
            .find(|n| n.is_table() && n.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_table())
            .map(|n| n.name.as_str())
            .collect()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    /// Columns of a table in definition order.
    pub fn table_columns(&self, table_id: &str) -> Vec<&GraphNode> {
        self.outgoing
            .get(table_id)
            .map(|edge_idxs| {
                edge_idxs
                    .iter()
                    .map(|&e| &self.edges[e])
                    .filter(|e| e.kind == EdgeKind::Contains)
                    .filter_map(|e| self.node(&e.target))
                    .filter(|n| n.node_type() == NodeType::Column)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Aggregate view of one table, or `None` when it is unknown.
    pub fn table_info(&self, name: &str, namespace: Option<&str>) -> Option<TableInfo> {
        let table = match namespace {
            Some(ns) => self.nodes.iter().find(|n| {
                n.is_table() && n.name.eq_ignore_ascii_case(name) && n.namespace.as_deref() == Some(ns)
            })?,
            None => self.find_table(name)?,
        };

        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();
        for column in self.table_columns(&table.id) {
            let Some(attrs) = column.column() else { continue };
            columns.push(ColumnInfo::from_node(column, attrs));
            for edge in self.edges_from(&column.id, EdgeKind::ForeignKey) {
                if let Some(target) = self.node(&edge.target) {
                    foreign_keys.push(ForeignKey {
                        column_name: column.name.clone(),
                        referenced_table: target.name.clone(),
                        referenced_column: edge
                            .referenced_column
                            .clone()
                            .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string()),
                        relationship_name: edge.relationship_name.clone(),
                    });
                }
            }
        }

        Some(TableInfo {
            name: table.name.clone(),
            namespace: table.namespace.clone(),
            label: table.label.clone(),
            columns,
            foreign_keys,
        })
    }

    /// One-hop neighbours over relational edges, both directions.
    ///
    /// Unknown tables yield an empty list.
    pub fn analyze_table_relationships(&self, table: &str) -> Vec<TableRelationship> {
        let Some(node) = self.find_table(table) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (edge_idx, neighbour, direction) in self.adjacent_tables(&node.id) {
            let edge = &self.edges[edge_idx];
            let Some(other) = self.node(&neighbour) else { continue };
            out.push(TableRelationship {
                table: other.name.clone(),
                column: edge.column_name.clone().unwrap_or_default(),
                referenced_column: edge
                    .referenced_column
                    .clone()
                    .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string()),
                direction: match direction {
                    StepDirection::Forward => RelationDirection::Outgoing,
                    StepDirection::Reverse => RelationDirection::Incoming,
                },
                kind: edge.kind,
                relationship_name: edge.relationship_name.clone(),
                child_relationship_name: edge.child_relationship_name.clone(),
            });
        }
        out
    }

    /// Shortest join path by hop count (breadth-first).
    ///
    /// Edges may be walked in either direction. Among equally short paths
    /// the one using earlier-inserted edges wins. Disconnected tables give
    /// [`JoinPath::NoPath`]; this is an expected outcome, not an error.
    pub fn find_join_path(&self, from: &str, to: &str) -> JoinPath {
        let Some(start) = self.find_table(from) else {
            return JoinPath::UnknownTable(from.to_string());
        };
        let Some(goal) = self.find_table(to) else {
            return JoinPath::UnknownTable(to.to_string());
        };
        if start.id == goal.id {
            return JoinPath::Found(Vec::new());
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut parent: HashMap<String, (String, usize, StepDirection)> = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(start.id.as_str());
        queue.push_back(start.id.clone());

        while let Some(current) = queue.pop_front() {
            for (edge_idx, neighbour, direction) in self.adjacent_tables(&current) {
                let Some(neighbour_node) = self.node(&neighbour) else { continue };
                if !visited.insert(neighbour_node.id.as_str()) {
                    continue;
                }
                parent.insert(neighbour.clone(), (current.clone(), edge_idx, direction));
                if neighbour == goal.id {
                    return JoinPath::Found(self.rebuild_path(&start.id, &goal.id, &parent));
                }
                queue.push_back(neighbour);
            }
        }

        JoinPath::NoPath
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "version": SNAPSHOT_VERSION,
            "nodes": self.nodes,
            "edges": self.edges,
        })
    }

    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let snapshot: GraphSnapshot = serde_json::from_value(value.clone())
            .map_err(|e| SchemaError::InvalidSnapshot(e.to_string()))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SchemaError::InvalidSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let mut graph = SchemaGraph::new();
        for node in snapshot.nodes {
            graph
                .add_node(node)
                .map_err(|e| SchemaError::InvalidSnapshot(e.to_string()))?;
        }
        for edge in snapshot.edges {
            graph
                .add_edge(edge)
                .map_err(|e| SchemaError::InvalidSnapshot(e.to_string()))?;
        }
        Ok(graph)
    }

    fn edges_from(&self, node_id: &str, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.outgoing
            .get(node_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
            .filter(move |e| e.kind == kind)
    }

    /// Table owning an edge endpoint: itself for tables, the parent for columns.
    fn owning_table(&self, node_id: &str) -> Option<String> {
        let node = self.node(node_id)?;
        match &node.kind {
            NodeKind::Table => Some(node.id.clone()),
            NodeKind::Column(attrs) => Some(attrs.table_id.clone()),
        }
    }

    /// Relational neighbours of a table in edge insertion order.
    fn adjacent_tables(&self, table_id: &str) -> Vec<(usize, String, StepDirection)> {
        let mut candidates: Vec<usize> = Vec::new();
        let column_ids: Vec<&str> = self
            .table_columns(table_id)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        for id in std::iter::once(table_id).chain(column_ids) {
            candidates.extend(self.outgoing.get(id).into_iter().flatten().copied());
        }
        candidates.extend(self.incoming.get(table_id).into_iter().flatten().copied());
        candidates.sort_unstable();
        candidates.dedup();

        let mut hits: Vec<(usize, String, StepDirection)> = Vec::new();
        for idx in candidates {
            let edge = &self.edges[idx];
            if !edge.is_relational() {
                continue;
            }
            let (Some(src), Some(dst)) = (self.owning_table(&edge.source), self.owning_table(&edge.target))
            else {
                continue;
            };
            if src == table_id {
                hits.push((idx, dst.clone(), StepDirection::Forward));
            }
            if dst == table_id && src != table_id {
                hits.push((idx, src, StepDirection::Reverse));
            }
        }
        hits
    }

    fn rebuild_path(
        &self,
        start: &str,
        goal: &str,
        parent: &HashMap<String, (String, usize, StepDirection)>,
    ) -> Vec<JoinStep> {
        let mut steps = Vec::new();
        let mut cursor = goal.to_string();
        while cursor != start {
            let Some((prev, edge_idx, direction)) = parent.get(&cursor) else {
                break;
            };
            steps.push(self.join_step(prev, &cursor, *edge_idx, *direction));
            cursor = prev.clone();
        }
        steps.reverse();
        steps
    }

    fn join_step(&self, from: &str, to: &str, edge_idx: usize, direction: StepDirection) -> JoinStep {
        let edge = &self.edges[edge_idx];
        let name_of = |id: &str| self.node(id).map(|n| n.name.clone()).unwrap_or_default();
        let (child, parent) = match direction {
            StepDirection::Forward => (from, to),
            StepDirection::Reverse => (to, from),
        };
        JoinStep {
            from_table: name_of(from),
            to_table: name_of(to),
            child_table: name_of(child),
            column_name: edge.column_name.clone().unwrap_or_default(),
            parent_table: name_of(parent),
            referenced_column: edge
                .referenced_column
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string()),
            direction,
            relationship_name: edge.relationship_name.clone(),
        }
    }

    fn key_column_of(&self, table_id: &str) -> String {
        self.table_columns(table_id)
            .into_iter()
            .find(|c| c.column().map(|a| a.is_primary_key).unwrap_or(false))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe::{ChildRelationship, FieldDescription};

    fn reference(name: &str, target: &str, rel: &str) -> FieldDescription {
        let mut f = FieldDescription::new(name, "reference");
        f.reference_to = vec![target.to_string()];
        f.relationship_name = Some(rel.to_string());
        f
    }

    fn table(name: &str, fields: Vec<FieldDescription>) -> TableDescription {
        TableDescription {
            name: name.to_string(),
            label: None,
            namespace: None,
            fields,
            child_relationships: Vec::new(),
        }
    }

    fn crm() -> SchemaGraph {
        let account = table(
            "Account",
            vec![
                FieldDescription::new("Id", "id"),
                FieldDescription::new("Name", "string"),
                FieldDescription::new("Industry", "picklist"),
                reference("ParentId", "Account", "Parent"),
            ],
        );
        let contact = table(
            "Contact",
            vec![
                FieldDescription::new("Id", "id"),
                FieldDescription::new("LastName", "string"),
                reference("AccountId", "Account", "Account"),
            ],
        );
        let case = table(
            "Case",
            vec![
                FieldDescription::new("Id", "id"),
                reference("ContactId", "Contact", "Contact"),
            ],
        );
        let task = table("Task", vec![FieldDescription::new("Id", "id")]);
        SchemaGraph::from_descriptions(&[account, contact, case, task]).unwrap()
    }

    #[test]
    fn test_lookup_by_type_and_name() {
        let graph = crm();
        assert_eq!(graph.nodes_by_type(NodeType::Table).len(), 4);
        assert_eq!(graph.nodes_by_type(NodeType::Column).len(), 10);

        let ids = graph.nodes_by_name("Id");
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|n| n.node_type() == NodeType::Column));

        assert_eq!(graph.find_table("contact").map(|n| n.name.as_str()), Some("Contact"));
        assert!(graph.find_table("Opportunity").is_none());
    }

    #[test]
    fn test_table_and_column_sharing_name() {
        let graph = SchemaGraph::from_descriptions(&[
            table("Account", vec![FieldDescription::new("Id", "id")]),
            table("Contact", vec![reference("Account", "Account", "Account")]),
        ])
        .unwrap();
        let hits = graph.nodes_by_name("Account");
        assert_eq!(hits.len(), 2);
        assert!(graph.find_table("Account").unwrap().is_table());
    }

    #[test]
    fn test_columns_in_definition_order() {
        let graph = crm();
        let account = graph.find_table("Account").unwrap();
        let names: Vec<&str> = graph
            .table_columns(&account.id)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["Id", "Name", "Industry", "ParentId"]);
    }

    #[test]
    fn test_table_info() {
        let graph = crm();
        let info = graph.table_info("Contact", None).unwrap();
        assert_eq!(info.columns.len(), 3);
        assert_eq!(info.primary_keys().next().map(|c| c.name.as_str()), Some("Id"));
        assert_eq!(
            info.foreign_keys,
            vec![ForeignKey {
                column_name: "AccountId".into(),
                referenced_table: "Account".into(),
                referenced_column: "Id".into(),
                relationship_name: Some("Account".into()),
            }]
        );
        assert!(graph.table_info("Nope", None).is_none());
        assert!(graph.table_info("Contact", Some("other")).is_none());
    }

    #[test]
    fn test_missing_type_uses_sentinel() {
        let mut mystery = FieldDescription::new("Mystery__c", "");
        mystery.field_type = None;
        let graph =
            SchemaGraph::from_descriptions(&[table("Widget", vec![mystery])]).unwrap();
        let info = graph.table_info("Widget", None).unwrap();
        assert_eq!(info.columns[0].data_type, UNKNOWN_TYPE);
    }

    #[test]
    fn test_relationships_both_directions() {
        let graph = crm();
        let rels = graph.analyze_table_relationships("Contact");
        assert_eq!(rels.len(), 2);
        assert!(rels.iter().any(|r| r.table == "Account"
            && r.column == "AccountId"
            && r.direction == RelationDirection::Outgoing));
        assert!(rels.iter().any(|r| r.table == "Case"
            && r.column == "ContactId"
            && r.direction == RelationDirection::Incoming));
        assert!(graph.analyze_table_relationships("Missing").is_empty());
    }

    #[test]
    fn test_self_reference_listed_once() {
        let graph = crm();
        let rels = graph.analyze_table_relationships("Account");
        let self_refs: Vec<_> = rels.iter().filter(|r| r.table == "Account").collect();
        assert_eq!(self_refs.len(), 1);
    }

    #[test]
    fn test_join_path_same_table_is_empty() {
        let graph = crm();
        assert_eq!(graph.find_join_path("Account", "Account"), JoinPath::Found(vec![]));
    }

    #[test]
    fn test_join_path_direct_fk() {
        let graph = crm();
        let path = graph.find_join_path("Contact", "Account");
        let steps = path.steps().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].direction, StepDirection::Forward);
        assert_eq!(steps[0].on_clause(), "Contact.AccountId = Account.Id");

        let back = graph.find_join_path("Account", "Contact");
        let steps = back.steps().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].direction, StepDirection::Reverse);
        assert_eq!(steps[0].from_table, "Account");
    }

    #[test]
    fn test_join_path_multi_hop_with_cycle() {
        let graph = crm();
        let path = graph.find_join_path("Case", "Account");
        let steps = path.steps().unwrap();
        let hops: Vec<(&str, &str)> = steps
            .iter()
            .map(|s| (s.from_table.as_str(), s.to_table.as_str()))
            .collect();
        assert_eq!(hops, vec![("Case", "Contact"), ("Contact", "Account")]);
    }

    #[test]
    fn test_join_path_disconnected_and_unknown() {
        let graph = crm();
        assert_eq!(graph.find_join_path("Task", "Account"), JoinPath::NoPath);
        assert_eq!(
            graph.find_join_path("Account", "Ghost"),
            JoinPath::UnknownTable("Ghost".into())
        );
    }

    #[test]
    fn test_join_path_tie_break_first_edge_wins() {
        // Two parallel foreign keys from Opportunity to Account.
        let graph = SchemaGraph::from_descriptions(&[
            table("Account", vec![FieldDescription::new("Id", "id")]),
            table(
                "Opportunity",
                vec![
                    FieldDescription::new("Id", "id"),
                    reference("AccountId", "Account", "Account"),
                    reference("PartnerAccountId", "Account", "PartnerAccount"),
                ],
            ),
        ])
        .unwrap();
        let path = graph.find_join_path("Opportunity", "Account");
        assert_eq!(path.steps().unwrap()[0].column_name, "AccountId");
    }

    #[test]
    fn test_child_relationship_edges_deduplicated() {
        let mut account = table("Account", vec![FieldDescription::new("Id", "id")]);
        account.child_relationships = vec![
            ChildRelationship {
                child_table: "Contact".into(),
                field: "AccountId".into(),
                relationship_name: Some("Contacts".into()),
            },
            ChildRelationship {
                child_table: "Note".into(),
                field: "ParentId".into(),
                relationship_name: Some("Notes".into()),
            },
        ];
        let contact = table(
            "Contact",
            vec![FieldDescription::new("Id", "id"), reference("AccountId", "Account", "Account")],
        );
        let note = table("Note", vec![FieldDescription::new("Id", "id")]);
        let graph = SchemaGraph::from_descriptions(&[account, contact, note]).unwrap();

        let relational: Vec<_> = graph.edges().iter().filter(|e| e.is_relational()).collect();
        assert_eq!(relational.len(), 2);
        assert_eq!(relational[0].kind, EdgeKind::ForeignKey);
        assert_eq!(relational[0].child_relationship_name.as_deref(), Some("Contacts"));
        assert_eq!(relational[1].kind, EdgeKind::Relationship);
        assert_eq!(relational[1].child_relationship_name.as_deref(), Some("Notes"));
        let path = graph.find_join_path("Note", "Account");
        assert_eq!(path.steps().unwrap()[0].column_name, "ParentId");
    }

    #[test]
    fn test_add_edge_rejects_dangling() {
        let mut graph = SchemaGraph::new();
        graph.add_node(GraphNode::table("A", None, None)).unwrap();
        let err = graph
            .add_edge(GraphEdge::contains("table:A", "column:A.x"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DanglingEdge(_)));
        assert!(matches!(
            graph.add_node(GraphNode::table("A", None, None)),
            Err(SchemaError::DuplicateNode(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let graph = crm();
        let restored = SchemaGraph::from_json(&graph.to_json()).unwrap();
        assert_eq!(restored.nodes(), graph.nodes());
        assert_eq!(restored.edges(), graph.edges());
        assert_eq!(
            restored.find_join_path("Case", "Account"),
            graph.find_join_path("Case", "Account")
        );
        assert_eq!(restored.table_info("Account", None), graph.table_info("Account", None));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(SchemaGraph::from_json(&serde_json::json!({"nodes": 3})).is_err());
        let dangling = serde_json::json!({
            "version": 1,
            "nodes": [],
            "edges": [{"kind": "CONTAINS", "source": "table:A", "target": "column:A.x"}]
        });
        assert!(matches!(
            SchemaGraph::from_json(&dangling),
            Err(SchemaError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_from_json_repeated_node_is_invalid_snapshot() {
        let mut snapshot = crm().to_json();
        let nodes = snapshot["nodes"].as_array_mut().unwrap();
        let first = nodes[0].clone();
        nodes.push(first);
        assert!(matches!(
            SchemaGraph::from_json(&snapshot),
            Err(SchemaError::InvalidSnapshot(_))
        ));
    }
}
