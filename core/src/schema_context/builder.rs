//! Bounded schema context for generation.
//!
//! Graph data is authoritative for the tables it knows. Vector retrieval
//! only fills in tables the graph could not supply.

use std::collections::{BTreeMap, HashSet};

use super::types::{
    ChildRelationshipContext, ContextOrigin, FieldContext, JoinHint, SchemaContext, TableContext,
};
use crate::error::{SchemaError, SynthesisError};
use crate::schema::{JoinPath, RelationDirection, SchemaGraph, TableInfo};
use crate::vector::{FieldDocument, FieldStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_tables: usize,
    pub max_fields_per_table: usize,
    pub vector_top_k: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_tables: 8,
            max_fields_per_table: 200,
            vector_top_k: 40,
        }
    }
}

pub struct SchemaContextBuilder<'a> {
    graph: Option<&'a SchemaGraph>,
    fields: Option<&'a FieldStore>,
    limits: ContextLimits,
}

impl<'a> SchemaContextBuilder<'a> {
    pub fn new(limits: ContextLimits) -> Self {
        Self {
            graph: None,
            fields: None,
            limits,
        }
    }

    pub fn with_graph(mut self, graph: &'a SchemaGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_fields(mut self, fields: &'a FieldStore) -> Self {
        self.fields = Some(fields);
        self
    }

    #[tracing::instrument(name = "context.build", skip_all, fields(table_count = tables.len()))]
    pub async fn build(
        &self,
        tables: &[String],
        description: &str,
    ) -> Result<SchemaContext, SynthesisError> {
        let requested: Vec<&str> = tables
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let description = description.trim();
        if requested.is_empty() && description.is_empty() {
            return Err(SynthesisError::Input(
                "a description or at least one table name is required".to_string(),
            ));
        }

        let mut out: BTreeMap<String, TableContext> = BTreeMap::new();
        let mut missing: Vec<String> = Vec::new();
        let mut empty_tables: Vec<String> = Vec::new();

        if let Some(graph) = self.graph {
            for name in &requested {
                if out.len() >= self.limits.max_tables {
                    tracing::debug!(target: "querysmith.context", table = %name, "table limit reached");
                    break;
                }
                match graph.table_info(name, None) {
                    Some(info) if info.columns.is_empty() => empty_tables.push(info.name),
                    Some(info) => {
                        let ctx = self.graph_table(graph, &info);
                        out.insert(info.name, ctx);
                    }
                    None => missing.push((*name).to_string()),
                }
            }
        } else {
            missing.extend(requested.iter().map(|t| t.to_string()));
        }
        let from_graph = !out.is_empty();

        let mut from_vector = false;
        if let Some(store) = self.fields {
            let needs_discovery = requested.is_empty() || !missing.is_empty();
            let query = if description.is_empty() {
                missing.join(" ")
            } else {
                description.to_string()
            };
            if needs_discovery && !query.is_empty() {
                let hits = store.search(&query, self.limits.vector_top_k).await?;
                let graph_tables: HashSet<String> = out.keys().cloned().collect();
                for hit in hits.into_iter().filter(|h| h.score > 0.0) {
                    let Some(doc) = FieldDocument::from_metadata(&hit.metadata) else {
                        continue;
                    };
                    if graph_tables.contains(&doc.table) {
                        continue;
                    }
                    if self.add_vector_field(&mut out, doc) {
                        from_vector = true;
                    }
                }
                missing.retain(|m| !out.keys().any(|t| t.eq_ignore_ascii_case(m)));
            }
        }

        if out.is_empty() {
            let err = if let Some(table) = empty_tables.into_iter().next() {
                SchemaError::NoColumns(table)
            } else if !missing.is_empty() {
                SchemaError::TableNotFound(missing.join(", "))
            } else {
                SchemaError::NoMatchingFields
            };
            return Err(err.into());
        }

        let join_hints = match self.graph {
            Some(graph) => join_hints(graph, &requested, &out),
            None => Vec::new(),
        };
        let origin = match (from_graph, from_vector) {
            (true, true) => ContextOrigin::Mixed,
            (false, true) => ContextOrigin::Vector,
            _ => ContextOrigin::Graph,
        };
        if !missing.is_empty() {
            tracing::warn!(target: "querysmith.context", missing = ?missing, "tables absent from schema context");
        }
        let context = SchemaContext {
            tables: out,
            origin,
            missing_tables: missing,
            join_hints,
        };
        tracing::debug!(
            target: "querysmith.context",
            tables = context.tables.len(),
            fields = context.field_count(),
            origin = ?context.origin,
            "schema context built"
        );
        Ok(context)
    }

    fn graph_table(&self, graph: &SchemaGraph, info: &TableInfo) -> TableContext {
        // Primary keys first so truncation never drops them.
        let mut columns: Vec<_> = info.primary_keys().collect();
        columns.extend(info.columns.iter().filter(|c| !c.is_primary_key));

        let mut seen = HashSet::new();
        let fields = columns
            .into_iter()
            .filter(|c| seen.insert(c.name.as_str()))
            .take(self.limits.max_fields_per_table)
            .map(FieldContext::from)
            .collect();

        let child_relationships = graph
            .analyze_table_relationships(&info.name)
            .into_iter()
            .filter(|r| r.direction == RelationDirection::Incoming)
            .map(|r| ChildRelationshipContext {
                child_table: r.table,
                field: r.column,
                relationship_name: r.child_relationship_name,
            })
            .collect();

        TableContext {
            fields,
            child_relationships,
        }
    }

    /// Returns false when the field was a duplicate or over a limit.
    fn add_vector_field(&self, out: &mut BTreeMap<String, TableContext>, doc: FieldDocument) -> bool {
        if !out.contains_key(&doc.table) && out.len() >= self.limits.max_tables {
            return false;
        }
        let table = out.entry(doc.table.clone()).or_default();
        if table.has_field(&doc.field) || table.fields.len() >= self.limits.max_fields_per_table {
            return false;
        }
        table.fields.push(FieldContext::from(doc));
        true
    }
}

/// Paths from the first requested table to each other requested table.
fn join_hints(
    graph: &SchemaGraph,
    requested: &[&str],
    covered: &BTreeMap<String, TableContext>,
) -> Vec<JoinHint> {
    let resolved: Vec<&str> = requested
        .iter()
        .copied()
        .filter_map(|name| graph.find_table(name).map(|n| n.name.as_str()))
        .filter(|name| covered.contains_key(*name))
        .collect();
    let Some((anchor, rest)) = resolved.split_first() else {
        return Vec::new();
    };
    let mut hints = Vec::new();
    for other in rest {
        if let JoinPath::Found(steps) = graph.find_join_path(anchor, other) {
            if !steps.is_empty() {
                hints.push(JoinHint {
                    from: (*anchor).to_string(),
                    to: (*other).to_string(),
                    steps,
                });
            }
        }
    }
    hints
}
