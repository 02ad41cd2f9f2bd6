//! Embedding-aware document store over [`VectorIndex`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::embedding::EmbeddingService;
use super::index::{DocumentInput, Metadata, SearchHit, VectorIndex};
use crate::error::VectorIndexError;
use crate::schema::{NodeType, SchemaGraph};

/// One schema field as an indexable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDocument {
    pub table: String,
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub picklist_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
}

impl FieldDocument {
    pub fn new(table: &str, field: &str, field_type: &str) -> Self {
        Self {
            table: table.to_string(),
            field: field.to_string(),
            field_type: field_type.to_string(),
            label: None,
            picklist_values: Vec::new(),
            relationship_name: None,
            reference_to: Vec::new(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}.{}", self.table, self.field)
    }

    /// Text handed to the embedding service.
    pub fn content(&self) -> String {
        let mut text = format!("{}.{} ({})", self.table, self.field, self.field_type);
        if let Some(label) = &self.label {
            text.push_str(&format!(" label: {label}"));
        }
        if !self.picklist_values.is_empty() {
            text.push_str(&format!(" values: {}", self.picklist_values.join(", ")));
        }
        if let Some(rel) = &self.relationship_name {
            text.push_str(&format!(" relationship: {rel}"));
        }
        if !self.reference_to.is_empty() {
            text.push_str(&format!(" references: {}", self.reference_to.join(", ")));
        }
        text
    }

    pub fn metadata(&self) -> Metadata {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        }
    }

    /// Inverse of [`FieldDocument::metadata`]; `None` for records that were
    /// not written by a `FieldStore`.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        serde_json::from_value(Value::Object(metadata.clone())).ok()
    }
}

/// Owns one index and the embedder that feeds it. Build one per session.
pub struct FieldStore {
    index: VectorIndex,
    embedding: Arc<dyn EmbeddingService>,
}

impl FieldStore {
    pub fn new(embedding: Arc<dyn EmbeddingService>) -> Self {
        Self::with_index(VectorIndex::new(), embedding)
    }

    pub fn with_index(index: VectorIndex, embedding: Arc<dyn EmbeddingService>) -> Self {
        Self { index, embedding }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embed and insert documents. Ids are `Table.Field`; an id already in
    /// the store fails the whole batch.
    pub async fn add_documents(
        &mut self,
        docs: Vec<FieldDocument>,
    ) -> Result<Vec<String>, VectorIndexError> {
        if docs.is_empty() {
            return Err(VectorIndexError::EmptyInput);
        }
        let texts: Vec<String> = docs.iter().map(FieldDocument::content).collect();
        let vectors = self.embed_texts(&texts).await?;
        let ids = docs.iter().map(FieldDocument::id).collect();
        let inputs = docs
            .iter()
            .zip(texts)
            .map(|(doc, text)| DocumentInput::new(text, doc.metadata()))
            .collect();
        self.index.add_vectors(vectors, Some(ids), Some(inputs))
    }

    /// Delete any existing record with the same id, then insert.
    ///
    /// Embedding and the dimension check both happen before anything is
    /// deleted, so a failed upsert leaves the old records in place.
    pub async fn upsert_documents(
        &mut self,
        docs: Vec<FieldDocument>,
    ) -> Result<Vec<String>, VectorIndexError> {
        if docs.is_empty() {
            return Err(VectorIndexError::EmptyInput);
        }
        let texts: Vec<String> = docs.iter().map(FieldDocument::content).collect();
        let vectors = self.embed_texts(&texts).await?;
        let mut ids: Vec<String> = docs.iter().map(FieldDocument::id).collect();

        // Later duplicates in the batch replace earlier ones.
        let mut keep = vec![true; ids.len()];
        for i in 0..ids.len() {
            if ids[i + 1..].contains(&ids[i]) {
                keep[i] = false;
            }
        }
        let mut vectors_kept = Vec::new();
        let mut inputs = Vec::new();
        for (i, ((doc, text), vector)) in docs.iter().zip(texts).zip(vectors).enumerate() {
            if keep[i] {
                vectors_kept.push(vector);
                inputs.push(DocumentInput::new(text, doc.metadata()));
            }
        }
        let mut i = 0;
        ids.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });

        self.index.check_vectors(&vectors_kept)?;
        let removed = self.index.delete_by_ids(&ids);
        if removed > 0 {
            tracing::debug!(target: "querysmith.vector", removed, "replaced existing field documents");
        }
        self.index.add_vectors(vectors_kept, Some(ids), Some(inputs))
    }

    pub async fn search(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, VectorIndexError> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = self
            .embedding
            .embed(text)
            .await
            .map_err(|e| VectorIndexError::Embedding(e.to_string()))?;
        self.index.similarity_search(&query, k)
    }

    /// Index every column of `graph` as a field document, replacing any
    /// previous documents with the same ids. Returns the number indexed.
    pub async fn index_graph(&mut self, graph: &SchemaGraph) -> Result<usize, VectorIndexError> {
        let docs = field_documents(graph);
        if docs.is_empty() {
            return Ok(0);
        }
        let count = docs.len();
        self.upsert_documents(docs).await?;
        tracing::info!(target: "querysmith.vector", fields = count, "indexed schema fields");
        Ok(count)
    }

    pub fn to_json(&self) -> Value {
        json!({ "index": self.index.to_json() })
    }

    pub fn from_json(
        value: &Value,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Result<Self, VectorIndexError> {
        let inner = value
            .get("index")
            .ok_or_else(|| VectorIndexError::InvalidSnapshot("missing `index`".to_string()))?;
        Ok(Self::with_index(VectorIndex::from_json(inner)?, embedding))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorIndexError> {
        let vectors = self
            .embedding
            .embed_batch(texts)
            .await
            .map_err(|e| VectorIndexError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(VectorIndexError::LengthMismatch {
                what: "embeddings",
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

/// One document per column, in graph table order.
pub fn field_documents(graph: &SchemaGraph) -> Vec<FieldDocument> {
    let mut docs = Vec::new();
    for table in graph.nodes_by_type(NodeType::Table) {
        let Some(info) = graph.table_info(&table.name, table.namespace.as_deref()) else {
            continue;
        };
        for column in &info.columns {
            docs.push(FieldDocument {
                table: info.name.clone(),
                field: column.name.clone(),
                field_type: column.data_type.clone(),
                label: column.label.clone(),
                picklist_values: column.picklist_values.clone(),
                relationship_name: column.relationship_name.clone(),
                reference_to: column.reference_to.clone(),
            });
        }
    }
    docs
}
