//! In-memory vector store with exact cosine ranking.
//!
//! Every query scores every stored vector. There is no approximate
//! nearest-neighbour structure; an HNSW layer would only matter for schemas
//! far wider than a CRM object model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VectorIndexError;

pub type Metadata = Map<String, Value>;

/// A stored vector together with its document payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Partial document attached to a vector on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInput {
    pub content: Option<String>,
    pub metadata: Option<Metadata>,
}

impl DocumentInput {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: Some(content.into()),
            metadata: Some(metadata),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    records: Vec<VectorRecord>,
    ids: HashSet<String>,
    dimension: Option<usize>,
    next_id: u64,
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: Option<usize>,
    #[serde(default)]
    next_id: u64,
    items: Vec<Value>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension locked by the first successful insert.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Check that every vector in a batch is non-empty and matches the
    /// locked dimension (or the first vector's, when nothing is locked yet).
    /// Returns the dimension the batch would be stored at. Never mutates.
    pub fn check_vectors(&self, vectors: &[Vec<f32>]) -> Result<usize, VectorIndexError> {
        let Some(first) = vectors.first() else {
            return Err(VectorIndexError::EmptyInput);
        };
        let expected = self.dimension.unwrap_or(first.len());
        for (position, v) in vectors.iter().enumerate() {
            if v.is_empty() {
                return Err(VectorIndexError::ZeroLength { position });
            }
            if v.len() != expected {
                return Err(VectorIndexError::DimensionMismatch {
                    expected,
                    actual: v.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Insert a batch of vectors.
    ///
    /// The whole batch is validated before anything is stored: an error
    /// leaves the index (and its locked dimension) unchanged. Ids are
    /// generated when `ids` is `None`.
    pub fn add_vectors(
        &mut self,
        vectors: Vec<Vec<f32>>,
        ids: Option<Vec<String>>,
        docs: Option<Vec<DocumentInput>>,
    ) -> Result<Vec<String>, VectorIndexError> {
        if vectors.is_empty() {
            return Err(VectorIndexError::EmptyInput);
        }
        if let Some(ids) = &ids {
            if ids.len() != vectors.len() {
                return Err(VectorIndexError::LengthMismatch {
                    what: "ids",
                    expected: vectors.len(),
                    actual: ids.len(),
                });
            }
        }
        if let Some(docs) = &docs {
            if docs.len() != vectors.len() {
                return Err(VectorIndexError::LengthMismatch {
                    what: "docs",
                    expected: vectors.len(),
                    actual: docs.len(),
                });
            }
        }

        let expected = self.check_vectors(&vectors)?;

        let mut next_id = self.next_id;
        let assigned: Vec<String> = match ids {
            Some(ids) => {
                let mut seen = HashSet::new();
                for id in &ids {
                    if self.ids.contains(id) || !seen.insert(id.as_str()) {
                        return Err(VectorIndexError::DuplicateId(id.clone()));
                    }
                }
                ids
            }
            None => {
                let mut out = Vec::with_capacity(vectors.len());
                for _ in 0..vectors.len() {
                    let mut candidate = format!("vec_{next_id}");
                    next_id += 1;
                    while self.ids.contains(&candidate) {
                        candidate = format!("vec_{next_id}");
                        next_id += 1;
                    }
                    out.push(candidate);
                }
                out
            }
        };

        let mut docs = docs.map(|d| d.into_iter());
        for (id, vector) in assigned.iter().zip(vectors) {
            let doc = docs.as_mut().and_then(|d| d.next()).unwrap_or_default();
            self.ids.insert(id.clone());
            self.records.push(VectorRecord {
                id: id.clone(),
                vector,
                content: doc.content.unwrap_or_default(),
                metadata: doc.metadata.unwrap_or_default(),
            });
        }
        self.dimension = Some(expected);
        self.next_id = next_id;

        tracing::debug!(
            target: "querysmith.vector",
            added = assigned.len(),
            total = self.records.len(),
            dimension = expected,
            "vectors added"
        );
        Ok(assigned)
    }

    /// Rank every stored vector against `query`, highest score first.
    ///
    /// Ties keep insertion order. `k` beyond the store size returns all
    /// records.
    pub fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, VectorIndexError> {
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(VectorIndexError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(query, &r.vector)))
            .collect();
        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| {
                let r = &self.records[i];
                SearchHit {
                    id: r.id.clone(),
                    content: r.content.clone(),
                    metadata: r.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Remove records by id. Unknown ids are skipped.
    pub fn delete_by_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        let before = self.records.len();
        self.records.retain(|r| !doomed.contains(r.id.as_str()));
        for id in &doomed {
            self.ids.remove(*id);
        }
        before - self.records.len()
    }

    /// Drop every record. The locked dimension and id counter survive, so
    /// generated ids stay unique across a clear.
    pub fn clear(&mut self) {
        self.records.clear();
        self.ids.clear();
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "dimension": self.dimension,
            "next_id": self.next_id,
            "items": self.records,
        })
    }

    /// Rebuild an index from [`VectorIndex::to_json`] output.
    ///
    /// A missing `items` array is fatal. Individual items that fail to
    /// decode, carry a vector of the wrong length or repeat an id are
    /// skipped.
    pub fn from_json(value: &Value) -> Result<Self, VectorIndexError> {
        let snapshot: IndexSnapshot = serde_json::from_value(value.clone())
            .map_err(|e| VectorIndexError::InvalidSnapshot(e.to_string()))?;

        let mut index = VectorIndex {
            dimension: snapshot.dimension,
            next_id: snapshot.next_id,
            ..Default::default()
        };

        for (pos, item) in snapshot.items.into_iter().enumerate() {
            let record: VectorRecord = match serde_json::from_value(item) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(target: "querysmith.vector", position = pos, error = %e, "skipping malformed item");
                    continue;
                }
            };
            if record.vector.is_empty() {
                tracing::warn!(target: "querysmith.vector", id = %record.id, "skipping empty vector");
                continue;
            }
            let dim = *index.dimension.get_or_insert(record.vector.len());
            if record.vector.len() != dim {
                tracing::warn!(
                    target: "querysmith.vector",
                    id = %record.id,
                    expected = dim,
                    actual = record.vector.len(),
                    "skipping item with wrong dimension"
                );
                continue;
            }
            if !index.ids.insert(record.id.clone()) {
                tracing::warn!(target: "querysmith.vector", id = %record.id, "skipping duplicate id");
                continue;
            }
            index.records.push(record);
        }

        Ok(index)
    }
}

/// `dot(a, b) / (|a| * |b|)`, or 0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
