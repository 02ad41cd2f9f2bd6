#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use querysmith_core::api::{
    EmbeddingService, ExecutionError, FieldDescription, GenerationCapability, GenerationRequest,
    GenerationResponse, QueryExecutor, SchemaSource, Services, SnapshotStore, TableDescription,
};

pub fn table(name: &str, fields: &[(&str, &str)]) -> TableDescription {
    TableDescription {
        name: name.to_string(),
        label: None,
        namespace: None,
        fields: fields
            .iter()
            .map(|(field, ty)| FieldDescription::new(field, ty))
            .collect(),
        child_relationships: Vec::new(),
    }
}

/// Schema source backed by a fixed set of describes.
pub struct StubSource {
    tables: HashMap<String, TableDescription>,
    pub calls: AtomicUsize,
}

impl StubSource {
    pub fn new(tables: Vec<TableDescription>) -> Arc<Self> {
        Arc::new(Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn describe(&self, table: &str) -> anyhow::Result<TableDescription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("NOT_FOUND: {table}"))
    }
}

type Responder = dyn Fn(&GenerationRequest) -> anyhow::Result<GenerationResponse> + Send + Sync;

/// Generation capability driven by a closure; records every prompt.
pub struct FnGenerator {
    respond: Box<Responder>,
    pub prompts: Mutex<Vec<String>>,
}

impl FnGenerator {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&GenerationRequest) -> anyhow::Result<GenerationResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with the given plan fields.
    pub fn plan(query: &str, tables: &[&str], confidence: f64) -> Arc<Self> {
        let plan = json!({
            "query": query,
            "tablesUsed": tables,
            "rationale": "stub plan",
            "confidence": confidence,
        });
        Self::new(move |_| Ok(GenerationResponse::Final(plan.clone())))
    }
}

#[async_trait]
impl GenerationCapability for FnGenerator {
    fn name(&self) -> &str {
        "fn-generator"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        (self.respond)(request)
    }
}

/// Maps CSV columns to fields whose normalized name equals or prefixes the
/// normalized header, reading both lists back out of the mapping prompt.
pub fn fuzzy_mapper() -> Arc<FnGenerator> {
    FnGenerator::new(|request| {
        let (columns, fields) = mapping_lists(&request.prompt);
        let mut mappings = Vec::new();
        for column in &columns {
            let header = normalize(column);
            for field in &fields {
                let target = normalize(field);
                let confidence = if header == target {
                    0.95
                } else if header.starts_with(&target) {
                    0.8
                } else {
                    continue;
                };
                mappings.push(json!({
                    "sourceField": column,
                    "targetField": field,
                    "targetType": "string",
                    "confidence": confidence,
                }));
            }
        }
        Ok(GenerationResponse::Final(json!({ "mappings": mappings })))
    })
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn mapping_lists(prompt: &str) -> (Vec<String>, Vec<String>) {
    let mut columns = Vec::new();
    let mut fields = Vec::new();
    let mut section = 0;
    for line in prompt.lines() {
        if line.starts_with("CSV columns") {
            section = 1;
            continue;
        }
        if line.ends_with("fields (name: type):") {
            section = 2;
            continue;
        }
        let Some(item) = line.strip_prefix("- ") else {
            continue;
        };
        let Some((name, _)) = item.split_once(':') else {
            continue;
        };
        match section {
            1 => columns.push(name.to_string()),
            2 => fields.push(name.to_string()),
            _ => {}
        }
    }
    (columns, fields)
}

/// Executor returning fixed rows (or a fixed error) and recording queries.
pub struct StubExecutor {
    result: Result<Vec<Value>, ExecutionError>,
    pub queries: Mutex<Vec<String>>,
}

impl StubExecutor {
    pub fn rows(rows: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(rows),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ExecutionError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn executed(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, query: &str) -> Result<Vec<Value>, ExecutionError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone()
    }
}

#[derive(Default)]
pub struct MemorySnapshots {
    blobs: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl SnapshotStore for MemorySnapshots {
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, snapshot: &Value) -> anyhow::Result<String> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), snapshot.clone());
        Ok(format!("memory://{key}"))
    }
}

/// Bag-of-words embedder over a fixed vocabulary.
pub struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocab: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            vocab: vocab.to_vec(),
        })
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self
            .vocab
            .iter()
            .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.vocab.len()
    }
}

pub fn services(
    generator: Arc<FnGenerator>,
    executor: Arc<StubExecutor>,
    source: Arc<StubSource>,
) -> Services {
    Services {
        generator,
        executor,
        schema_source: source,
        snapshots: None,
        embedder: None,
        attachments: None,
    }
}
