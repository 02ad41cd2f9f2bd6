//! Live introspection with snapshot reuse.

use std::sync::Arc;

use futures::future::join_all;
use sha2::{Digest, Sha256};

use super::describe::TableDescription;
use super::graph::SchemaGraph;
use super::r#trait::{SchemaSource, SnapshotStore};
use crate::error::SchemaError;

#[derive(Debug, Clone)]
pub struct DiscoveredSchema {
    pub graph: SchemaGraph,
    /// Tables the source could not describe.
    pub failed_tables: Vec<String>,
    pub snapshot_location: Option<String>,
    pub from_snapshot: bool,
}

#[derive(Clone)]
pub struct SchemaDiscovery {
    source: Arc<dyn SchemaSource>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
}

impl SchemaDiscovery {
    pub fn new(source: Arc<dyn SchemaSource>, snapshots: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self { source, snapshots }
    }

    /// Describe every table concurrently. A failed describe yields `None`
    /// for that table instead of aborting the batch.
    pub async fn describe_all(&self, tables: &[String]) -> Vec<(String, Option<TableDescription>)> {
        let futures = tables.iter().map(|table| {
            let source = Arc::clone(&self.source);
            async move {
                match source.describe(table).await {
                    Ok(desc) => (table.clone(), Some(desc)),
                    Err(err) => {
                        tracing::warn!(
                            target: "querysmith.discovery",
                            table = %table,
                            source = source.name(),
                            error = %err,
                            "describe failed"
                        );
                        (table.clone(), None)
                    }
                }
            }
        });
        join_all(futures).await
    }

    /// Resolve the schema for `tables`, reusing a stored snapshot when it
    /// covers every requested table.
    #[tracing::instrument(name = "schema.discover", skip(self), fields(source = self.source.name()))]
    pub async fn discover(
        &self,
        tables: &[String],
        use_snapshot: bool,
    ) -> Result<DiscoveredSchema, SchemaError> {
        let tables = normalize_tables(tables);
        if tables.is_empty() {
            return Err(SchemaError::NoTablesDiscovered(Vec::new()));
        }
        let key = snapshot_key(&tables);

        if use_snapshot {
            if let Some(graph) = self.load_snapshot(&key, &tables).await {
                tracing::info!(target: "querysmith.discovery", key = %key, "schema snapshot reused");
                return Ok(DiscoveredSchema {
                    graph,
                    failed_tables: Vec::new(),
                    snapshot_location: None,
                    from_snapshot: true,
                });
            }
        }

        let described = self.describe_all(&tables).await;
        let mut failed_tables = Vec::new();
        let mut descriptions = Vec::new();
        for (table, desc) in described {
            match desc {
                Some(d) => descriptions.push(d),
                None => failed_tables.push(table),
            }
        }
        if descriptions.is_empty() {
            return Err(SchemaError::NoTablesDiscovered(failed_tables));
        }

        let graph = SchemaGraph::from_descriptions(&descriptions)?;
        let snapshot_location = match &self.snapshots {
            Some(store) => match store.save(&key, &graph.to_json()).await {
                Ok(location) => {
                    tracing::debug!(target: "querysmith.discovery", location = %location, "schema snapshot written");
                    Some(location)
                }
                Err(err) => {
                    tracing::warn!(target: "querysmith.discovery", key = %key, error = %err, "snapshot write failed");
                    None
                }
            },
            None => None,
        };

        tracing::info!(
            target: "querysmith.discovery",
            described = descriptions.len(),
            failed = failed_tables.len(),
            "live schema introspection finished"
        );
        Ok(DiscoveredSchema {
            graph,
            failed_tables,
            snapshot_location,
            from_snapshot: false,
        })
    }

    async fn load_snapshot(&self, key: &str, tables: &[String]) -> Option<SchemaGraph> {
        let store = self.snapshots.as_ref()?;
        let value = match store.load(key).await {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(target: "querysmith.discovery", key = %key, error = %err, "snapshot read failed");
                return None;
            }
        };
        // A corrupt snapshot is replaced by a fresh introspection.
        let graph = match SchemaGraph::from_json(&value) {
            Ok(g) => g,
            Err(err) => {
                tracing::warn!(target: "querysmith.discovery", key = %key, error = %err, "discarding invalid snapshot");
                return None;
            }
        };
        if tables.iter().all(|t| graph.contains_table(t)) {
            Some(graph)
        } else {
            None
        }
    }
}

fn normalize_tables(tables: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in tables.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

/// Deterministic snapshot key for a table set, independent of order and case.
pub fn snapshot_key(tables: &[String]) -> String {
    let mut names: Vec<String> = tables
        .iter()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    names.sort();
    names.dedup();
    let joined = names.join("+");
    let digest = Sha256::digest(joined.as_bytes());
    let readable: String = joined
        .chars()
        .take(48)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect();
    format!("schema-{readable}-{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe::FieldDescription;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SchemaSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn describe(&self, table: &str) -> anyhow::Result<TableDescription> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if table == "Broken" {
                anyhow::bail!("describe returned 404");
            }
            Ok(TableDescription {
                name: table.to_string(),
                label: None,
                namespace: None,
                fields: vec![FieldDescription::new("Id", "id")],
                child_relationships: Vec::new(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        blobs: Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl SnapshotStore for MemoryStore {
        async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
            Ok(self.blobs.lock().unwrap().get(key).cloned())
        }

        async fn save(&self, key: &str, snapshot: &Value) -> anyhow::Result<String> {
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), snapshot.clone());
            Ok(format!("mem://{key}"))
        }
    }

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_snapshot_key_is_order_insensitive() {
        assert_eq!(
            snapshot_key(&names(&["Contact", "Account"])),
            snapshot_key(&names(&["account", "CONTACT", "Account"]))
        );
        assert_ne!(
            snapshot_key(&names(&["Account"])),
            snapshot_key(&names(&["Contact"]))
        );
    }

    #[test]
    fn test_snapshot_key_ends_with_sha256_prefix() {
        let key = snapshot_key(&names(&["Contact", "Account"]));
        let expected = hex::encode(&Sha256::digest(b"account+contact")[..8]);
        assert_eq!(key, format!("schema-account-contact-{expected}"));
    }

    #[tokio::test]
    async fn test_failed_tables_recorded_not_fatal() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let discovery = SchemaDiscovery::new(source.clone(), None);
        let found = discovery
            .discover(&names(&["Account", "Broken"]), true)
            .await
            .unwrap();
        assert_eq!(found.failed_tables, vec!["Broken".to_string()]);
        assert!(found.graph.contains_table("Account"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_all_failed_is_error() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let discovery = SchemaDiscovery::new(source, None);
        let err = discovery
            .discover(&names(&["Broken"]), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::NoTablesDiscovered(t) if t == vec!["Broken".to_string()]));
    }

    #[tokio::test]
    async fn test_snapshot_written_then_reused() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::default());
        let discovery = SchemaDiscovery::new(source.clone(), Some(store.clone()));
        let tables = names(&["Account", "Contact"]);

        let first = discovery.discover(&tables, true).await.unwrap();
        assert!(!first.from_snapshot);
        assert!(first.snapshot_location.unwrap().starts_with("mem://schema-"));

        let second = discovery.discover(&tables, true).await.unwrap();
        assert!(second.from_snapshot);
        assert_eq!(second.graph.nodes(), first.graph.nodes());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        discovery.discover(&tables, false).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_live() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::default());
        let tables = names(&["Account"]);
        store
            .save(&snapshot_key(&tables), &serde_json::json!({"bogus": true}))
            .await
            .unwrap();
        let discovery = SchemaDiscovery::new(source.clone(), Some(store));
        let found = discovery.discover(&tables, true).await.unwrap();
        assert!(!found.from_snapshot);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
