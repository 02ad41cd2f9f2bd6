use async_trait::async_trait;
use serde_json::Value;

use super::describe::TableDescription;

/// Live schema introspection, one table at a time.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    fn name(&self) -> &str;
    async fn describe(&self, table: &str) -> anyhow::Result<TableDescription>;
}

/// Persistence for serialized [`SchemaGraph`](super::SchemaGraph) snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
    /// Returns the location the snapshot was written to.
    async fn save(&self, key: &str, snapshot: &Value) -> anyhow::Result<String>;
}
