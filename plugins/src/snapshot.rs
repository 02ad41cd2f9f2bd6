use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use querysmith_core::api::SnapshotStore;

/// Schema snapshots as `{directory}/{key}.json`.
pub struct FileSnapshotStore {
    directory: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            anyhow::bail!("invalid snapshot key {key:?}");
        }
        Ok(self.directory.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(key)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(anyhow::anyhow!("read {} failed: {err}", path.display())),
        };
        let value = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
        Ok(Some(value))
    }

    async fn save(&self, key: &str, snapshot: &Value) -> anyhow::Result<String> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.directory).await?;
        // Write-then-rename so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let written = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::anyhow!("write {} failed: {err}", path.display()));
        }
        tracing::debug!(target: "querysmith.snapshot", path = %path.display(), "snapshot written");
        Ok(path.to_string_lossy().to_string())
    }
}
