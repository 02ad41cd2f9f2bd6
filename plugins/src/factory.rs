use std::sync::Arc;

use anyhow::Result;

use querysmith_core::api::{
    AppConfig, AttachmentFetcher, EmbeddingProvider, EmbeddingService, GenerationCapability,
    QueryExecutor, SchemaSource, SnapshotStore,
};
use querysmith_core::config::data_dir;

use crate::attachment::HttpAttachmentFetcher;
use crate::embedding::{OllamaEmbeddingService, OpenAIEmbeddingService};
use crate::execution::HttpQueryExecutor;
use crate::generation::OpenAiChatGenerator;
use crate::snapshot::FileSnapshotStore;
use crate::source::HttpSchemaSource;

pub fn build_generator(cfg: &AppConfig) -> Result<Arc<dyn GenerationCapability>> {
    Ok(Arc::new(OpenAiChatGenerator::new(&cfg.generation)?))
}

pub fn build_executor(cfg: &AppConfig) -> Result<Arc<dyn QueryExecutor>> {
    Ok(Arc::new(HttpQueryExecutor::new(&cfg.source)?))
}

pub fn build_schema_source(cfg: &AppConfig) -> Result<Arc<dyn SchemaSource>> {
    Ok(Arc::new(HttpSchemaSource::new(&cfg.source)?))
}

pub fn build_embedder(cfg: &AppConfig) -> Result<Option<Arc<dyn EmbeddingService>>> {
    if !cfg.embedding.enabled {
        return Ok(None);
    }
    let service: Arc<dyn EmbeddingService> = match cfg.embedding.provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingService::new(&cfg.embedding)?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbeddingService::new(&cfg.embedding)?),
    };
    Ok(Some(service))
}

pub fn build_snapshots(cfg: &AppConfig) -> Result<Option<Arc<dyn SnapshotStore>>> {
    if !cfg.snapshot.enabled {
        return Ok(None);
    }
    let directory = match cfg.snapshot.directory.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => dir.into(),
        _ => data_dir()?.join("snapshots"),
    };
    Ok(Some(Arc::new(FileSnapshotStore::new(directory))))
}

pub fn build_attachments(cfg: &AppConfig) -> Result<Arc<dyn AttachmentFetcher>> {
    Ok(Arc::new(HttpAttachmentFetcher::new(cfg.ingest.fetch_timeout_ms)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_disabled_by_default() {
        assert!(build_embedder(&AppConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_snapshots_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.snapshot.directory = Some(dir.path().to_string_lossy().to_string());
        assert!(build_snapshots(&cfg).unwrap().is_some());
        cfg.snapshot.enabled = false;
        assert!(build_snapshots(&cfg).unwrap().is_none());
    }
}
