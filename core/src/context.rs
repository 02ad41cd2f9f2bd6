use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::SynthesisError;
use crate::execution::QueryExecutor;
use crate::generation::GenerationCapability;
use crate::ingest::AttachmentFetcher;
use crate::schema::{SchemaDiscovery, SchemaSource, SnapshotStore};
use crate::synth::QuerySynthesizer;
use crate::vector::{EmbeddingService, FieldStore};

/// Collaborators for one session. Nothing here is global; build one set
/// per tenant or session.
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn GenerationCapability>,
    pub executor: Arc<dyn QueryExecutor>,
    pub schema_source: Arc<dyn SchemaSource>,
    pub snapshots: Option<Arc<dyn SnapshotStore>>,
    pub embedder: Option<Arc<dyn EmbeddingService>>,
    pub attachments: Option<Arc<dyn AttachmentFetcher>>,
}

impl Services {
    pub fn discovery(&self) -> SchemaDiscovery {
        SchemaDiscovery::new(Arc::clone(&self.schema_source), self.snapshots.clone())
    }

    pub fn synthesizer(&self, cfg: &AppConfig) -> Result<QuerySynthesizer, SynthesisError> {
        QuerySynthesizer::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.executor),
            cfg.synthesis.clone(),
            &cfg.context,
        )
    }

    /// Empty field store, or `None` when no embedder is configured.
    pub fn field_store(&self) -> Option<FieldStore> {
        self.embedder.as_ref().map(|e| FieldStore::new(Arc::clone(e)))
    }
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, SynthesisError>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    services_factory: Option<Arc<dyn ServicesFactory>>,
}

impl AppContext {
    pub fn new(cfg: AppConfig, services_factory: Option<Arc<dyn ServicesFactory>>) -> Self {
        Self {
            cfg,
            services_factory,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn with_config(&self, cfg: AppConfig) -> Self {
        Self {
            cfg,
            services_factory: self.services_factory.clone(),
        }
    }

    pub async fn build_services(&self) -> Result<Services, SynthesisError> {
        let Some(factory) = self.services_factory.as_ref() else {
            return Err(SynthesisError::Config(
                "services_factory missing (cannot build plugins/services)".into(),
            ));
        };
        factory.build_services(&self.cfg).await
    }
}
