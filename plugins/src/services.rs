//! `ServicesFactory` backed by the HTTP adapters, shared by the CLI.
use async_trait::async_trait;
use querysmith_core::api::{AppConfig, Services, ServicesFactory, SynthesisError};

use crate::factory;

pub struct PluginServicesFactory;

impl Default for PluginServicesFactory {
    fn default() -> Self {
        Self
    }
}

fn config_error(err: anyhow::Error) -> SynthesisError {
    SynthesisError::Config(format!("{err:#}"))
}

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, SynthesisError> {
        cfg.synthesis.validate(&cfg.context)?;
        Ok(Services {
            generator: factory::build_generator(cfg).map_err(config_error)?,
            executor: factory::build_executor(cfg).map_err(config_error)?,
            schema_source: factory::build_schema_source(cfg).map_err(config_error)?,
            snapshots: factory::build_snapshots(cfg).map_err(config_error)?,
            embedder: factory::build_embedder(cfg).map_err(config_error)?,
            attachments: Some(factory::build_attachments(cfg).map_err(config_error)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builds_from_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.snapshot.directory = Some(dir.path().to_string_lossy().to_string());
        let services = PluginServicesFactory.build_services(&cfg).await.unwrap();
        assert_eq!(services.generator.name(), "openai-chat");
        assert!(services.embedder.is_none());
        assert!(services.attachments.is_some());
    }

    #[tokio::test]
    async fn test_invalid_synthesis_config_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.synthesis.min_confidence = 2.0;
        let err = PluginServicesFactory.build_services(&cfg).await.err().unwrap();
        assert!(matches!(err, SynthesisError::Config(_)));
    }
}
