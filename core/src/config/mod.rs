mod load;
mod types;

pub use load::{apply_env_overrides, data_dir, expand_path, load_default, load_from};
pub use types::{
    AppConfig, ContextConfig, EmbeddingConfig, EmbeddingProvider, GenerationConfig, IngestConfig,
    LoggingConfig, SnapshotConfig, SourceConfig, SynthesisConfig,
};
