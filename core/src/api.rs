//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `querysmith_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, AppConfig, ContextConfig, EmbeddingConfig, EmbeddingProvider, GenerationConfig,
    IngestConfig, LoggingConfig, SnapshotConfig, SourceConfig, SynthesisConfig,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::error::{
    CliError, ErrorKind, ExecutionError, IngestError, SchemaError, SynthesisError,
    VectorIndexError,
};
pub use crate::execution::QueryExecutor;
pub use crate::generation::{
    GenerationCapability, GenerationRequest, GenerationResponse, OutputSchema, ToolCall,
    ToolResult, ToolRound, ToolSpec,
};
pub use crate::ingest::{
    AttachmentFetcher, CsvAttachment, InferredColumnType, ParsedTable, TabularIngestor,
};
pub use crate::pipeline::{
    discover, index_fields, map_csv, run_query, DiscoveryReport, QueryOptions, QueryReport,
};
pub use crate::schema::{
    DiscoveredSchema, FieldDescription, JoinPath, SchemaDiscovery, SchemaGraph, SchemaSource,
    SnapshotStore, TableDescription, TableInfo,
};
pub use crate::schema_context::{ContextLimits, SchemaContext, SchemaContextBuilder};
pub use crate::synth::{
    FieldMapping, MappingOutcome, PlanOutcome, QueryPlan, QueryRequest, QuerySynthesizer,
    Rejection, SchemaInputs, SynthesisOutcome,
};
pub use crate::vector::{EmbeddingService, FieldDocument, FieldStore, VectorIndex};
