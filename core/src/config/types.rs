use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "querysmith_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_generation_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_generation_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_generation_timeout_ms() -> u64 {
    120_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            api_key: String::new(),
            model: default_generation_model(),
            temperature: 0.0,
            timeout_ms: default_generation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Vector retrieval is skipped entirely when disabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Ollama
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_embedding_timeout_ms() -> u64 {
    30_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_embedding_provider(),
            base_url: default_embedding_url(),
            api_key: String::new(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

/// Data service exposing table describes and query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// `{table}` is replaced with the table name.
    #[serde(default = "default_describe_path")]
    pub describe_path: String,
    #[serde(default = "default_query_path")]
    pub query_path: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_source_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_describe_path() -> String {
    "/schema/{table}/describe".to_string()
}

fn default_query_path() -> String {
    "/query".to_string()
}

fn default_source_timeout_ms() -> u64 {
    30_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            api_key: String::new(),
            describe_path: default_describe_path(),
            query_path: default_query_path(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_enabled")]
    pub enabled: bool,
    /// Defaults to `~/.querysmith/snapshots`.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_snapshot_enabled() -> bool {
    true
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_snapshot_enabled(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_delimiter() -> char {
    ','
}

fn default_has_header() -> bool {
    true
}

fn default_sample_size() -> usize {
    crate::ingest::DEFAULT_SAMPLE_SIZE
}

fn default_max_bytes() -> usize {
    crate::ingest::DEFAULT_MAX_BYTES
}

fn default_fetch_timeout_ms() -> u64 {
    60_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            sample_size: default_sample_size(),
            max_bytes: default_max_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl IngestConfig {
    /// Delimiter as a single byte; multi-byte characters are not supported.
    pub fn delimiter_byte(&self) -> Result<u8, SynthesisError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                SynthesisError::Config(format!(
                    "ingest.delimiter must be an ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,
    #[serde(default = "default_max_fields_per_table")]
    pub max_fields_per_table: usize,
    #[serde(default = "default_vector_top_k")]
    pub vector_top_k: usize,
}

fn default_max_tables() -> usize {
    8
}

fn default_max_fields_per_table() -> usize {
    200
}

fn default_vector_top_k() -> usize {
    40
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tables: default_max_tables(),
            max_fields_per_table: default_max_fields_per_table(),
            vector_top_k: default_vector_top_k(),
        }
    }
}

impl ContextConfig {
    pub fn limits(&self) -> crate::schema_context::ContextLimits {
        crate::schema_context::ContextLimits {
            max_tables: self.max_tables,
            max_fields_per_table: self.max_fields_per_table,
            vector_top_k: self.vector_top_k,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// The only statement keyword a generated query may start with.
    #[serde(default = "default_read_only_keyword")]
    pub read_only_keyword: String,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Let the model call schema tools before answering.
    #[serde(default)]
    pub enable_tools: bool,
    #[serde(default = "default_max_tool_steps")]
    pub max_tool_steps: usize,
    /// Minimum confidence for a field mapping to be kept.
    #[serde(default = "default_min_mapping_confidence")]
    pub min_mapping_confidence: f64,
}

fn default_read_only_keyword() -> String {
    "SELECT".to_string()
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_max_tool_steps() -> usize {
    4
}

fn default_min_mapping_confidence() -> f64 {
    0.0
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            read_only_keyword: default_read_only_keyword(),
            min_confidence: default_min_confidence(),
            enable_tools: false,
            max_tool_steps: default_max_tool_steps(),
            min_mapping_confidence: default_min_mapping_confidence(),
        }
    }
}

impl SynthesisConfig {
    /// Check every field and report all problems together.
    pub fn validate(&self, context: &ContextConfig) -> Result<(), SynthesisError> {
        let mut problems = Vec::new();
        let keyword = self.read_only_keyword.trim();
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphabetic()) {
            problems.push(format!(
                "synthesis.read_only_keyword must be a single word, got {:?}",
                self.read_only_keyword
            ));
        }
        for (name, value) in [
            ("synthesis.min_confidence", self.min_confidence),
            ("synthesis.min_mapping_confidence", self.min_mapping_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if self.enable_tools && self.max_tool_steps == 0 {
            problems.push("synthesis.max_tool_steps must be at least 1 when tools are enabled".to_string());
        }
        for (name, value) in [
            ("context.max_tables", context.max_tables),
            ("context.max_fields_per_table", context.max_fields_per_table),
            ("context.vector_top_k", context.vector_top_k),
        ] {
            if value == 0 {
                problems.push(format!("{name} must be greater than zero"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SynthesisError::Config(problems.join("; ")))
        }
    }
}
