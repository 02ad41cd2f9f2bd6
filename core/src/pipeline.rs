//! End-to-end flows: discover, optionally index, then synthesize.

use serde::Serialize;

use crate::config::AppConfig;
use crate::context::Services;
use crate::error::SynthesisError;
use crate::ingest::{ensure_within_limit, CsvAttachment, TabularIngestor};
use crate::schema::DiscoveredSchema;
use crate::synth::{MappingOutcome, PlanOutcome, QueryRequest, SchemaInputs, SynthesisOutcome};
use crate::vector::FieldStore;

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Run the validated plan against the executor.
    pub execute: bool,
    pub use_snapshot: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            execute: true,
            use_snapshot: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryReport {
    Planned(PlanOutcome),
    Ran(SynthesisOutcome),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub tables: Vec<String>,
    pub failed_tables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_location: Option<String>,
    pub from_snapshot: bool,
}

impl From<&DiscoveredSchema> for DiscoveryReport {
    fn from(found: &DiscoveredSchema) -> Self {
        Self {
            tables: found.graph.table_names().into_iter().map(str::to_string).collect(),
            failed_tables: found.failed_tables.clone(),
            snapshot_location: found.snapshot_location.clone(),
            from_snapshot: found.from_snapshot,
        }
    }
}

pub async fn discover(
    services: &Services,
    tables: &[String],
    use_snapshot: bool,
) -> Result<DiscoveredSchema, SynthesisError> {
    Ok(services.discovery().discover(tables, use_snapshot).await?)
}

/// Discover the named tables, index their fields when an embedder is
/// configured, then plan (and optionally run) the query.
///
/// `preloaded` is a previously saved field index; it lets a request with
/// no table names fall back to vector retrieval.
#[tracing::instrument(name = "pipeline.query", skip_all, fields(execute = options.execute))]
pub async fn run_query(
    services: &Services,
    cfg: &AppConfig,
    request: &QueryRequest,
    options: QueryOptions,
    preloaded: Option<FieldStore>,
) -> Result<QueryReport, SynthesisError> {
    let synthesizer = services.synthesizer(cfg)?;
    if request.description.trim().is_empty() && request.tables.iter().all(|t| t.trim().is_empty()) {
        return Err(SynthesisError::Input(
            "a description or at least one table name is required".to_string(),
        ));
    }

    let discovered = if request.tables.iter().any(|t| !t.trim().is_empty()) {
        Some(discover(services, &request.tables, options.use_snapshot).await?)
    } else {
        None
    };
    let fields = match (preloaded, &discovered) {
        (Some(mut store), Some(found)) => {
            store.index_graph(&found.graph).await?;
            Some(store)
        }
        (Some(store), None) => Some(store),
        (None, Some(found)) => index_fields(services, found).await?,
        (None, None) => None,
    };

    let inputs = SchemaInputs {
        graph: discovered.as_ref().map(|d| &d.graph),
        fields: fields.as_ref(),
    };
    if options.execute {
        Ok(QueryReport::Ran(synthesizer.run(request, inputs).await?))
    } else {
        Ok(QueryReport::Planned(synthesizer.plan(request, inputs).await?))
    }
}

/// Resolve and parse a CSV attachment, then map its columns onto `table`.
#[tracing::instrument(name = "pipeline.map", skip_all, fields(table = %table))]
pub async fn map_csv(
    services: &Services,
    cfg: &AppConfig,
    attachment: CsvAttachment,
    table: &str,
    use_snapshot: bool,
) -> Result<MappingOutcome, SynthesisError> {
    let synthesizer = services.synthesizer(cfg)?;
    let bytes = attachment
        .resolve(services.attachments.as_deref(), cfg.ingest.max_bytes)
        .await?;
    ensure_within_limit(bytes.len(), cfg.ingest.max_bytes)?;
    let ingestor = TabularIngestor::new(cfg.ingest.delimiter_byte()?, cfg.ingest.sample_size);
    let parsed = ingestor.parse(&bytes, cfg.ingest.has_header)?;

    let found = discover(services, &[table.to_string()], use_snapshot).await?;
    synthesizer.map_fields(&parsed, table, &found.graph).await
}

/// Index a discovered graph into a fresh store.
pub async fn index_fields(
    services: &Services,
    found: &DiscoveredSchema,
) -> Result<Option<FieldStore>, SynthesisError> {
    let Some(mut store) = services.field_store() else {
        return Ok(None);
    };
    store.index_graph(&found.graph).await?;
    Ok(Some(store))
}
