use std::path::Path;

use querysmith_core::api::{
    run_query, AppContext, CliError, FieldStore, QueryOptions, QueryRequest, Services,
    SynthesisError,
};

use crate::commands::cli::QueryArgs;
use crate::output::{emit_json, exit_code_for_status};

pub async fn handle_query(
    args: QueryArgs,
    pretty: bool,
    ctx: &AppContext,
) -> Result<i32, CliError> {
    let mut cfg = ctx.cfg().clone();
    if args.tools {
        cfg.synthesis.enable_tools = true;
    }
    let ctx = ctx.with_config(cfg);
    let services = ctx.build_services().await?;

    let preloaded = match args.field_index.as_deref() {
        Some(path) => Some(load_field_index(Path::new(path), &services)?),
        None => None,
    };
    let request = QueryRequest {
        description: args.description,
        tables: args.tables,
    };
    let options = QueryOptions {
        execute: !args.plan_only,
        use_snapshot: !args.no_snapshot,
    };
    tracing::info!(
        target: "querysmith.cli",
        tables = request.tables.len(),
        execute = options.execute,
        "query requested"
    );

    let report = run_query(&services, ctx.cfg(), &request, options, preloaded).await?;
    let value = serde_json::to_value(&report)
        .map_err(|e| CliError::Command(format!("serialize report failed: {e}")))?;
    emit_json(&value, pretty)?;
    Ok(exit_code_for_status(&value))
}

fn load_field_index(path: &Path, services: &Services) -> Result<FieldStore, CliError> {
    let Some(embedder) = services.embedder.clone() else {
        return Err(CliError::Config(
            "--field-index needs embedding.enabled = true".to_string(),
        ));
    };
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        CliError::Command(format!("field index {} is not JSON: {e}", path.display()))
    })?;
    let store = FieldStore::from_json(&value, embedder).map_err(SynthesisError::from)?;
    tracing::debug!(target: "querysmith.cli", documents = store.len(), "field index loaded");
    Ok(store)
}
