use std::path::Path;

use serde_json::json;

use querysmith_core::api::{discover, index_fields, AppContext, CliError, DiscoveryReport};

use crate::commands::cli::DiscoverArgs;
use crate::output::emit_json;

pub async fn handle_discover(
    args: DiscoverArgs,
    pretty: bool,
    ctx: &AppContext,
) -> Result<i32, CliError> {
    let services = ctx.build_services().await?;
    let found = discover(&services, &args.tables, !args.no_snapshot).await?;
    let mut report = serde_json::to_value(DiscoveryReport::from(&found))
        .map_err(|e| CliError::Command(format!("serialize report failed: {e}")))?;

    if let Some(path) = args.save_index.as_deref() {
        let store = index_fields(&services, &found).await?.ok_or_else(|| {
            CliError::Config("--save-index needs embedding.enabled = true".to_string())
        })?;
        write_json(Path::new(path), &store.to_json())?;
        report["fieldIndex"] = json!({ "path": path, "documents": store.len() });
    }

    emit_json(&report, pretty)?;
    Ok(0)
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_vec(value)
        .map_err(|e| CliError::Command(format!("serialize field index failed: {e}")))?;
    std::fs::write(path, rendered)?;
    Ok(())
}
