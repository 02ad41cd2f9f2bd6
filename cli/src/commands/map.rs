use std::path::Path;

use querysmith_core::api::{map_csv, AppContext, CliError, CsvAttachment, SynthesisError};
use querysmith_core::ingest::ensure_within_limit;

use crate::commands::cli::MapArgs;
use crate::output::emit_json;

pub async fn handle_map(args: MapArgs, pretty: bool, ctx: &AppContext) -> Result<i32, CliError> {
    let mut cfg = ctx.cfg().clone();
    if args.no_header {
        cfg.ingest.has_header = false;
    }
    if let Some(delimiter) = args.delimiter {
        cfg.ingest.delimiter = delimiter;
    }

    let attachment = match (args.csv.as_deref(), args.attachment.as_deref()) {
        (Some(path), _) => CsvAttachment::Bytes(read_csv(Path::new(path), cfg.ingest.max_bytes)?),
        (None, Some(reference)) => CsvAttachment::from_reference(reference),
        (None, None) => {
            return Err(CliError::Command(
                "one of --csv or --attachment is required".to_string(),
            ))
        }
    };

    let ctx = ctx.with_config(cfg);
    let services = ctx.build_services().await?;
    let outcome = map_csv(&services, ctx.cfg(), attachment, &args.table, !args.no_snapshot).await?;
    tracing::info!(
        target: "querysmith.cli",
        table = %outcome.table,
        mapped = outcome.mappings.len(),
        unmapped = outcome.unmapped_headers.len(),
        "mapping finished"
    );
    emit_json(&outcome, pretty)?;
    Ok(0)
}

fn read_csv(path: &Path, max_bytes: usize) -> Result<Vec<u8>, CliError> {
    let size = std::fs::metadata(path)?.len();
    ensure_within_limit(usize::try_from(size).unwrap_or(usize::MAX), max_bytes)
        .map_err(SynthesisError::from)?;
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.csv");
        std::fs::write(&path, "First Name,Email\nAda,ada@example.com\n").unwrap();
        assert!(read_csv(&path, 1024).is_ok());
        let err = read_csv(&path, 8).unwrap_err();
        assert!(matches!(err, CliError::Synthesis(_)));
    }
}
