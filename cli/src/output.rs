use std::io::Write;

use querysmith_core::api::CliError;
use serde_json::Value;

/// Exit code for a run whose plan failed validation. Not an error: the
/// rejection itself is printed as the command's JSON output.
pub const REJECTED_EXIT_CODE: i32 = 40;

pub fn emit_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| CliError::Command(format!("serialize output failed: {e}")))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

/// `REJECTED_EXIT_CODE` when a serialized report carries `"status": "rejected"`.
pub fn exit_code_for_status(report: &Value) -> i32 {
    match report.get("status").and_then(Value::as_str) {
        Some("rejected") => REJECTED_EXIT_CODE,
        _ => 0,
    }
}
