//! CSV column to schema field mapping.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;

use super::prompt::mapping_prompt;
use super::synthesizer::QuerySynthesizer;
use super::transitions::{PhaseTracker, SynthesisPhase};
use super::types::{FieldMapping, MappingOutcome};
use crate::error::{SchemaError, SynthesisError};
use crate::generation::{GenerationRequest, GenerationResponse, OutputSchema};
use crate::ingest::ParsedTable;
use crate::schema::{SchemaGraph, TableInfo};

#[derive(Deserialize)]
struct GeneratedMappings {
    #[serde(default)]
    mappings: Vec<FieldMapping>,
}

fn mapping_schema() -> OutputSchema {
    OutputSchema {
        name: "FieldMappings".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "mappings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "sourceField": {"type": "string"},
                            "targetField": {"type": "string"},
                            "targetType": {"type": "string"},
                            "confidence": {"type": "number", "minimum": 0, "maximum": 1}
                        },
                        "required": ["sourceField", "targetField", "targetType", "confidence"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["mappings"],
            "additionalProperties": false
        }),
    }
}

impl QuerySynthesizer {
    /// Pair CSV columns with fields of `target_table`. Columns without a
    /// confident match are reported in `unmapped_headers`, never guessed.
    #[tracing::instrument(name = "synth.map_fields", skip_all, fields(table = %target_table))]
    pub async fn map_fields(
        &self,
        parsed: &ParsedTable,
        target_table: &str,
        graph: &SchemaGraph,
    ) -> Result<MappingOutcome, SynthesisError> {
        let mut tracker = PhaseTracker::new();
        if parsed.columns.is_empty() {
            return Err(SynthesisError::Input("CSV payload has no columns".to_string()));
        }
        if target_table.trim().is_empty() {
            return Err(SynthesisError::Input("target table is required".to_string()));
        }
        let info = graph
            .table_info(target_table.trim(), None)
            .ok_or_else(|| SchemaError::TableNotFound(target_table.trim().to_string()))?;
        if info.columns.is_empty() {
            return Err(SchemaError::NoColumns(info.name).into());
        }
        tracker.advance(SynthesisPhase::ContextBuilt)?;

        let request = GenerationRequest::new(mapping_prompt(parsed, &info), mapping_schema());
        tracker.advance(SynthesisPhase::GenerationRequested)?;
        let response = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| SynthesisError::generation_with("generation capability failed", e))?;
        let GenerationResponse::Final(value) = response else {
            return Err(SynthesisError::generation(
                "model requested tool calls when none were offered",
            ));
        };
        let generated: GeneratedMappings = serde_json::from_value(value).map_err(|e| {
            SynthesisError::generation_with("generated mappings have the wrong shape", e.into())
        })?;

        let outcome = reconcile(
            parsed,
            &info,
            generated.mappings,
            self.config.min_mapping_confidence,
        );
        tracker.advance(SynthesisPhase::Validated)?;
        tracing::info!(
            target: "querysmith.synth",
            mapped = outcome.mappings.len(),
            unmapped = outcome.unmapped_headers.len(),
            "field mapping finished"
        );
        Ok(outcome)
    }
}

/// Drop mappings that name unknown columns or fields, keep the most
/// confident mapping per source column and per target field, and take
/// target types from the schema.
fn reconcile(
    parsed: &ParsedTable,
    info: &TableInfo,
    generated: Vec<FieldMapping>,
    min_confidence: f64,
) -> MappingOutcome {
    let mut warnings = Vec::new();
    let mut best_by_source: HashMap<String, FieldMapping> = HashMap::new();

    for mut mapping in generated {
        let Some(source) = parsed
            .columns
            .iter()
            .find(|c| c.as_str() == mapping.source_field.trim())
        else {
            warnings.push(format!("dropped mapping for unknown CSV column {:?}", mapping.source_field));
            continue;
        };
        let target_name = mapping.target_field.trim();
        let Some(target) = info
            .column(target_name)
            .or_else(|| info.columns.iter().find(|c| c.name.eq_ignore_ascii_case(target_name)))
        else {
            warnings.push(format!(
                "dropped mapping {} -> {}: no such field on {}",
                source, mapping.target_field, info.name
            ));
            continue;
        };
        if !mapping.confidence.is_finite() || mapping.confidence < min_confidence {
            continue;
        }
        mapping.source_field = source.clone();
        mapping.target_field = target.name.clone();
        mapping.target_type = target.data_type.clone();
        mapping.confidence = mapping.confidence.clamp(0.0, 1.0);

        match best_by_source.get(&mapping.source_field) {
            Some(existing) if existing.confidence >= mapping.confidence => {}
            _ => {
                best_by_source.insert(mapping.source_field.clone(), mapping);
            }
        }
    }

    // One column per target field as well.
    let mut best_by_target: HashMap<String, FieldMapping> = HashMap::new();
    for mapping in best_by_source.into_values() {
        match best_by_target.get(&mapping.target_field) {
            Some(existing)
                if existing.confidence > mapping.confidence
                    || (existing.confidence == mapping.confidence
                        && column_position(parsed, &existing.source_field)
                            < column_position(parsed, &mapping.source_field)) => {}
            _ => {
                best_by_target.insert(mapping.target_field.clone(), mapping);
            }
        }
    }

    let mut mappings: Vec<FieldMapping> = best_by_target.into_values().collect();
    mappings.sort_by_key(|m| column_position(parsed, &m.source_field));

    let mut unmapped_headers: Vec<String> = Vec::new();
    for column in &parsed.columns {
        if !mappings.iter().any(|m| &m.source_field == column) && !unmapped_headers.contains(column) {
            unmapped_headers.push(column.clone());
        }
    }
    for warning in &warnings {
        tracing::warn!(target: "querysmith.synth", "{warning}");
    }

    MappingOutcome {
        table: info.name.clone(),
        mappings,
        unmapped_headers,
        warnings,
    }
}

fn column_position(parsed: &ParsedTable, column: &str) -> usize {
    parsed
        .columns
        .iter()
        .position(|c| c == column)
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TabularIngestor;
    use crate::schema::ColumnInfo;

    fn column(name: &str, data_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            label: None,
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
            max_length: None,
            precision: None,
            picklist_values: Vec::new(),
            relationship_name: None,
            reference_to: Vec::new(),
        }
    }

    fn contact() -> TableInfo {
        TableInfo {
            name: "Contact".into(),
            namespace: None,
            label: None,
            columns: vec![column("FirstName", "string"), column("Email", "email")],
            foreign_keys: Vec::new(),
        }
    }

    fn mapping(source: &str, target: &str, confidence: f64) -> FieldMapping {
        FieldMapping {
            source_field: source.into(),
            target_field: target.into(),
            target_type: "whatever".into(),
            confidence,
        }
    }

    fn parsed() -> ParsedTable {
        TabularIngestor::default()
            .parse(b"First Name,Email Address,Unrelated Junk\nAda,ada@example.com,x\n", true)
            .unwrap()
    }

    #[test]
    fn test_hallucinated_fields_dropped() {
        let outcome = reconcile(
            &parsed(),
            &contact(),
            vec![
                mapping("First Name", "FirstName", 0.95),
                mapping("Phone", "Phone", 0.9),
                mapping("Unrelated Junk", "Junk__c", 0.4),
            ],
            0.0,
        );
        assert_eq!(outcome.mappings.len(), 1);
        assert_eq!(outcome.mappings[0].target_type, "string");
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.unmapped_headers, vec!["Email Address", "Unrelated Junk"]);
    }

    #[test]
    fn test_duplicates_keep_highest_confidence() {
        let outcome = reconcile(
            &parsed(),
            &contact(),
            vec![
                mapping("Email Address", "FirstName", 0.2),
                mapping("Email Address", "email", 0.9),
                mapping("First Name", "Email", 0.5),
            ],
            0.0,
        );
        assert_eq!(outcome.mappings.len(), 1);
        assert_eq!(outcome.mappings[0].source_field, "Email Address");
        assert_eq!(outcome.mappings[0].target_field, "Email");
        assert_eq!(outcome.unmapped_headers, vec!["First Name", "Unrelated Junk"]);
    }

    #[test]
    fn test_low_confidence_left_unmapped() {
        let outcome = reconcile(
            &parsed(),
            &contact(),
            vec![mapping("First Name", "FirstName", 0.3)],
            0.5,
        );
        assert!(outcome.mappings.is_empty());
        assert_eq!(outcome.unmapped_headers.len(), 3);
    }
}
