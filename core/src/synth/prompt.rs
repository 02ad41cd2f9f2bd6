use chrono::{DateTime, Utc};

use crate::ingest::ParsedTable;
use crate::schema::TableInfo;
use crate::schema_context::SchemaContext;

const SAMPLE_VALUES: usize = 3;

/// Prompt for query generation.
pub fn query_prompt(
    description: &str,
    context: &SchemaContext,
    keyword: &str,
    now: DateTime<Utc>,
    tools_enabled: bool,
) -> String {
    let schema = serde_json::to_string_pretty(&context.to_prompt_value()).unwrap_or_default();
    let mut out = String::new();
    out.push_str("You translate data requests into a single read-only query.\n\n");
    out.push_str(&format!("Current timestamp (UTC): {}\n", now.to_rfc3339()));
    out.push_str("Resolve relative dates such as \"last month\" or \"this year\" against it.\n\n");

    out.push_str("Rules:\n");
    out.push_str(&format!(
        "- Produce exactly one statement and it must start with {keyword}. Never modify data.\n"
    ));
    out.push_str("- Always select the primary key field of the main table.\n");
    out.push_str("- Use only tables and fields present in the schema below.\n");
    out.push_str("- Do not combine aggregate functions with LIMIT.\n");
    out.push_str("- Traverse child-to-parent relationships with dot notation on the relationship name (Contact.Account.Name).\n");
    out.push_str("- Traverse parent-to-child relationships with a nested subquery on the child relationship name (SELECT Id, (SELECT Id FROM Contacts) FROM Account).\n");
    out.push_str("- Quote string literals with single quotes; picklist filters must use the listed values.\n");
    out.push_str("- List every table the query reads in tablesUsed and give a confidence between 0 and 1.\n");
    if tools_enabled {
        out.push_str("- Call the schema tools when a table or join you need is not in the schema below.\n");
    }

    out.push_str("\nSchema:\n");
    out.push_str(&schema);
    out.push('\n');

    if !context.join_hints.is_empty() {
        out.push_str("\nKnown join paths:\n");
        for hint in &context.join_hints {
            let clauses: Vec<String> = hint.steps.iter().map(|s| s.on_clause()).collect();
            out.push_str(&format!("- {} -> {}: {}\n", hint.from, hint.to, clauses.join(", ")));
        }
    }
    if !context.missing_tables.is_empty() {
        out.push_str(&format!(
            "\nTables requested but not found: {}\n",
            context.missing_tables.join(", ")
        ));
    }

    out.push_str("\nRequest:\n");
    out.push_str(description.trim());
    out.push('\n');
    out
}

/// Prompt for CSV column to schema field mapping.
pub fn mapping_prompt(table: &ParsedTable, target: &TableInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Map the columns of an uploaded CSV file to fields of the {} table.\n\n",
        target.name
    ));
    out.push_str("Rules:\n");
    out.push_str("- Only map a CSV column when a target field clearly holds the same data.\n");
    out.push_str("- Leave columns with no reasonable match out of the result. Do not guess.\n");
    out.push_str("- Each CSV column maps to at most one field and each field receives at most one column.\n");
    out.push_str("- sourceField and targetField must be copied exactly from the lists below.\n\n");

    out.push_str("CSV columns (name: inferred type, sample values):\n");
    for column in &table.columns {
        let samples = table.samples(column, SAMPLE_VALUES);
        out.push_str(&format!(
            "- {}: {} [{}]\n",
            column,
            table.column_type(column).as_str(),
            samples.join(", ")
        ));
    }

    out.push_str(&format!("\n{} fields (name: type):\n", target.name));
    for column in &target.columns {
        match &column.label {
            Some(label) if label != &column.name => {
                out.push_str(&format!("- {}: {} ({})\n", column.name, column.data_type, label))
            }
            _ => out.push_str(&format!("- {}: {}\n", column.name, column.data_type)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_context::{ContextOrigin, FieldContext, TableContext};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    #[test]
    fn test_query_prompt_carries_rules_and_timestamp() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "Account".to_string(),
            TableContext {
                fields: vec![FieldContext {
                    name: "Industry".into(),
                    field_type: "picklist".into(),
                    label: None,
                    primary_key: false,
                    picklist_values: vec!["Technology".into()],
                    relationship_name: None,
                    reference_to: Vec::new(),
                }],
                child_relationships: Vec::new(),
            },
        );
        let context = SchemaContext {
            tables,
            origin: ContextOrigin::Graph,
            missing_tables: vec!["Lead".into()],
            join_hints: Vec::new(),
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let prompt = query_prompt("accounts in tech", &context, "SELECT", now, false);
        assert!(prompt.contains("2024-03-01T12:00:00+00:00"));
        assert!(prompt.contains("must start with SELECT"));
        assert!(prompt.contains("primary key"));
        assert!(prompt.contains("LIMIT"));
        assert!(prompt.contains("\"Technology\""));
        assert!(prompt.contains("not found: Lead"));
        assert!(prompt.trim_end().ends_with("accounts in tech"));
        assert!(!prompt.contains("schema tools"));
    }
}
