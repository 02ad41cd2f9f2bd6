//! Delimited text to row maps.

use std::collections::BTreeMap;

use serde::Serialize;

use super::infer::{infer_column_type, InferredColumnType};
use crate::error::IngestError;

pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024 * 1024;

pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTable {
    /// Column names in file order. Duplicate header names are kept.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub types: BTreeMap<String, InferredColumnType>,
}

impl ParsedTable {
    pub fn column_type(&self, column: &str) -> InferredColumnType {
        self.types
            .get(column)
            .copied()
            .unwrap_or(InferredColumnType::Null)
    }

    /// Up to `limit` distinct non-empty values of a column, in row order.
    pub fn samples(&self, column: &str, limit: usize) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if out.len() >= limit {
                break;
            }
            if let Some(v) = row.get(column).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        out
    }
}

/// Reject payloads over `max_bytes`. Callers run this before parsing.
pub fn ensure_within_limit(size: usize, max_bytes: usize) -> Result<(), IngestError> {
    if size > max_bytes {
        return Err(IngestError::PayloadTooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TabularIngestor {
    delimiter: u8,
    sample_size: usize,
}

impl Default for TabularIngestor {
    fn default() -> Self {
        Self {
            delimiter: b',',
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl TabularIngestor {
    pub fn new(delimiter: u8, sample_size: usize) -> Self {
        Self {
            delimiter,
            sample_size: sample_size.max(1),
        }
    }

    /// Parse raw bytes. A leading UTF-8 BOM is stripped; invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn parse(&self, bytes: &[u8], has_header: bool) -> Result<ParsedTable, IngestError> {
        let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
        if had_errors {
            tracing::warn!(target: "querysmith.ingest", "payload is not valid UTF-8; invalid sequences replaced");
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            records.push(record.iter().map(str::to_string).collect());
        }
        if records.is_empty() {
            return Err(IngestError::Empty);
        }

        let (columns, body) = if has_header {
            let header = records.remove(0);
            let columns = header
                .iter()
                .enumerate()
                .map(|(i, name)| match name.trim() {
                    "" => format!("col_{}", i + 1),
                    trimmed => trimmed.to_string(),
                })
                .collect::<Vec<_>>();
            (columns, records)
        } else {
            let width = records.iter().map(Vec::len).max().unwrap_or(0);
            ((1..=width).map(|i| format!("col_{i}")).collect(), records)
        };

        let rows: Vec<Row> = body
            .into_iter()
            .map(|cells| {
                // Cells past the header width have no name and are dropped.
                columns
                    .iter()
                    .zip(cells)
                    .map(|(name, cell)| (name.clone(), cell))
                    .collect()
            })
            .collect();

        let mut types = BTreeMap::new();
        for column in &columns {
            let samples = rows
                .iter()
                .take(self.sample_size)
                .filter_map(|row| row.get(column).map(String::as_str));
            types.insert(column.clone(), infer_column_type(samples));
        }

        tracing::debug!(
            target: "querysmith.ingest",
            columns = columns.len(),
            rows = rows.len(),
            "parsed tabular payload"
        );
        Ok(ParsedTable {
            columns,
            rows,
            types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest(text: &str, has_header: bool) -> ParsedTable {
        TabularIngestor::default()
            .parse(text.as_bytes(), has_header)
            .unwrap()
    }

    #[test]
    fn test_quoted_delimiter_and_escaped_quote() {
        let table = ingest("name,note\nx,\"a,b\"\"c\"\n", true);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["note"], "a,b\"c");
    }

    #[test]
    fn test_quoted_newline() {
        let table = ingest("id,body\n1,\"line one\nline two\"\n", true);
        assert_eq!(table.rows[0]["body"], "line one\nline two");
    }

    #[test]
    fn test_bom_is_stripped() {
        let plain = "Name,Age\nAda,36\n";
        let mut with_bom = vec![0xEF, 0xBB, 0xBF];
        with_bom.extend_from_slice(plain.as_bytes());
        let ingestor = TabularIngestor::default();
        assert_eq!(
            ingestor.parse(&with_bom, true).unwrap(),
            ingestor.parse(plain.as_bytes(), true).unwrap()
        );
    }

    #[test]
    fn test_blank_rows_dropped() {
        let table = ingest("a,b\n1,2\n , \n\n3,4\n", true);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["a"], "3");
    }

    #[test]
    fn test_headerless_columns_sized_to_widest_row() {
        let table = ingest("1,2\n3,4,5\n", false);
        assert_eq!(table.columns, vec!["col_1", "col_2", "col_3"]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[0].get("col_3").is_none());
        assert_eq!(table.rows[1]["col_3"], "5");
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let table = ingest("x,x\n1,2\n", true);
        assert_eq!(table.columns, vec!["x", "x"]);
        assert_eq!(table.rows[0]["x"], "2");
    }

    #[test]
    fn test_types_inferred_per_column() {
        let table = ingest("id,score,active,joined,name\n1,1.5,true,2024-01-05,Ada\n2,,FALSE,2023-02-01,\n", true);
        assert_eq!(table.column_type("id"), InferredColumnType::Number);
        assert_eq!(table.column_type("score"), InferredColumnType::Number);
        assert_eq!(table.column_type("active"), InferredColumnType::Boolean);
        assert_eq!(table.column_type("joined"), InferredColumnType::Date);
        assert_eq!(table.column_type("name"), InferredColumnType::String);
    }

    #[test]
    fn test_sample_size_bounds_inference() {
        let text = "v\n1\n2\nthree\n";
        let narrow = TabularIngestor::new(b',', 2).parse(text.as_bytes(), true).unwrap();
        assert_eq!(narrow.column_type("v"), InferredColumnType::Number);
        let wide = TabularIngestor::new(b',', 50).parse(text.as_bytes(), true).unwrap();
        assert_eq!(wide.column_type("v"), InferredColumnType::String);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let table = TabularIngestor::new(b';', 50)
            .parse(b"a;b\n1,5;x\n", true)
            .unwrap();
        assert_eq!(table.rows[0]["a"], "1,5");
    }

    #[test]
    fn test_empty_payload() {
        let err = TabularIngestor::default().parse(b"\n \n", true).unwrap_err();
        assert!(matches!(err, IngestError::Empty));
    }

    #[test]
    fn test_size_guard() {
        assert!(ensure_within_limit(10, 10).is_ok());
        assert!(matches!(
            ensure_within_limit(11, 10),
            Err(IngestError::PayloadTooLarge { size: 11, max: 10 })
        ));
    }
}
