use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("no columns discovered for table {0}")]
    NoColumns(String),
    #[error("no tables could be described: {}", .0.join(", "))]
    NoTablesDiscovered(Vec<String>),
    #[error("no schema fields matched the request")]
    NoMatchingFields,
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("edge references unknown node: {0}")]
    DanglingEdge(String),
    #[error("invalid schema snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("snapshot store error: {0}")]
    Snapshot(#[source] anyhow::Error),
}
