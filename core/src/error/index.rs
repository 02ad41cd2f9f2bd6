use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorIndexError {
    #[error("no vectors supplied")]
    EmptyInput,
    #[error("vector at position {position} has zero length")]
    ZeroLength { position: usize },
    #[error("dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("{what} length {actual} does not match {expected} vectors")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid serialized index: {0}")]
    InvalidSnapshot(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
}
