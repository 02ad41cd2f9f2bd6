#[allow(clippy::module_inception)]
pub mod error;
pub mod execution;
pub mod index;
pub mod ingest;
pub mod schema;

pub use error::{CliError, ErrorKind, SynthesisError};
pub use execution::ExecutionError;
pub use index::VectorIndexError;
pub use ingest::IngestError;
pub use schema::SchemaError;
