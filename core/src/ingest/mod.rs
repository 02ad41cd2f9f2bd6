pub mod attachment;
pub mod infer;
pub mod parser;

pub use attachment::{AttachmentFetcher, CsvAttachment};
pub use infer::{infer_column_type, InferredColumnType};
pub use parser::{ensure_within_limit, ParsedTable, Row, TabularIngestor, DEFAULT_MAX_BYTES, DEFAULT_SAMPLE_SIZE};
