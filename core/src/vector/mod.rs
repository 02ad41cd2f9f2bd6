pub mod embedding;
pub mod index;
pub mod store;

pub use embedding::EmbeddingService;
pub use index::{cosine_similarity, DocumentInput, Metadata, SearchHit, VectorIndex, VectorRecord};
pub use store::{field_documents, FieldDocument, FieldStore};
