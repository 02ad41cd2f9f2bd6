mod builder;
mod types;

pub use builder::{ContextLimits, SchemaContextBuilder};
pub use types::{ChildRelationshipContext, ContextOrigin, FieldContext, JoinHint, SchemaContext, TableContext};
