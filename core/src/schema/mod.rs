pub mod describe;
pub mod discovery;
pub mod graph;
pub mod r#trait;
pub mod types;

pub use describe::{ChildRelationship, FieldDescription, TableDescription};
pub use discovery::{snapshot_key, DiscoveredSchema, SchemaDiscovery};
pub use graph::SchemaGraph;
pub use r#trait::{SchemaSource, SnapshotStore};
pub use types::{
    ColumnInfo, EdgeKind, ForeignKey, GraphEdge, GraphNode, JoinPath, JoinStep, NodeKind,
    NodeType, RelationDirection, StepDirection, TableInfo, TableRelationship, UNKNOWN_TYPE,
};
