//! Natural-language to read-only query synthesis over a discoverable schema.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod generation;
pub mod ingest;
pub mod pipeline;
pub mod schema;
pub mod schema_context;
pub mod synth;
pub mod vector;
