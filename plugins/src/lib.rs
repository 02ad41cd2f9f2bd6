pub mod attachment;
pub mod embedding;
pub mod execution;
pub mod factory;
pub mod generation;
pub mod http;
pub mod services;
pub mod snapshot;
pub mod source;
