pub mod cli;
pub mod discover;
pub mod map;
pub mod query;
