//! querysmith command line, exposed as a library for unit tests.

pub mod commands;
pub mod output;
