use thiserror::Error;

use super::{ExecutionError, IngestError, SchemaError, VectorIndexError};

/// Coarse failure classes, used for exit codes and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Schema,
    Generation,
    Execution,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Schema => "schema",
            Self::Generation => "generation",
            Self::Execution => "execution",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

/// Top-level failure of a command-line invocation.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Synthesis(e) => e.kind(),
            Self::Command(_) => ErrorKind::Input,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("vector index error: {0}")]
    Index(#[from] VectorIndexError),
    #[error("config error: {0}")]
    Config(String),
    #[error("pipeline phase error: {0}")]
    Phase(#[from] crate::synth::TransitionError),
}

impl SynthesisError {
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    pub fn generation_with(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Generation {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Ingest(e) => {
                if e.is_input() {
                    ErrorKind::Input
                } else {
                    ErrorKind::Schema
                }
            }
            Self::Schema(_) | Self::Index(_) => ErrorKind::Schema,
            Self::Generation { .. } => ErrorKind::Generation,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Config(_) => ErrorKind::Config,
            Self::Phase(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SynthesisError::Input("empty".into()).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            SynthesisError::from(SchemaError::TableNotFound("Foo".into())).kind(),
            ErrorKind::Schema
        );
        assert_eq!(
            SynthesisError::from(IngestError::PayloadTooLarge { size: 10, max: 5 }).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            SynthesisError::generation("model offline").kind(),
            ErrorKind::Generation
        );
    }

    #[test]
    fn test_generation_error_keeps_cause() {
        let err = SynthesisError::generation_with("bad output", anyhow::anyhow!("eof"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("eof"));
    }
}
