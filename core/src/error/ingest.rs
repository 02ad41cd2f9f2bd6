use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("payload is empty")]
    Empty,
    #[error("invalid attachment: {0}")]
    Attachment(String),
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),
}

impl IngestError {
    /// True for failures caused by the caller's payload rather than a collaborator.
    pub fn is_input(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}
