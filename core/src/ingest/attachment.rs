//! CSV payload sources. The parser only ever sees bytes.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::parser::ensure_within_limit;
use crate::error::IngestError;

/// Transport for URL-addressed attachments.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Fetch at most `max_bytes`; larger bodies must fail rather than be
    /// truncated.
    async fn fetch(&self, url: &str, max_bytes: usize) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CsvAttachment {
    Bytes(Vec<u8>),
    /// Plain base64 or a `data:...;base64,` URL.
    Base64(String),
    Url(String),
}

impl CsvAttachment {
    /// Classify a command-line style reference: `data:` URLs, http(s) URLs,
    /// anything else is treated as inline base64.
    pub fn from_reference(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Base64(trimmed.to_string())
        }
    }

    pub async fn resolve(
        self,
        fetcher: Option<&dyn AttachmentFetcher>,
        max_bytes: usize,
    ) -> Result<Vec<u8>, IngestError> {
        let bytes = match self {
            Self::Bytes(bytes) => bytes,
            Self::Base64(encoded) => {
                let payload = strip_data_url(&encoded)?;
                // Decoded size is at most 3/4 of the encoded length.
                ensure_within_limit(payload.len() / 4 * 3, max_bytes)?;
                base64::engine::general_purpose::STANDARD
                    .decode(payload.trim())
                    .map_err(|e| IngestError::Attachment(format!("invalid base64: {e}")))?
            }
            Self::Url(url) => {
                let fetcher = fetcher.ok_or_else(|| {
                    IngestError::Attachment(format!("no fetcher configured for {url}"))
                })?;
                tracing::debug!(target: "querysmith.ingest", url = %url, "fetching attachment");
                fetcher
                    .fetch(&url, max_bytes)
                    .await
                    .map_err(IngestError::Fetch)?
            }
        };
        ensure_within_limit(bytes.len(), max_bytes)?;
        if bytes.is_empty() {
            return Err(IngestError::Empty);
        }
        Ok(bytes)
    }
}

fn strip_data_url(encoded: &str) -> Result<&str, IngestError> {
    let Some(rest) = encoded.strip_prefix("data:") else {
        return Ok(encoded);
    };
    match rest.split_once(',') {
        Some((meta, payload)) if meta.ends_with(";base64") => Ok(payload),
        Some(_) => Err(IngestError::Attachment(
            "only base64 data URLs are supported".to_string(),
        )),
        None => Err(IngestError::Attachment("malformed data URL".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(&'static [u8]);

    #[async_trait]
    impl AttachmentFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str, _max_bytes: usize) -> anyhow::Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    #[tokio::test]
    async fn test_base64_and_data_url() {
        let plain = CsvAttachment::Base64("YSxiCjEsMgo=".into())
            .resolve(None, 1024)
            .await
            .unwrap();
        assert_eq!(plain, b"a,b\n1,2\n");

        let data_url = CsvAttachment::from_reference("data:text/csv;base64,YSxiCjEsMgo=")
            .resolve(None, 1024)
            .await
            .unwrap();
        assert_eq!(data_url, plain);
    }

    #[tokio::test]
    async fn test_url_requires_fetcher() {
        let attachment = CsvAttachment::from_reference("https://files.example.com/leads.csv");
        assert!(matches!(attachment, CsvAttachment::Url(_)));
        let err = attachment.clone().resolve(None, 1024).await.unwrap_err();
        assert!(matches!(err, IngestError::Attachment(_)));

        let fetcher = StaticFetcher(b"x\n1\n");
        let bytes = attachment.resolve(Some(&fetcher), 1024).await.unwrap();
        assert_eq!(bytes, b"x\n1\n");
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected() {
        let err = CsvAttachment::Bytes(vec![b'a'; 16])
            .resolve(None, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PayloadTooLarge { size: 16, max: 8 }));
    }

    #[tokio::test]
    async fn test_plain_data_url_rejected() {
        let err = CsvAttachment::Base64("data:text/csv,a,b".into())
            .resolve(None, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Attachment(_)));
    }
}
