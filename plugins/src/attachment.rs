use async_trait::async_trait;

use querysmith_core::api::AttachmentFetcher;

use crate::http::{build_client, preview_body, HttpError};

/// Downloads URL-referenced CSV attachments with a hard size cap.
pub struct HttpAttachmentFetcher {
    http: reqwest::Client,
}

impl HttpAttachmentFetcher {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout_ms)?,
        })
    }
}

#[async_trait]
impl AttachmentFetcher for HttpAttachmentFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> anyhow::Result<Vec<u8>> {
        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| HttpError::transport(url.to_string(), err))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: preview_body(&body),
            }
            .into());
        }
        let too_large = || HttpError::TooLarge {
            url: url.to_string(),
            max: max_bytes,
        };
        if resp.content_length().is_some_and(|len| len > max_bytes as u64) {
            return Err(too_large().into());
        }

        let mut out = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|err| HttpError::transport(url.to_string(), err))?
        {
            if out.len() + chunk.len() > max_bytes {
                return Err(too_large().into());
            }
            out.extend_from_slice(&chunk);
        }
        tracing::debug!(target: "querysmith.ingest", url = %url, bytes = out.len(), "attachment fetched");
        Ok(out)
    }
}
