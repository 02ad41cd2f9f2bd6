//! Shared plumbing for the JSON-over-HTTP adapters.

use serde_json::Value;
use thiserror::Error;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Failure talking to a remote endpoint. Bodies are previews, never the
/// full payload.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("{url} returned a body that is not JSON: {source} | body={body}")]
    Decode {
        url: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("response from {url} exceeds {max} bytes")]
    TooLarge { url: String, max: usize },
}

impl HttpError {
    pub(crate) fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            Self::Decode { .. } | Self::TooLarge { .. } => None,
        }
    }
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if out.len() < trimmed.len() {
        out.push_str("...");
    }
    out
}

/// Read a response as JSON. Non-2xx statuses become `HttpError::Status`;
/// an empty 2xx body is `Value::Null`.
pub(crate) async fn parse_json_response(resp: reqwest::Response) -> anyhow::Result<Value> {
    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| HttpError::transport(url.clone(), err))?;

    if !(200..300).contains(&status) {
        let body = preview_body(&body);
        return Err(HttpError::Status { url, status, body }.into());
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| {
        HttpError::Decode {
            url,
            body: preview_body(&body),
            source,
        }
        .into()
    })
}

pub(crate) fn build_client(timeout_ms: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .build()?)
}

/// Bearer auth when a key is configured.
pub(crate) fn auth(req: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
    if api_key.trim().is_empty() {
        req
    } else {
        req.bearer_auth(api_key)
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
