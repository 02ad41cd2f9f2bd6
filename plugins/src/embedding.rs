//! Embedding services for field-document vectorization.
//!
//! Supports both local (Ollama) and remote (OpenAI) embedding providers.

use anyhow::Result;
use async_trait::async_trait;

use querysmith_core::api::{EmbeddingConfig, EmbeddingService};

use crate::http::{auth, build_client, join_url, parse_json_response, HttpError};

/// Max in-flight single-text requests during a batch.
const OLLAMA_BATCH_CONCURRENCY: usize = 8;

/// Ollama local embedding service.
pub struct OllamaEmbeddingService {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingService {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            url: join_url(&cfg.base_url, "api/embeddings"),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbedRequest {
            model: &self.model,
            prompt: text,
        };
        tracing::debug!(
            target: "querysmith.embedding",
            stage = "embedding.ollama.in",
            url = %self.url,
            model = %self.model,
            text_len = text.len()
        );
        let resp = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| HttpError::transport(self.url.clone(), err))?;
        let value = parse_json_response(resp).await?;
        let result: OllamaEmbedResponse = serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("unexpected Ollama embedding response: {e}"))?;
        tracing::debug!(
            target: "querysmith.embedding",
            stage = "embedding.ollama.out",
            dimension = result.embedding.len()
        );
        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use futures::future::try_join_all;

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(OLLAMA_BATCH_CONCURRENCY) {
            let futures = chunk.iter().map(|text| self.embed(text));
            all_results.extend(try_join_all(futures).await?);
        }
        Ok(all_results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(serde::Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(serde::Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

/// OpenAI remote embedding service.
pub struct OpenAIEmbeddingService {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAIEmbeddingService {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            url: join_url(&cfg.base_url, "embeddings"),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
        })
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
            "dimensions": self.dimension,
            "encoding_format": "float",
        });
        let req = self.client.post(&self.url).json(&body);
        let resp = auth(req, &self.api_key)
            .send()
            .await
            .map_err(|err| HttpError::transport(self.url.clone(), err))?;
        let value = parse_json_response(resp).await?;
        let mut result: OpenAIEmbedResponse = serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("unexpected OpenAI embedding response: {e}"))?;
        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tracing::debug!(
            target: "querysmith.embedding",
            stage = "embedding.openai.in",
            url = %self.url,
            model = %self.model,
            text_len = text.len()
        );
        self.request(serde_json::json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(serde_json::json!(texts)).await?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "OpenAI returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(serde::Deserialize)]
struct OpenAIEmbedResponse {
    data: Vec<OpenAIEmbedData>,
}

#[derive(serde::Deserialize)]
struct OpenAIEmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use querysmith_core::api::EmbeddingProvider;

    fn config(base_url: String, provider: EmbeddingProvider) -> EmbeddingConfig {
        EmbeddingConfig {
            enabled: true,
            provider,
            base_url,
            dimension: 3,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_ollama_embed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "nomic-embed-text",
                "prompt": "Account.Industry"
            })))
            .with_status(200)
            .with_body(r#"{"embedding":[0.1,0.2,0.3]}"#)
            .create_async()
            .await;

        let service = OllamaEmbeddingService::new(&config(server.url(), EmbeddingProvider::Ollama))
            .unwrap();
        assert_eq!(service.embed("Account.Industry").await.unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(service.dimension(), 3);
    }

    #[tokio::test]
    async fn test_openai_batch_restores_input_order() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0,0.0]},{"index":0,"embedding":[1.0,0.0,0.0]}]}"#,
            )
            .create_async()
            .await;

        let service = OpenAIEmbeddingService::new(&config(server.url(), EmbeddingProvider::OpenAI))
            .unwrap();
        let vectors = service
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_openai_count_mismatch_is_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"index":0,"embedding":[1.0,0.0,0.0]}]}"#)
            .create_async()
            .await;

        let service = OpenAIEmbeddingService::new(&config(server.url(), EmbeddingProvider::OpenAI))
            .unwrap();
        assert!(service
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .is_err());
    }
}
