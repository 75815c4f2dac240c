use std::env;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

const GEMINI_DIMENSION: usize = 768;
// batchEmbedContents accepts at most 100 requests per call
const MAX_BATCH_SIZE: usize = 100;

/// Gemini embedder using the Generative Language REST API.
///
/// The API key is read once at construction but only checked when a request
/// is made, so a missing key surfaces as `EmbeddingUnavailable` from the
/// first build rather than preventing the server from starting.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };

        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Create an embedder with the key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Self {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        Self::new(api_key, model)
    }

    /// Point the embedder at a different API root (proxies, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::EmbeddingUnavailable(format!(
                "{} or {} not found in environment variables",
                API_KEY_VARS[0], API_KEY_VARS[1]
            ))
        })
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type,
        }
    }

    async fn call<B: Serialize, R: DeserializeOwned>(&self, method: &str, body: &B) -> Result<R> {
        let key = self.api_key()?;
        let url = format!("{}/{}:{}", self.base_url, self.model, method);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "{} returned {}: {}",
                method,
                status,
                detail.trim()
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("malformed {method} response: {e}")))
    }
}

impl Embedder for GeminiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let body = BatchRequest {
                requests: batch
                    .iter()
                    .map(|text| self.request(text, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };
            let response: BatchResponse = self.call("batchEmbedContents", &body).await?;
            if response.embeddings.len() != batch.len() {
                return Err(Error::EmbeddingUnavailable(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            debug!(count = batch.len(), "embedded document batch");
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        let response: EmbedResponse = self
            .call("embedContent", &self.request(text, "RETRIEVAL_QUERY"))
            .await?;
        Ok(response.embedding.values)
    }

    fn dimension(&self) -> usize {
        GEMINI_DIMENSION
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct Values {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Values,
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}
