use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::remote::Embedder;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const SERVICE: &str = "openai embeddings";

/// Embeddings connector for the OpenAI API (or any compatible endpoint via
/// `base_url`).
pub struct OpenAiEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "input": inputs,
            "model": self.model,
        });

        debug!("Embedding {} texts with {}", inputs.len(), self.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .map_err(|e| Error::unavailable(SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingsResponse = resp.json().map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        // The API may return items out of order; restore input order by index.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let mut vectors = self.request(std::slice::from_ref(&text.to_string()))?;
        vectors.pop().ok_or_else(|| Error::Decode {
            service: SERVICE,
            reason: "empty embeddings response".to_string(),
        })
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::Decode {
                service: SERVICE,
                reason: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }
        Ok(vectors)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}
