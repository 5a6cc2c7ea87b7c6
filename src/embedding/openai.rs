//! OpenAI-compatible embedding provider.
//!
//! Works with any endpoint that accepts `POST {base_url}/embeddings` with a
//! `model` and an `input` array. Returned vectors are normalised.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{
    provider::{BatchEmbedding, EmbedError, EmbeddingProvider},
    vector::Embedding,
};
use crate::infra::config::EmbedConfig;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        model: &str,
        dimensions: usize,
        base_url: Option<&str>,
    ) -> Result<Self, EmbedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbedError::Request(e.to_string()))?;
        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    /// Build from the `[embed]` config section, reading the key from the
    /// configured environment variable.
    pub fn from_config(cfg: &EmbedConfig) -> Result<Self, EmbedError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EmbedError::MissingApiKey(cfg.api_key_env.clone()))?;
        Self::new(&api_key, &cfg.model, cfg.dimensions, Some(&cfg.base_url))
    }

    fn request(&self, input: &[&str]) -> Result<EmbeddingResponse, EmbedError> {
        let url = format!("{}/embeddings", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "input": input,
        });
        // text-embedding-3-* accepts a custom size
        if self.model.starts_with("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dimensions);
        }

        debug!(items = input.len(), model = %self.model, "embedding request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<EmbeddingResponse>()
            .map_err(|e| EmbedError::Response(e.to_string()))
    }

    fn checked(&self, data: Vec<f32>) -> Result<Embedding, EmbedError> {
        if data.len() != self.dimensions {
            return Err(EmbedError::Dimensions {
                expected: self.dimensions,
                got: data.len(),
            });
        }
        Ok(Embedding::new(data).normalized())
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let response = self.request(&[text])?;
        let item = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Response("missing embedding data".into()))?;
        self.checked(item.embedding)
    }

    fn embed_batch(&self, items: &[(&str, &str)]) -> Result<BatchEmbedding, EmbedError> {
        if items.is_empty() {
            return Ok(BatchEmbedding::default());
        }
        let input: Vec<&str> = items.iter().map(|(_, text)| *text).collect();
        let response = self.request(&input)?;
        if response.data.len() != items.len() {
            return Err(EmbedError::Response(format!(
                "expected {} embeddings, got {}",
                items.len(),
                response.data.len()
            )));
        }

        let mut slots: Vec<Option<Embedding>> = vec![None; items.len()];
        for item in response.data {
            let slot = slots
                .get_mut(item.index)
                .ok_or_else(|| EmbedError::Response(format!("index {} out of range", item.index)))?;
            *slot = Some(self.checked(item.embedding)?);
        }

        let vectors = items
            .iter()
            .zip(slots)
            .map(|((id, _), slot)| {
                slot.map(|e| ((*id).to_string(), e))
                    .ok_or_else(|| EmbedError::Response(format!("no embedding for {id}")))
            })
            .collect::<Result<Vec<_>, EmbedError>>()?;

        Ok(BatchEmbedding {
            vectors,
            tokens: response.usage.map_or(0, |u| u.total_tokens),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DIMENSIONS;

    #[test]
    fn provider_defaults() {
        let cfg = EmbedConfig::default();
        let provider = OpenAiProvider::new("test-key", &cfg.model, cfg.dimensions, Some(&cfg.base_url))
            .unwrap();
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.dimensions, DIMENSIONS);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn custom_base_url_loses_trailing_slash() {
        let provider =
            OpenAiProvider::new("k", "custom", 8, Some("http://localhost:8080/v1/")).unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
        assert_eq!(provider.dimensions(), 8);
    }

    #[test]
    fn vectors_are_checked_and_normalised() {
        let provider = OpenAiProvider::new("k", "m", 2, None).unwrap();
        let e = provider.checked(vec![0.0, 2.0]).unwrap();
        assert_eq!(e.as_slice(), &[0.0, 1.0]);
        assert!(matches!(
            provider.checked(vec![1.0]),
            Err(EmbedError::Dimensions { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn missing_key_is_reported() {
        let cfg = EmbedConfig {
            api_key_env: "SCOPEGRAPH_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..EmbedConfig::default()
        };
        assert!(matches!(
            OpenAiProvider::from_config(&cfg),
            Err(EmbedError::MissingApiKey(_))
        ));
    }

    #[test]
    fn response_shape_parses() {
        let json = r#"{"data":[{"index":0,"embedding":[0.1,0.2]}],"usage":{"prompt_tokens":3,"total_tokens":3}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 2);
        assert_eq!(parsed.usage.map(|u| u.total_tokens), Some(3));
    }
}
