//! Pluggable embedding backends.

use thiserror::Error;

use super::vector::Embedding;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    Response(String),

    #[error("expected {expected} dimensions, got {got}")]
    Dimensions { expected: usize, got: usize },

    #[error("no API key: environment variable {0} is not set")]
    MissingApiKey(String),
}

impl EmbedError {
    /// Transport failures, throttling and server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedError::Request(_) => true,
            EmbedError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Vectors for one batch, in request order, plus the tokens billed for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEmbedding {
    pub vectors: Vec<(String, Embedding)>,
    pub tokens: u64,
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding vector dimensions.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;

    /// Embed `(id, text)` pairs (default: one request per item).
    fn embed_batch(&self, items: &[(&str, &str)]) -> Result<BatchEmbedding, EmbedError> {
        let vectors = items
            .iter()
            .map(|(id, text)| Ok(((*id).to_string(), self.embed(text)?)))
            .collect::<Result<Vec<_>, EmbedError>>()?;
        Ok(BatchEmbedding { vectors, tokens: 0 })
    }

    /// Provider name for display.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lengths;

    impl EmbeddingProvider for Lengths {
        fn dimensions(&self) -> usize {
            1
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
            if text.is_empty() {
                return Err(EmbedError::Response("empty input".into()));
            }
            Ok(Embedding::new(vec![text.len() as f32]))
        }

        fn name(&self) -> &str {
            "lengths"
        }
    }

    #[test]
    fn default_batch_keeps_order_and_ids() {
        let out = Lengths.embed_batch(&[("a", "xx"), ("b", "xyz")]).unwrap();
        assert_eq!(out.vectors[0], ("a".to_string(), Embedding::new(vec![2.0])));
        assert_eq!(out.vectors[1].0, "b");
        assert_eq!(out.tokens, 0);
    }

    #[test]
    fn default_batch_fails_as_a_whole() {
        assert!(Lengths.embed_batch(&[("a", "x"), ("b", "")]).is_err());
    }

    #[test]
    fn retryable_errors() {
        assert!(EmbedError::Request("timeout".into()).is_retryable());
        assert!(EmbedError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(EmbedError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!EmbedError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!EmbedError::Dimensions { expected: 2, got: 1 }.is_retryable());
    }
}
