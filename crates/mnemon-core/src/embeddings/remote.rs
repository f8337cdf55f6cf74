//! Remote Embedding Adapter
//!
//! Talks to an Ollama-compatible HTTP endpoint. Availability is probed once
//! per client construction (one command invocation constructs one client);
//! an unavailable or timed-out provider silently narrows retrieval to token
//! overlap.

use serde::Deserialize;

use crate::config::{DEFAULT_EMBED_ENDPOINT, DEFAULT_EMBED_MODEL, EMBED_TIMEOUT};

/// Environment variable overriding the provider endpoint
pub const ENDPOINT_ENV: &str = "MNEMON_EMBED_ENDPOINT";

/// Environment variable overriding the embedding model
pub const MODEL_ENV: &str = "MNEMON_EMBED_MODEL";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding adapter error; never escapes a public store operation
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Provider not reachable (probe failed, connection refused, timeout)
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Provider answered with a non-success status
    #[error("Embedding request failed: {0}")]
    Request(String),
    /// Provider answered with something that is not a vector
    #[error("Malformed embedding response: {0}")]
    Malformed(String),
}

// ============================================================================
// EMBEDDING TYPE
// ============================================================================

/// A semantic embedding vector
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector
    pub vector: Vec<f64>,
}

impl Embedding {
    /// Create a new embedding from a vector
    pub fn new(vector: Vec<f64>) -> Self {
        Self { vector }
    }

    /// Number of dimensions
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Cosine similarity with another embedding
    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        super::cosine_similarity(&self.vector, &other.vector)
    }

    /// Serialize as contiguous little-endian 8-byte floats for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        self.vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize from the on-disk blob; dimension is implicit in length
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() % 8 != 0 {
            return None;
        }
        let vector: Vec<f64> = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect();
        Some(Self::new(vector))
    }
}

// ============================================================================
// EMBEDDING CLIENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f64>,
}

/// Client for the remote embedding provider
pub struct EmbeddingClient {
    endpoint: String,
    model: String,
    http: Option<reqwest::blocking::Client>,
    available: bool,
}

impl EmbeddingClient {
    /// Build a client from `MNEMON_EMBED_ENDPOINT` / `MNEMON_EMBED_MODEL`,
    /// probing availability once
    pub fn from_env() -> Self {
        let endpoint = std::env::var(ENDPOINT_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_EMBED_ENDPOINT.to_string());
        let model = std::env::var(MODEL_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string());
        Self::new(endpoint, model)
    }

    /// Build a client for an explicit endpoint and model, probing once
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let model = model.into();

        let http = reqwest::blocking::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .ok();

        let available = match &http {
            Some(client) => Self::probe(client, &endpoint),
            None => false,
        };

        if !available {
            tracing::debug!(endpoint = %endpoint, "embedding provider unavailable");
        }

        Self {
            endpoint,
            model,
            http,
            available,
        }
    }

    /// Build a permanently-unavailable client (token-overlap-only stores)
    pub fn disabled() -> Self {
        Self {
            endpoint: DEFAULT_EMBED_ENDPOINT.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
            http: None,
            available: false,
        }
    }

    fn probe(client: &reqwest::blocking::Client, endpoint: &str) -> bool {
        client
            .get(format!("{}/api/tags", endpoint))
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    /// Probe result, cached for this client's lifetime
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a text, or explain why the provider could not
    pub fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if !self.available {
            return Err(EmbeddingError::Unavailable(
                "provider probe failed".to_string(),
            ));
        }
        let client = self
            .http
            .as_ref()
            .ok_or_else(|| EmbeddingError::Unavailable("no HTTP client".to_string()))?;

        let response = client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": text,
            }))
            .send()
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::Malformed("empty vector".to_string()));
        }

        Ok(Embedding::new(parsed.embedding))
    }

    /// Embed a text, degrading any failure to `None`
    pub fn try_embed(&self, text: &str) -> Option<Embedding> {
        match self.embed(text) {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::debug!(error = %e, "embedding degraded to token overlap");
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip_preserves_vector() {
        let embedding = Embedding::new(vec![0.25, -1.5, 3.75, 0.0]);
        let bytes = embedding.to_bytes();
        assert_eq!(bytes.len(), 4 * 8);
        let back = Embedding::from_bytes(&bytes).unwrap();
        assert_eq!(back, embedding);
    }

    #[test]
    fn dimension_is_implicit_in_blob_length() {
        let embedding = Embedding::new(vec![1.0; 768]);
        let bytes = embedding.to_bytes();
        assert_eq!(Embedding::from_bytes(&bytes).unwrap().dimensions(), 768);
    }

    #[test]
    fn from_bytes_rejects_ragged_blobs() {
        assert!(Embedding::from_bytes(&[1, 2, 3]).is_none());
        assert!(Embedding::from_bytes(&[]).is_none());
    }

    #[test]
    fn disabled_client_degrades_silently() {
        let client = EmbeddingClient::disabled();
        assert!(!client.is_available());
        assert!(client.try_embed("anything").is_none());
        assert!(matches!(
            client.embed("anything"),
            Err(EmbeddingError::Unavailable(_))
        ));
    }
}
