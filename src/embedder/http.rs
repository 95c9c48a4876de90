//! Remote embedding client (Hugging Face feature-extraction endpoint).
//!
//! Sends segment text to the configured endpoint and validates the
//! returned vector dimensionality. Calls carry a hard timeout and a
//! bounded retry with backoff, since the endpoint is network-bound.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;
use crate::retry::with_retries;

/// Environment variable holding the API token.
pub const API_TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";

const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [&'a str],
}

pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_retries: usize,
    api_token: String,
}

impl HttpEmbedder {
    /// Build a client from config, reading the API token from the
    /// environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let api_token = std::env::var(API_TOKEN_ENV)
            .map_err(|_| EmbedderError::MissingCredentials(API_TOKEN_ENV.to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("katori/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
            api_token,
        })
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_token.trim())
            .json(&EmbeddingRequest { inputs: texts })
            .send()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedderError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let vectors: Vec<Vec<f32>> = resp
            .json()
            .map_err(|e| EmbedderError::MalformedResponse(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(EmbedderError::MalformedResponse(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(EmbedderError::DimensionMismatch {
                    expected: self.dimensions,
                    got: vector.len(),
                });
            }
        }

        Ok(vectors)
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::MalformedResponse("empty response".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);
        with_retries(
            self.max_retries,
            BASE_BACKOFF,
            || self.request(texts),
            EmbedderError::is_retryable,
        )
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
