//! Embedder trait and shared types for text embedding.
//!
//! The index never assumes a concrete model; it only sees this trait.

pub mod http;
pub mod mock;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("embedding endpoint returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("expected {expected}-dimensional vector, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

impl EmbedderError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedderError::RequestFailed(_) => true,
            EmbedderError::BadStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
