//! Mock embedder for tests and offline runs.
//!
//! Feature-hashes whitespace tokens into a fixed-dimension vector, so
//! texts sharing words land near each other while staying fully
//! deterministic. No network, no model files.

use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError};

/// A deterministic token-hashing embedder.
pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let idx = (hash as usize) % self.dimensions;
            let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
            embedding[idx] += sign;
        }

        // Tokenless input still needs a valid direction
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq == 0.0 {
            embedding[0] = 1.0;
            return Ok(embedding);
        }

        let inv = 1.0 / norm_sq.sqrt();
        for v in &mut embedding {
            *v *= inv;
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_mock_embed_dimensions() {
        let embedder = MockEmbedder::new(64);
        let result = embedder.embed("paneer butter masala").unwrap();
        assert_eq!(result.len(), 64);
    }

    #[test]
    fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("jeera aloo").unwrap();
        let b = embedder.embed("jeera aloo").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::new(64);
        let vec = embedder.embed("chana masala with rice").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "vector should be approximately unit length, got {norm}"
        );
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let embedder = MockEmbedder::new(256);
        let query = embedder.embed("paneer curry").unwrap();
        let close = embedder.embed("ingredient: paneer, grams_per_100g: 265").unwrap();
        let far = embedder.embed("unit: tablespoon, grams: 15").unwrap();
        assert!(
            cosine(&query, &close) > cosine(&query, &far),
            "shared tokens should yield higher similarity"
        );
    }

    #[test]
    fn test_empty_text_is_valid_vector() {
        let embedder = MockEmbedder::new(32);
        let vec = embedder.embed("   ").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_mock_embed_batch() {
        let embedder = MockEmbedder::new(32);
        let results = embedder.embed_batch(&["dal", "roti", "sabzi"]).unwrap();
        assert_eq!(results.len(), 3);
        for vec in &results {
            assert_eq!(vec.len(), 32);
        }
    }
}
