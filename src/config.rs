//! Configuration module for Katori.
//!
//! Handles loading, validating, and providing default configuration values.
//! Credentials are never stored here: the HTTP capabilities read
//! `HUGGINGFACEHUB_API_TOKEN` from the environment.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_nutrition_csv() -> String {
    "data/nutrition_source.csv".to_string()
}

fn default_units_csv() -> String {
    "data/unit_of_measurements.csv".to_string()
}

fn default_categories_csv() -> String {
    "data/food_categories.csv".to_string()
}

fn default_max_chunk_length() -> usize {
    100
}

fn default_overlap_length() -> usize {
    10
}

fn default_search_top_k() -> usize {
    4
}

fn default_serving_grams() -> f64 {
    150.0
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".to_string()
}

fn default_embedding_endpoint() -> String {
    "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-mpnet-base-v2"
        .to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_generation_model() -> String {
    "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string()
}

fn default_generation_endpoint() -> String {
    "https://router.huggingface.co/v1/chat/completions".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    2
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    #[serde(default = "default_overlap_length")]
    pub overlap_length: usize,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default = "default_serving_grams")]
    pub serving_grams: f64,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Paths of the three reference tables consumed at index-build time.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_nutrition_csv")]
    pub nutrition_csv: String,

    #[serde(default = "default_units_csv")]
    pub units_csv: String,

    #[serde(default = "default_categories_csv")]
    pub categories_csv: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            max_chunk_length: default_max_chunk_length(),
            overlap_length: default_overlap_length(),
            search_top_k: default_search_top_k(),
            serving_grams: default_serving_grams(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            nutrition_csv: default_nutrition_csv(),
            units_csv: default_units_csv(),
            categories_csv: default_categories_csv(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            endpoint: default_embedding_endpoint(),
            dimensions: default_dimensions(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            endpoint: default_generation_endpoint(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"katori.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "katori.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "katori.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_chunk_length > 0, "max_chunk_length must be positive");
        anyhow::ensure!(
            self.overlap_length < self.max_chunk_length,
            "overlap_length must be smaller than max_chunk_length"
        );
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(self.serving_grams > 0.0, "serving_grams must be positive");
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            !self.sources.nutrition_csv.is_empty(),
            "sources.nutrition_csv must be set"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_chunk_length, 100);
        assert_eq!(config.overlap_length, 10);
        assert_eq!(config.search_top_k, 4);
        assert_eq!(config.serving_grams, 150.0);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(
            config.embedding.model,
            "sentence-transformers/all-mpnet-base-v2"
        );
        assert_eq!(
            config.generation.model,
            "mistralai/Mixtral-8x7B-Instruct-v0.1"
        );
        assert_eq!(config.generation.max_retries, 2);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"max_chunk_length": 200, "search_top_k": 8}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_chunk_length, 200);
        assert_eq!(config.search_top_k, 8);
        // Other fields should have defaults
        assert_eq!(config.overlap_length, 10);
        assert_eq!(config.embedding.dimensions, 768);
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_overlap_must_be_smaller() {
        let mut config = Config::default();
        config.overlap_length = config.max_chunk_length;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_chunk_length() {
        let mut config = Config::default();
        config.max_chunk_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_nutrition_source() {
        let mut config = Config::default();
        config.sources.nutrition_csv = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_chunk_length, config.max_chunk_length);
        assert_eq!(parsed.sources.nutrition_csv, config.sources.nutrition_csv);
        assert_eq!(parsed.generation.model, config.generation.model);
    }
}
