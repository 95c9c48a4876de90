//! Pipeline orchestrator: wires corpus loading, chunking, indexing, and
//! the reasoning engine into the caller-facing operations.
//!
//! Lifecycle is explicit: [`Pipeline::initialize`] builds the index (and
//! fails fast when the nutrition table is missing), [`Pipeline::rebuild`]
//! swaps in a freshly built index under a write lock, and
//! [`Pipeline::shutdown`] tears the context down. Request handling is
//! stateless per dish; batch entries are isolated from each other and
//! reported in input order.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chunker::chunk_records;
use crate::config::Config;
use crate::corpus::{CorpusError, load_corpus};
use crate::embedder::Embedder;
use crate::engine::{DishQuery, Generator, NutritionEstimate, ReasoningEngine};
use crate::index::{EmbeddingIndex, IndexError};

/// Start-up failures. Requests are never served past a failed initialize.
#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Per-request and per-batch failures.
#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("estimation unavailable: {0}")]
    EstimationUnavailable(String),

    #[error("malformed batch input: {0}")]
    MalformedBatch(String),
}

/// One entry of a batch request, as accepted on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub dish: String,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// One entry's outcome; the vec of outcomes preserves input order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub dish: String,
    pub result: Result<NutritionEstimate, EstimateError>,
}

struct IndexState {
    index: EmbeddingIndex,
    /// Degradation notes from the corpus load, echoed into assumptions.
    corpus_notes: Vec<String>,
}

/// Explicitly owned pipeline context: index, capabilities, engine.
pub struct Pipeline {
    config: Config,
    embedder: Arc<dyn Embedder>,
    engine: ReasoningEngine,
    state: RwLock<IndexState>,
}

impl Pipeline {
    /// Load the reference corpus, chunk it, and build the index.
    ///
    /// A missing nutrition table surfaces as
    /// [`CorpusError::FatalConfiguration`] before any request is served.
    pub fn initialize(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, InitError> {
        config
            .validate()
            .map_err(|e| InitError::InvalidConfiguration(e.to_string()))?;

        let state = build_state(&config, embedder.as_ref())?;
        let engine = ReasoningEngine::new(generator, config.serving_grams);

        info!("Pipeline initialized");
        Ok(Self {
            config,
            embedder,
            engine,
            state: RwLock::new(state),
        })
    }

    /// Rebuild the index from the current reference sources.
    ///
    /// The new index is constructed completely before the swap, so
    /// concurrent readers never observe a partially-built index.
    pub fn rebuild(&self) -> Result<(), InitError> {
        let fresh = build_state(&self.config, self.embedder.as_ref())?;
        *self.state.write() = fresh;
        info!("Index rebuilt");
        Ok(())
    }

    /// Estimate nutrition for a dish from its name alone.
    pub fn estimate(&self, dish_name: &str) -> Result<NutritionEstimate, EstimateError> {
        if dish_name.trim().is_empty() {
            return Err(EstimateError::InvalidRequest(
                "dish name must not be empty".to_string(),
            ));
        }
        self.run(DishQuery::clean(dish_name))
    }

    /// Estimate nutrition for a dish with declared data-quality issues.
    pub fn estimate_messy(
        &self,
        dish_name: &str,
        issues: &[String],
    ) -> Result<NutritionEstimate, EstimateError> {
        if dish_name.trim().is_empty() {
            return Err(EstimateError::InvalidRequest(
                "dish name must not be empty".to_string(),
            ));
        }
        if issues.is_empty() {
            return Err(EstimateError::InvalidRequest(
                "messy mode requires at least one declared issue".to_string(),
            ));
        }
        self.run(DishQuery::messy(dish_name, issues))
    }

    /// Process a batch of entries independently, preserving input order.
    /// One entry's failure never discards the others' results.
    pub fn estimate_batch(&self, entries: &[BatchEntry]) -> Vec<BatchOutcome> {
        entries
            .iter()
            .map(|entry| {
                let result = if entry.issues.is_empty() {
                    self.estimate(&entry.dish)
                } else {
                    self.estimate_messy(&entry.dish, &entry.issues)
                };
                if let Err(e) = &result {
                    warn!("Batch entry {:?} failed: {e}", entry.dish);
                }
                BatchOutcome {
                    dish: entry.dish.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Explicit teardown of the pipeline context.
    pub fn shutdown(self) {
        info!("Pipeline shut down");
    }

    fn run(&self, query: DishQuery) -> Result<NutritionEstimate, EstimateError> {
        let state = self.state.read();

        // Retrieval runs against the dish name, not the full instruction:
        // the reference rows are ingredient/unit/category shaped, and the
        // instruction boilerplate would only dilute the query.
        let segments = state
            .index
            .search(&query.dish_name, self.config.search_top_k, self.embedder.as_ref())
            .map_err(|e| EstimateError::EstimationUnavailable(e.to_string()))?;

        info!(
            "Retrieved {} segments for {:?}",
            segments.len(),
            query.dish_name
        );

        self.engine
            .estimate(&query, &segments, &state.corpus_notes)
            .map_err(|e| EstimateError::EstimationUnavailable(e.to_string()))
    }
}

/// Parse batch input: a JSON array of `{dish, issues?}` objects.
///
/// Unparseable input fails once for the whole batch, since no individual
/// entries could be recovered from it.
pub fn parse_batch_input(json: &str) -> Result<Vec<BatchEntry>, EstimateError> {
    serde_json::from_str::<Vec<BatchEntry>>(json)
        .map_err(|e| EstimateError::MalformedBatch(e.to_string()))
}

fn build_state(config: &Config, embedder: &dyn Embedder) -> Result<IndexState, InitError> {
    let load = load_corpus(&config.sources)?;
    let segments = chunk_records(&load.records, config.max_chunk_length, config.overlap_length);

    let mut index = EmbeddingIndex::open(embedder.dimensions())?;
    index.build(&segments, embedder)?;

    Ok(IndexState {
        index,
        corpus_notes: load.degraded,
    })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::corpus::CorpusError;
    use crate::embedder::mock::MockEmbedder;
    use crate::engine::mock::MockGenerator;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn write_sources(dir: &Path, config: &mut Config) {
        let nutrition = dir.join("nutrition.csv");
        fs::write(
            &nutrition,
            "ingredient,calories_per_100g,protein_g,fat_g,carbs_g\npotato,77,2,0.1,17\npaneer,265,18.3,20.8,1.2\n",
        )
        .unwrap();
        let units = dir.join("units.csv");
        fs::write(&units, "unit,grams\nkatori,150\nglass,250\n").unwrap();
        let categories = dir.join("categories.csv");
        fs::write(&categories, "dish,category\njeera aloo,Dry Sabzi\n").unwrap();

        config.sources.nutrition_csv = nutrition.to_string_lossy().to_string();
        config.sources.units_csv = units.to_string_lossy().to_string();
        config.sources.categories_csv = categories.to_string_lossy().to_string();
    }

    fn test_pipeline() -> (Pipeline, TempDir) {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.embedding.dimensions = 64;
        write_sources(temp.path(), &mut config);

        let pipeline = Pipeline::initialize(
            config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::canned()),
        )
        .unwrap();
        (pipeline, temp)
    }

    #[test]
    fn test_empty_dish_name_rejected_before_retrieval() {
        let (pipeline, _temp) = test_pipeline();
        let err = pipeline.estimate("   ").unwrap_err();
        assert!(matches!(err, EstimateError::InvalidRequest(_)));
    }

    #[test]
    fn test_messy_requires_issues() {
        let (pipeline, _temp) = test_pipeline();
        let err = pipeline.estimate_messy("Gobhi Sabzi", &[]).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidRequest(_)));
    }

    #[test]
    fn test_clean_estimate_succeeds() {
        let (pipeline, _temp) = test_pipeline();
        let estimate = pipeline.estimate("Jeera Aloo").unwrap();
        assert!(estimate.nutrition_per_serving.calories.is_finite());
        assert_eq!(estimate.dish_type, "Dry Sabzi");
    }

    #[test]
    fn test_rebuild_keeps_serving_requests() {
        let (pipeline, _temp) = test_pipeline();
        pipeline.rebuild().unwrap();
        assert!(pipeline.estimate("Jeera Aloo").is_ok());
    }

    #[test]
    fn test_missing_nutrition_table_fails_initialize() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.embedding.dimensions = 64;
        write_sources(temp.path(), &mut config);
        config.sources.nutrition_csv =
            temp.path().join("absent.csv").to_string_lossy().to_string();

        let err = Pipeline::initialize(
            config,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MockGenerator::canned()),
        )
        .err()
        .expect("initialize should fail");
        assert!(matches!(
            err,
            InitError::Corpus(CorpusError::FatalConfiguration { .. })
        ));
    }

    #[test]
    fn test_parse_batch_input_valid() {
        let json = r#"[
            {"dish": "Jeera Aloo (mild fried)", "issues": ["ingredient synonym", "quantity missing"]},
            {"dish": "Paneer Butter Masala"}
        ]"#;
        let entries = parse_batch_input(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].issues.len(), 2);
        assert!(entries[1].issues.is_empty());
    }

    #[test]
    fn test_parse_batch_input_malformed() {
        let err = parse_batch_input("{\"dish\": \"not an array\"}").unwrap_err();
        assert!(matches!(err, EstimateError::MalformedBatch(_)));
    }

    #[test]
    fn test_batch_isolates_invalid_entry() {
        let (pipeline, _temp) = test_pipeline();
        let entries = vec![
            BatchEntry {
                dish: "Jeera Aloo".to_string(),
                issues: vec![],
            },
            BatchEntry {
                dish: String::new(),
                issues: vec![],
            },
            BatchEntry {
                dish: "Chana masala".to_string(),
                issues: vec!["missing ingredient in nutrition DB".to_string()],
            },
        ];

        let outcomes = pipeline.estimate_batch(&entries);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(EstimateError::InvalidRequest(_))
        ));
        assert!(outcomes[2].result.is_ok());
        // Input order preserved
        assert_eq!(outcomes[0].dish, "Jeera Aloo");
        assert_eq!(outcomes[2].dish, "Chana masala");
    }
}
