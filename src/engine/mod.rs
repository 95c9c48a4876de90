//! Reasoning engine: turns a dish query plus retrieved reference
//! segments into a structured nutrition estimate via a generative-text
//! capability.
//!
//! The capability is injected through [`Generator`]; replies must carry a
//! fixed-schema JSON object, parsed behind the single adapter in
//! [`parse`]. Two operating modes mirror the caller-facing operations:
//! the clean path works from the dish name alone, the messy path
//! additionally resolves declared data-quality issues and must document
//! every inferred or defaulted value in `assumptions`.

pub mod http;
pub mod mock;
pub mod parse;
pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::index::RetrievedSegment;

/// Errors from the generative capability or its response handling.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    #[error("generation endpoint returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed generative response: {0}")]
    MalformedResponse(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

impl GeneratorError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GeneratorError::RequestFailed(_) => true,
            GeneratorError::BadStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Trait for generative-text implementations.
///
/// Responses may differ across calls for the same input; callers must
/// not assume byte-identical repeats.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        instruction: &str,
        context_segments: &[String],
    ) -> Result<String, GeneratorError>;
}

// ── Request / response types ─────────────────────────────────────────

/// One dish request. `issues` is empty on the clean path.
#[derive(Debug, Clone)]
pub struct DishQuery {
    pub dish_name: String,
    pub issues: Vec<String>,
}

impl DishQuery {
    #[must_use]
    pub fn clean(dish_name: &str) -> Self {
        Self {
            dish_name: dish_name.to_string(),
            issues: Vec::new(),
        }
    }

    #[must_use]
    pub fn messy(dish_name: &str, issues: &[String]) -> Self {
        Self {
            dish_name: dish_name.to_string(),
            issues: issues.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPerServing {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
}

/// The structured estimate returned to callers. Request-scoped; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub ingredients: Vec<Ingredient>,
    pub nutrition_per_serving: NutritionPerServing,
    #[serde(default)]
    pub dish_type: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

// ── Engine ───────────────────────────────────────────────────────────

pub struct ReasoningEngine {
    generator: Arc<dyn Generator>,
    serving_grams: f64,
}

impl ReasoningEngine {
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, serving_grams: f64) -> Self {
        Self {
            generator,
            serving_grams,
        }
    }

    /// Run one estimate. `corpus_notes` are degradation notes from the
    /// corpus load, appended to the assumption log so a shrunken corpus
    /// stays visible per estimate.
    pub fn estimate(
        &self,
        query: &DishQuery,
        segments: &[RetrievedSegment],
        corpus_notes: &[String],
    ) -> Result<NutritionEstimate, GeneratorError> {
        let instruction = if query.issues.is_empty() {
            prompt::clean_instruction(&query.dish_name, self.serving_grams)
        } else {
            prompt::messy_instruction(&query.dish_name, &query.issues, self.serving_grams)
        };

        let context: Vec<String> = segments
            .iter()
            .map(|s| format!("[{}] {}", s.source_table.as_str(), s.content))
            .collect();

        debug!(
            "Estimating {:?} with {} context segments",
            query.dish_name,
            context.len()
        );

        let raw = self.generator.generate(&instruction, &context)?;
        let mut estimate = parse::parse_estimate(&raw)?;

        estimate.assumptions.extend(corpus_notes.iter().cloned());

        // Messy mode must never return an empty assumption log
        if !query.issues.is_empty() && estimate.assumptions.is_empty() {
            estimate.assumptions.push(format!(
                "declared issues ({}) were resolved with standard defaults; the model reported no explicit assumptions",
                query.issues.join(", ")
            ));
        }

        Ok(estimate)
    }
}
