//! Reference corpus loader.
//!
//! Reads the three tabular reference sources (nutrition per 100 g, unit
//! conversions, food categories) and normalizes each row into a uniform
//! text-bearing record for retrieval. The nutrition table is mandatory;
//! the other two degrade to an empty contribution when unreadable.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::SourcesConfig;

/// Which reference table a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTable {
    Nutrition,
    UnitConversion,
    FoodCategory,
}

impl SourceTable {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTable::Nutrition => "nutrition",
            SourceTable::UnitConversion => "unit_conversion",
            SourceTable::FoodCategory => "food_category",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nutrition" => Some(SourceTable::Nutrition),
            "unit_conversion" => Some(SourceTable::UnitConversion),
            "food_category" => Some(SourceTable::FoodCategory),
            _ => None,
        }
    }
}

/// One row of a reference table, rendered as a retrievable string.
///
/// Immutable once loaded; lives until the next index rebuild.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    pub source_table: SourceTable,
    /// Column name → value pairs, in column order.
    pub raw_fields: Vec<(String, String)>,
    /// The row rendered as `"col: val, col: val, ..."`.
    pub text_representation: String,
}

/// Errors raised while loading the reference corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// The nutrition table itself is missing; the pipeline cannot answer.
    #[error("nutrition table unavailable at {path}: {reason}")]
    FatalConfiguration { path: String, reason: String },

    #[error("reference source unavailable at {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },
}

/// Result of a corpus load: the records plus notes about any source
/// that had to be dropped.
#[derive(Debug, Default)]
pub struct CorpusLoad {
    pub records: Vec<ReferenceRecord>,
    /// Warning-level notes surfaced later in estimate assumptions.
    pub degraded: Vec<String>,
}

/// Load all three reference sources.
///
/// A missing unit-conversion or food-category source shrinks the corpus
/// and is recorded in [`CorpusLoad::degraded`]; a missing nutrition
/// source is [`CorpusError::FatalConfiguration`].
pub fn load_corpus(sources: &SourcesConfig) -> Result<CorpusLoad, CorpusError> {
    let mut load = CorpusLoad::default();

    match load_source(&sources.nutrition_csv, SourceTable::Nutrition) {
        Ok(records) => load.records.extend(records),
        Err(CorpusError::SourceUnavailable { path, reason }) => {
            return Err(CorpusError::FatalConfiguration { path, reason });
        }
        Err(e) => return Err(e),
    }

    for (path, table) in [
        (&sources.units_csv, SourceTable::UnitConversion),
        (&sources.categories_csv, SourceTable::FoodCategory),
    ] {
        match load_source(path, table) {
            Ok(records) => load.records.extend(records),
            Err(e) => {
                warn!("Degrading corpus, {} source dropped: {e}", table.as_str());
                load.degraded.push(format!(
                    "{} reference table could not be loaded; related lookups fall back to estimated defaults",
                    table.as_str()
                ));
            }
        }
    }

    info!(
        "Loaded reference corpus: {} records ({} degraded sources)",
        load.records.len(),
        load.degraded.len()
    );

    Ok(load)
}

/// Load a single CSV source into one record per data row.
pub fn load_source(path: &str, table: SourceTable) -> Result<Vec<ReferenceRecord>, CorpusError> {
    let unavailable = |reason: String| CorpusError::SourceUnavailable {
        path: path.to_string(),
        reason,
    };

    if !Path::new(path).exists() {
        return Err(unavailable("file not found".to_string()));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| unavailable(e.to_string()))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unavailable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| unavailable(e.to_string()))?;
        let raw_fields: Vec<(String, String)> = headers
            .iter()
            .cloned()
            .zip(row.iter().map(|v| v.trim().to_string()))
            .collect();
        records.push(ReferenceRecord {
            source_table: table,
            text_representation: render_fields(&raw_fields),
            raw_fields,
        });
    }

    info!("Loaded {} rows from {} ({path})", records.len(), table.as_str());
    Ok(records)
}

/// Render column/value pairs in column order, e.g.
/// `"ingredient: chana, grams_per_100g: 164"`.
fn render_fields(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ────────────────────────────────────────────────────────────
