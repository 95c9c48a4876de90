//! # Katori — Indian Dish Nutrition Estimator
//!
//! Best-effort nutrition estimates (calories, protein, fat, carbs) for
//! Indian dishes from free-text names, including noisy inputs with
//! spelling variants, missing quantities, and non-standard units.
//! Reference tables are indexed into a vector store; a generative model
//! reasons over the retrieved rows and emits a structured estimate
//! normalized to one katori (~150 g).
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, defaults
//! - **[`corpus`]** — CSV reference tables → uniform text records
//! - **[`chunker`]** — Bounded-length overlapping segments for retrieval
//! - **[`index`]** — SQLite + sqlite-vec in-memory similarity index
//! - **[`embedder`]** — Text embedding capability (HTTP + mock)
//! - **[`engine`]** — Prompt construction, generation, strict-JSON parsing
//! - **[`pipeline`]** — `estimate` / `estimate_messy` / `estimate_batch`
//! - **[`retry`]** — Bounded retry with backoff for remote calls

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod engine;
pub mod index;
pub mod pipeline;
pub mod retry;
