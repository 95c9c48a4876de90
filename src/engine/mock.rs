//! Mock generator for tests and `--mock` runs.

use super::{Generator, GeneratorError};

/// Returns a canned reply; optionally fails whenever the instruction
/// contains a marker string, to exercise per-dish failure isolation.
pub struct MockGenerator {
    reply: String,
    fail_marker: Option<String>,
}

impl MockGenerator {
    #[must_use]
    pub fn new(reply: String) -> Self {
        Self {
            reply,
            fail_marker: None,
        }
    }

    #[must_use]
    pub fn with_failure_marker(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    /// A representative reply for offline demo runs.
    #[must_use]
    pub fn canned() -> Self {
        let reply = serde_json::json!({
            "ingredients": [
                {"name": "potato", "quantity": 200.0, "unit": "g"},
                {"name": "cumin seeds", "quantity": 5.0, "unit": "g"},
                {"name": "vegetable oil", "quantity": 15.0, "unit": "g"}
            ],
            "nutrition_per_serving": {
                "calories": 185.0,
                "protein_g": 3.5,
                "fat_g": 9.0,
                "carbs_g": 24.0
            },
            "dish_type": "Dry Sabzi",
            "assumptions": [
                "household quantities estimated from a typical 2-person recipe",
                "serving normalized to one katori (~150 g)"
            ]
        })
        .to_string();
        Self::new(reply)
    }
}

impl Generator for MockGenerator {
    fn generate(
        &self,
        instruction: &str,
        _context_segments: &[String],
    ) -> Result<String, GeneratorError> {
        if let Some(marker) = &self.fail_marker {
            if instruction.contains(marker.as_str()) {
                return Err(GeneratorError::RequestFailed(format!(
                    "simulated capability failure for {marker:?}"
                )));
            }
        }
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse::parse_estimate;

    #[test]
    fn test_canned_reply_parses() {
        let generator = MockGenerator::canned();
        let raw = generator.generate("estimate Jeera Aloo", &[]).unwrap();
        let estimate = parse_estimate(&raw).unwrap();
        assert_eq!(estimate.ingredients.len(), 3);
        assert!(!estimate.assumptions.is_empty());
    }

    #[test]
    fn test_failure_marker_triggers() {
        let generator = MockGenerator::canned().with_failure_marker("Mixed veg");
        assert!(generator.generate("estimate \"Mixed veg\"", &[]).is_err());
        assert!(generator.generate("estimate \"Gobhi Sabzi\"", &[]).is_ok());
    }
}
