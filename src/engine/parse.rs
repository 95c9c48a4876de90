//! Single adapter from a generative reply to a [`NutritionEstimate`].
//!
//! The instruction demands bare JSON, but models wrap replies in fences
//! or prose often enough that salvage is worth one extra pass: first try
//! the whole reply, then a fenced block, then the first balanced JSON
//! object. Anything else is a malformed response for that dish only.

use std::sync::LazyLock;

use regex::Regex;

use super::{GeneratorError, NutritionEstimate};

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Parse a generative reply into a structured estimate.
pub fn parse_estimate(raw: &str) -> Result<NutritionEstimate, GeneratorError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GeneratorError::MalformedResponse(
            "empty reply".to_string(),
        ));
    }

    if let Ok(estimate) = serde_json::from_str::<NutritionEstimate>(trimmed) {
        return Ok(estimate);
    }

    if let Some(caps) = FENCED_JSON.captures(trimmed) {
        if let Ok(estimate) = serde_json::from_str::<NutritionEstimate>(&caps[1]) {
            return Ok(estimate);
        }
    }

    if let Some(candidate) = first_json_object(trimmed) {
        if let Ok(estimate) = serde_json::from_str::<NutritionEstimate>(candidate) {
            return Ok(estimate);
        }
    }

    Err(GeneratorError::MalformedResponse(format!(
        "no parseable estimate object in reply: {}",
        truncate(trimmed, 120)
    )))
}

/// Extract the first balanced `{...}` block, respecting string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> String {
        serde_json::json!({
            "ingredients": [{"name": "chana", "quantity": 120.0, "unit": "g"}],
            "nutrition_per_serving": {
                "calories": 210.0, "protein_g": 9.5, "fat_g": 5.0, "carbs_g": 30.0
            },
            "dish_type": "Curry",
            "assumptions": ["standard katori serving assumed"]
        })
        .to_string()
    }

    #[test]
    fn test_parse_bare_json() {
        let estimate = parse_estimate(&valid_json()).unwrap();
        assert_eq!(estimate.ingredients[0].name, "chana");
        assert_eq!(estimate.nutrition_per_serving.calories, 210.0);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = format!("Here is the estimate:\n```json\n{}\n```\nHope this helps!", valid_json());
        let estimate = parse_estimate(&raw).unwrap();
        assert_eq!(estimate.dish_type, "Curry");
    }

    #[test]
    fn test_parse_prose_wrapped_json() {
        let raw = format!("Sure! {} That's my best estimate.", valid_json());
        let estimate = parse_estimate(&raw).unwrap();
        assert_eq!(estimate.assumptions.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_scanner() {
        let raw = format!("note {{\"why\": \"a }} in a string\"}} then {}", valid_json());
        // First balanced object is the note, which fails to deserialize;
        // the whole reply is then malformed. Verify no panic.
        let _ = parse_estimate(&raw);
    }

    #[test]
    fn test_missing_nutrition_fields_rejected() {
        let raw = r#"{"ingredients": [], "dish_type": "Curry"}"#;
        let err = parse_estimate(raw).unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedResponse(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = parse_estimate("I could not estimate this dish.").unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_reply_rejected() {
        assert!(parse_estimate("   ").is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let raw = r#"{
            "ingredients": [{"name": "rice"}],
            "nutrition_per_serving": {"calories": 1.0, "protein_g": 2.0, "fat_g": 3.0, "carbs_g": 4.0}
        }"#;
        let estimate = parse_estimate(raw).unwrap();
        assert_eq!(estimate.ingredients[0].quantity, 0.0);
        assert!(estimate.dish_type.is_empty());
        assert!(estimate.assumptions.is_empty());
    }
}
