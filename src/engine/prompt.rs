//! Instruction builders for the generative capability.
//!
//! Both modes demand a single fixed-schema JSON object so the reply can
//! be parsed strictly instead of scraped from free text.

const OUTPUT_SCHEMA: &str = r#"Respond with a single JSON object and nothing else, in exactly this shape:
{
  "ingredients": [{"name": "...", "quantity": 0.0, "unit": "g"}],
  "nutrition_per_serving": {"calories": 0.0, "protein_g": 0.0, "fat_g": 0.0, "carbs_g": 0.0},
  "dish_type": "...",
  "assumptions": ["..."]
}"#;

/// Instruction for the clean path: the dish name is all we have.
pub fn clean_instruction(dish_name: &str, serving_grams: f64) -> String {
    format!(
        r#"Given the Indian dish "{dish_name}", perform the following:
1. Estimate likely ingredients and their household measurements.
2. Convert household measurements to grams using the unit_conversion reference rows.
3. Map each ingredient to the nutrition reference rows (per 100 g).
4. Estimate total nutrition (calories, protein, fat, carbs).
5. Identify the type of dish (e.g., Wet Sabzi, Dry Sabzi) using the food_category rows.
6. Scale the output to one katori (~{serving_grams:.0} g) serving.

If an ingredient has no matching nutrition row, substitute a clearly
estimated default for it and record that substitution in "assumptions"
instead of failing.

{OUTPUT_SCHEMA}"#
    )
}

/// Instruction for the messy path: declared data-quality issues must be
/// resolved and every inferred or defaulted value logged.
pub fn messy_instruction(dish_name: &str, issues: &[String], serving_grams: f64) -> String {
    format!(
        r#"You are an intelligent food analyst working with noisy, incomplete data.

Dish: "{dish_name}"
Issues: {issues}

Your task:
1. Interpret the dish, including Hindi/English mixed naming and spelling variants.
2. List assumed ingredients and estimated household quantities.
3. Resolve unit ambiguity (e.g., 'glass', 'pinch') to gram equivalents, using the unit_conversion rows where they match and common-sense estimates where they do not.
4. Fill any missing quantity or serving size with a stated default.
5. Map ingredients to the nutrition rows (per 100 g); give fallback values for entries missing from the reference data.
6. Guess the dish type (e.g., Dry Sabzi, Curry) using the food_category rows.
7. Output nutrition per one katori (~{serving_grams:.0} g), based on these estimates.
8. Log every assumption you made; "assumptions" must not be empty.

Think like a human cook and use natural reasoning, not hard-coded answers.

{OUTPUT_SCHEMA}"#,
        issues = issues.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_instruction_mentions_dish_and_serving() {
        let instruction = clean_instruction("Paneer Butter Masala", 150.0);
        assert!(instruction.contains("\"Paneer Butter Masala\""));
        assert!(instruction.contains("~150 g"));
        assert!(instruction.contains("nutrition_per_serving"));
    }

    #[test]
    fn test_messy_instruction_lists_issues() {
        let issues = vec![
            "unit in 'glass'".to_string(),
            "spelling variation".to_string(),
        ];
        let instruction = messy_instruction("Paneer Curry with capsicum", &issues, 150.0);
        assert!(instruction.contains("unit in 'glass', spelling variation"));
        assert!(instruction.contains("must not be empty"));
    }

    #[test]
    fn test_both_modes_demand_json_schema() {
        assert!(clean_instruction("dal", 150.0).contains("single JSON object"));
        assert!(messy_instruction("dal", &["x".to_string()], 150.0).contains("single JSON object"));
    }
}
