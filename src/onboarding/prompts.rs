//! Plan generation prompt and response cleanup.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::GenerationError;

use super::model::{FitnessPlan, UserProfile};

/// Matches markdown code-fence markers, with or without a `json` tag.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("static regex is valid"));

/// Build the plan generation prompt for a (possibly partial) profile.
///
/// Unset fields render as `undefined`; the model copes with gaps.
pub fn plan_prompt(profile: &UserProfile) -> String {
    fn field<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map_or_else(|| "undefined".to_string(), |v| v.to_string())
    }

    format!(
        "\
You are an expert fitness and nutrition AI coach.
I need you to generate a personalized daily fitness plan including daily calories, \
macronutrient breakdown in grams, daily water intake in liters, and a short summary/tips \
section based on the following user profile:

Gender: {gender}
Goal: {goal}
Workout Frequency: {frequency}
Birth Date: {birth_date}
Height: {height} feet
Weight: {weight} kg

Respond strictly with a JSON object in the following format, with no markdown formatting or extra text:
{{
  \"dailyCalories\": 2500,
  \"macros\": {{
    \"proteinGrams\": 150,
    \"carbsGrams\": 250,
    \"fatsGrams\": 80
  }},
  \"waterIntakeLiters\": 3.5,
  \"fitnessSummary\": \"A short, encouraging 2-3 sentence summary about their plan.\"
}}",
        gender = field(profile.gender),
        goal = field(profile.goal),
        frequency = field(profile.workout_frequency),
        birth_date = field(profile.birth_date),
        height = field(profile.height.as_deref()),
        weight = field(profile.weight.as_deref()),
    )
}

/// Remove every code-fence marker and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Parse raw model output into a validated plan.
pub fn parse_plan(raw: &str) -> Result<FitnessPlan, GenerationError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(GenerationError::MalformedResponse(
            "empty response after removing code fences".to_string(),
        ));
    }

    // Syntax first, so non-JSON and wrong-shape JSON are told apart.
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| GenerationError::MalformedResponse(format!("not JSON: {e}")))?;

    let plan: FitnessPlan =
        serde_json::from_value(value).map_err(|e| GenerationError::Schema(e.to_string()))?;
    plan.validate().map_err(GenerationError::Schema)?;
    Ok(plan)
}
