//! Profile and plan data models collected and produced during onboarding.

use serde::{Deserialize, Serialize};

/// Gender answer (step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Weight goal (step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "Gain Weight")]
    Gain,
    #[serde(rename = "Lose Weight")]
    Lose,
    #[serde(rename = "Maintain Weight")]
    Maintain,
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gain => write!(f, "Gain Weight"),
            Self::Lose => write!(f, "Lose Weight"),
            Self::Maintain => write!(f, "Maintain Weight"),
        }
    }
}

/// Weekly workout frequency bucket (step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutFrequency {
    #[serde(rename = "2-3 Days")]
    Low,
    #[serde(rename = "3-4 Days")]
    Medium,
    #[serde(rename = "5-6 Days")]
    High,
}

impl std::fmt::Display for WorkoutFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "2-3 Days"),
            Self::Medium => write!(f, "3-4 Days"),
            Self::High => write!(f, "5-6 Days"),
        }
    }
}

/// Birth date as entered (step 4).
///
/// Not a calendar date: only the coarse bounds checked by
/// [`parse_birth_date`](super::state::parse_birth_date) are guaranteed, so
/// e.g. February 31st is representable. Serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl std::fmt::Display for BirthDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl std::str::FromStr for BirthDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected YYYY-MM-DD, got {s:?}"));
        };
        Ok(Self {
            year: y.parse().map_err(|_| format!("bad year in {s:?}"))?,
            month: m.parse().map_err(|_| format!("bad month in {s:?}"))?,
            day: d.parse().map_err(|_| format!("bad day in {s:?}"))?,
        })
    }
}

impl Serialize for BirthDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BirthDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Answers accumulated across the onboarding steps.
///
/// Every field starts unset. Partial profiles are valid generator input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_frequency: Option<WorkoutFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<BirthDate>,
    /// Height in feet, as entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    /// Weight in kilograms, as entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

/// A partial update to a [`UserProfile`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub goal: Option<Goal>,
    pub workout_frequency: Option<WorkoutFrequency>,
    pub birth_date: Option<BirthDate>,
    pub height: Option<String>,
    pub weight: Option<String>,
}

impl UserProfile {
    /// Apply a partial update.
    pub fn merge(&mut self, update: ProfileUpdate) {
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        if let Some(goal) = update.goal {
            self.goal = Some(goal);
        }
        if let Some(freq) = update.workout_frequency {
            self.workout_frequency = Some(freq);
        }
        if let Some(date) = update.birth_date {
            self.birth_date = Some(date);
        }
        if let Some(height) = update.height {
            self.height = Some(height);
        }
        if let Some(weight) = update.weight {
            self.weight = Some(weight);
        }
    }

    /// Top-level document fields for this profile (absent fields omitted).
    pub fn to_document_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Macronutrient targets in grams per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Macros {
    pub protein_grams: u32,
    pub carbs_grams: u32,
    pub fats_grams: u32,
}

/// AI-generated daily fitness plan. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessPlan {
    pub daily_calories: u32,
    pub macros: Macros,
    pub water_intake_liters: f64,
    pub fitness_summary: String,
}

impl FitnessPlan {
    /// Check the value constraints serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.daily_calories == 0 {
            return Err("dailyCalories must be positive".to_string());
        }
        let m = &self.macros;
        if m.protein_grams == 0 || m.carbs_grams == 0 || m.fats_grams == 0 {
            return Err("macros must all be positive".to_string());
        }
        if !self.water_intake_liters.is_finite() || self.water_intake_liters <= 0.0 {
            return Err("waterIntakeLiters must be a positive number".to_string());
        }
        Ok(())
    }
}
