//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gemini model used for plan generation.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the libSQL database holding user records.
    pub db_path: PathBuf,
    /// Path of the JSON file backing the local onboarding flag cache.
    pub cache_path: PathBuf,
    /// HTTP port for the API.
    pub port: u16,
    /// Gemini API key. `None` is allowed; generation then fails with a
    /// missing-credential error and onboarding completes without a plan.
    pub gemini_api_key: Option<SecretString>,
    /// Gemini model name.
    pub model: String,
    /// Orchestrator settings.
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// Build the configuration from `FITPLAN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("FITPLAN_DB_PATH")
            .unwrap_or_else(|_| "./data/fitplan.db".to_string())
            .into();

        let cache_path = std::env::var("FITPLAN_CACHE_PATH")
            .unwrap_or_else(|_| "./data/onboarding-cache.json".to_string())
            .into();

        let port = parse_var("FITPLAN_PORT", 8080u16)?;

        // Prefer the server-side key; the public one is accepted as a fallback.
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("EXPO_PUBLIC_GEMINI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let model = std::env::var("FITPLAN_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let defaults = OrchestratorConfig::default();
        let tick_ms = parse_var(
            "FITPLAN_PROGRESS_TICK_MS",
            defaults.progress_tick.as_millis() as u64,
        )?;
        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FITPLAN_PROGRESS_TICK_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        let max_tokens = match std::env::var("FITPLAN_MAX_TOKENS") {
            Ok(_) => match parse_var("FITPLAN_MAX_TOKENS", 0u32)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "FITPLAN_MAX_TOKENS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                cap => Some(cap),
            },
            Err(_) => defaults.max_tokens,
        };
        let temperature = parse_var("FITPLAN_TEMPERATURE", defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "FITPLAN_TEMPERATURE".to_string(),
                message: format!("{temperature} is outside 0.0..=2.0"),
            });
        }

        Ok(Self {
            db_path,
            cache_path,
            port,
            gemini_api_key,
            model,
            orchestrator: OrchestratorConfig {
                progress_tick: Duration::from_millis(tick_ms),
                temperature,
                max_tokens,
            },
        })
    }
}

/// Plan generation settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Interval between cosmetic progress stages.
    pub progress_tick: Duration,
    /// LLM temperature for plan generation.
    pub temperature: f32,
    /// Output token cap for the LLM response. `None` leaves the model's own
    /// limit in place; Gemini 2.5 counts thinking tokens against this cap.
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(1500),
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrator_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.progress_tick, Duration::from_millis(1500));
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, None);
    }

    #[test]
    fn parse_var_falls_back_to_default() {
        let port: u16 = parse_var("FITPLAN_TEST_UNSET_VARIABLE", 4242).unwrap();
        assert_eq!(port, 4242);
    }
}
