//! LLM integration for fitplan.
//!
//! Supports:
//! - **Gemini**: Direct REST access via reqwest
//!
//! Callers depend on the `LlmProvider` trait so tests can swap in stubs.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::*;

use std::sync::Arc;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// May be absent; requests then fail with a missing-credential error.
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    match config.backend {
        LlmBackend::Gemini => {
            if config.api_key.is_none() {
                tracing::warn!("No Gemini API key configured; plans will not be generated");
            }
            tracing::info!("Using Gemini (model: {})", config.model);
            Arc::new(GeminiProvider::new(
                config.api_key.clone(),
                config.model.clone(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_without_key_still_constructs() {
        let config = LlmConfig {
            backend: LlmBackend::Gemini,
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
        };
        let provider = create_provider(&config);
        assert_eq!(provider.model_name(), "gemini-2.5-flash");
    }
}
