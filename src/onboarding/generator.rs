//! Plan generator — turns an onboarding profile into a fitness plan via an LLM.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::GenerationError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

use super::model::{FitnessPlan, UserProfile};
use super::prompts::{parse_plan, plan_prompt};

/// Produces a fitness plan from a (possibly partial) profile.
///
/// One call is one attempt; implementations do not retry.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, profile: &UserProfile) -> Result<FitnessPlan, GenerationError>;
}

/// `PlanGenerator` backed by any `LlmProvider`.
pub struct LlmPlanGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmPlanGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &OrchestratorConfig) -> Self {
        Self {
            llm,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl PlanGenerator for LlmPlanGenerator {
    async fn generate(&self, profile: &UserProfile) -> Result<FitnessPlan, GenerationError> {
        info!(model = self.llm.model_name(), "Generating fitness plan");

        let mut request = CompletionRequest::new(vec![ChatMessage::user(plan_prompt(profile))])
            .with_temperature(self.temperature)
            .with_json_response();
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(request).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            "Plan response received"
        );
        if response.finish_reason == FinishReason::Length {
            warn!(
                output_tokens = response.output_tokens,
                max_tokens = ?self.max_tokens,
                "Plan response hit the output token limit and is likely truncated"
            );
        }

        parse_plan(&response.content).inspect_err(|e| {
            warn!(error = %e, response = %response.content, "Failed to parse plan response");
        })
    }
}
