//! LLM-backed generation of layperson summaries and trend narratives.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::ModelError;
use crate::llm::LanguageModel;
use crate::prompt::{join_summaries, summary_template, trends_template, PromptTemplate};
use crate::TARGET_LLM_REQUEST;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Plain-language summary of a single abstract.
    async fn summarize(&self, abstract_text: &str) -> Result<String, ModelError>;

    /// Trend narrative written from summaries given in chronological order.
    async fn synthesize_trends(&self, summaries: &[String]) -> Result<String, ModelError>;
}

pub struct LlmOrchestrator {
    model: Arc<dyn LanguageModel>,
    summary_prompt: PromptTemplate,
    trend_prompt: PromptTemplate,
}

impl LlmOrchestrator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        LlmOrchestrator {
            model,
            summary_prompt: summary_template(),
            trend_prompt: trends_template(),
        }
    }
}

#[async_trait]
impl Summarizer for LlmOrchestrator {
    async fn summarize(&self, abstract_text: &str) -> Result<String, ModelError> {
        let summary = self
            .model
            .invoke(&self.summary_prompt, &[("abstract", abstract_text)])
            .await?;
        Ok(summary.trim().to_string())
    }

    async fn synthesize_trends(&self, summaries: &[String]) -> Result<String, ModelError> {
        let combined = join_summaries(summaries);
        debug!(target: TARGET_LLM_REQUEST, "Synthesizing trends from {} summaries ({} chars)", summaries.len(), combined.len());
        let narrative = self
            .model
            .invoke(&self.trend_prompt, &[("summaries", &combined)])
            .await?;
        Ok(narrative.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn test_summarize_sends_abstract_and_trims() {
        let model = Arc::new(ScriptedModel::replies(vec![Ok("  A short summary.  \n".to_string())]));
        let orchestrator = LlmOrchestrator::new(model.clone());

        let summary = orchestrator.summarize("Abstract about vaccines.").await.unwrap();

        assert_eq!(summary, "A short summary.");
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Abstract about vaccines."));
    }

    #[tokio::test]
    async fn test_synthesize_trends_joins_summaries_in_order() {
        let model = Arc::new(ScriptedModel::replies(vec![Ok("Narrative".to_string())]));
        let orchestrator = LlmOrchestrator::new(model.clone());

        let summaries = vec!["January finding".to_string(), "February finding".to_string()];
        let narrative = orchestrator.synthesize_trends(&summaries).await.unwrap();

        assert_eq!(narrative, "Narrative");
        assert!(model.prompts()[0].contains("January finding\n\nFebruary finding"));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::replies(vec![Err(ModelError::Timeout(120))]));
        let orchestrator = LlmOrchestrator::new(model);
        assert!(matches!(
            orchestrator.summarize("x").await,
            Err(ModelError::Timeout(120))
        ));
    }
}
