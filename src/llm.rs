use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::error::ModelError;
use crate::prompt::PromptTemplate;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

/// The language-model capability: prompt in, unstructured text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Renders `template` with `vars` and sends the result.
    async fn invoke(
        &self,
        template: &PromptTemplate,
        vars: &[(&str, &str)],
    ) -> Result<String, ModelError> {
        let prompt = template.render(vars);
        self.generate(&prompt).await
    }
}

/// A configured backend; retries and timeouts come from its `LLMParams`.
#[derive(Clone, Debug)]
pub struct LlmModel {
    params: LLMParams,
}

impl LlmModel {
    pub fn new(params: LLMParams) -> Self {
        LlmModel { params }
    }

    pub fn params(&self) -> &LLMParams {
        &self.params
    }
}

#[async_trait]
impl LanguageModel for LlmModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        generate_llm_response(prompt, &self.params).await
    }
}

/// Sends `prompt` to the configured backend, retrying with exponential backoff.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Result<String, ModelError> {
    let max_retries = params.max_retries.max(1);
    let mut backoff = 2;
    let mut last_error = ModelError::EmptyResponse;

    debug!(target: TARGET_LLM_REQUEST, "Starting LLM response generation with model {}", params.model);

    for retry_count in 0..max_retries {
        debug!(target: TARGET_LLM_REQUEST, "Sending LLM request ({} chars)", prompt.len());

        match timeout(params.timeout, send_request(prompt, params)).await {
            Ok(Ok(response)) => {
                let cleaned = strip_thinking_tags(&response);
                if cleaned.is_empty() {
                    warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response");
                    last_error = ModelError::EmptyResponse;
                } else {
                    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", cleaned);
                    return Ok(cleaned);
                }
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
                last_error = e;
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out");
                last_error = ModelError::Timeout(params.timeout.as_secs());
            }
        }

        if retry_count < max_retries - 1 {
            info!(target: TARGET_LLM_REQUEST, "Retrying LLM request... ({}/{})", retry_count + 1, max_retries);
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(target: TARGET_LLM_REQUEST, "Failed to generate response after {} attempts: {}", max_retries, last_error);
    Err(last_error)
}

async fn send_request(prompt: &str, params: &LLMParams) -> Result<String, ModelError> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let request = GenerationRequest::new(params.model.clone(), prompt.to_string())
                .options(GenerationOptions::default().temperature(params.temperature));
            ollama
                .generate(request)
                .await
                .map(|response| response.response)
                .map_err(|e| ModelError::Request(e.to_string()))
        }
        LLMClient::OpenAI(client) => {
            let message = ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ModelError::Request(e.to_string()))?;
            let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages(messages)
                .build()
                .map_err(|e| ModelError::Request(e.to_string()))?;
            let response = client
                .chat()
                .create(request)
                .await
                .map_err(|e| ModelError::Request(e.to_string()))?;
            Ok(response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default())
        }
    }
}

fn thinking_tags() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"))
}

/// Strips `<think>...</think>` blocks emitted by reasoning models and trims.
pub fn strip_thinking_tags(text: &str) -> String {
    thinking_tags().replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn test_strip_thinking_tags() {
        assert_eq!(
            strip_thinking_tags("<think>\nplan the answer\n</think>\n  The answer."),
            "The answer."
        );
        assert_eq!(strip_thinking_tags("  plain  "), "plain");
        assert_eq!(strip_thinking_tags("<think>only thoughts</think>"), "");
    }

    #[tokio::test]
    async fn test_invoke_renders_template_before_generating() {
        let model = ScriptedModel::echo();
        let template = PromptTemplate::new("Abstract:\n{abstract}\nEnd");
        let output = model
            .invoke(&template, &[("abstract", "Masks reduce spread.")])
            .await
            .unwrap();
        assert_eq!(output, "Abstract:\nMasks reduce spread.\nEnd");
    }
}
