pub mod config;
pub mod db;
pub mod environment;
pub mod error;
pub mod fact_check;
pub mod inspect;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod pubmed;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::time::Duration;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_STAGE: &str = "stage";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// Everything needed to send one prompt to a model backend.
#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl LLMParams {
    /// Same backend and model, different sampling temperature.
    pub fn with_temperature(&self, temperature: f32) -> Self {
        LLMParams {
            temperature,
            ..self.clone()
        }
    }
}
