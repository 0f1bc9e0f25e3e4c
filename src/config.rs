//! Explicit pipeline configuration.
//!
//! Built once at startup from the environment (and then from CLI flags) and
//! passed down by reference; nothing below `main` reads the environment.

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::fmt;
use std::time::Duration;

use crate::environment::{get_env_optional, get_env_string_or, get_env_var_or};
use crate::error::ModelError;
use crate::pubmed::RetryPolicy;
use crate::{LLMClient, LLMParams};

pub const DEFAULT_QUERY: &str = "Covid-19[Title] AND 2020[Date - Publication]";
pub const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_DATABASE_PATH: &str = "pubtrends.db";
pub const DEFAULT_YEAR: i32 = 2020;
pub const DEFAULT_PER_PERIOD: u32 = 30;
pub const DEFAULT_PERIODS: u32 = 12;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MIN_SUMMARIES: usize = 3;
pub const DEFAULT_MAX_SCORE: f64 = 0.3;

#[derive(Clone)]
pub enum LlmBackend {
    Ollama { host: String, port: u16 },
    OpenAI { api_key: Option<String> },
}

impl fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmBackend::Ollama { host, port } => f
                .debug_struct("Ollama")
                .field("host", host)
                .field("port", port)
                .finish(),
            LlmBackend::OpenAI { api_key } => f
                .debug_struct("OpenAI")
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    /// Used for summaries and the trend narrative.
    pub temperature: f32,
    /// Used by the fact-check engine.
    pub fact_check_temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            backend: LlmBackend::Ollama {
                host: "localhost".to_string(),
                port: 11434,
            },
            model: "llama3".to_string(),
            temperature: 0.7,
            fact_check_temperature: 0.0,
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = LlmConfig::default();
        let backend = match get_env_string_or("LLM_TYPE", "ollama")
            .to_lowercase()
            .as_str()
        {
            "openai" => LlmBackend::OpenAI {
                api_key: get_env_optional("OPENAI_API_KEY"),
            },
            _ => LlmBackend::Ollama {
                host: get_env_string_or("OLLAMA_HOST", "localhost"),
                port: get_env_var_or("OLLAMA_PORT", 11434),
            },
        };

        LlmConfig {
            backend,
            model: get_env_string_or("LLM_MODEL", &defaults.model),
            temperature: get_env_var_or("LLM_TEMPERATURE", defaults.temperature),
            fact_check_temperature: get_env_var_or(
                "FACT_CHECK_TEMPERATURE",
                defaults.fact_check_temperature,
            ),
            timeout: Duration::from_secs(get_env_var_or(
                "LLM_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
            max_retries: get_env_var_or("LLM_MAX_RETRIES", defaults.max_retries),
        }
    }

    /// Builds the client once; callers derive per-use temperatures from it.
    pub fn build_params(&self) -> Result<LLMParams, ModelError> {
        let llm_client = match &self.backend {
            LlmBackend::Ollama { host, port } => {
                let base_url = if host.starts_with("http://") || host.starts_with("https://") {
                    host.clone()
                } else {
                    format!("http://{}", host)
                };
                LLMClient::Ollama(Ollama::new(base_url, *port))
            }
            LlmBackend::OpenAI { api_key } => {
                let api_key = api_key.clone().ok_or_else(|| {
                    ModelError::Configuration(
                        "OPENAI_API_KEY must be set when LLM_TYPE is openai".to_string(),
                    )
                })?;
                let config = OpenAIConfig::new().with_api_key(api_key);
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
        };

        Ok(LLMParams {
            llm_client,
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: self.timeout,
            max_retries: self.max_retries.max(1),
        })
    }

    /// Same backend as [`build_params`](Self::build_params) at the fact-check temperature.
    pub fn build_fact_check_params(&self) -> Result<LLMParams, ModelError> {
        Ok(self
            .build_params()?
            .with_temperature(self.fact_check_temperature))
    }
}

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub query: String,
    pub base_url: String,
    pub year: i32,
    pub start_month: u32,
    /// Number of calendar months to fetch, starting at `start_month`.
    pub periods: u32,
    pub per_period: u32,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            query: DEFAULT_QUERY.to_string(),
            base_url: DEFAULT_PUBMED_BASE_URL.to_string(),
            year: DEFAULT_YEAR,
            start_month: 1,
            periods: DEFAULT_PERIODS,
            per_period: DEFAULT_PER_PERIOD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let defaults = FetchConfig::default();
        FetchConfig {
            query: get_env_string_or("PUBMED_QUERY", &defaults.query),
            base_url: get_env_string_or("PUBMED_BASE_URL", &defaults.base_url),
            year: get_env_var_or("FETCH_YEAR", defaults.year),
            start_month: get_env_var_or("FETCH_START_MONTH", defaults.start_month),
            periods: get_env_var_or("FETCH_PERIODS", defaults.periods),
            per_period: get_env_var_or("FETCH_PER_PERIOD", defaults.per_period),
            max_attempts: get_env_var_or("FETCH_MAX_ATTEMPTS", defaults.max_attempts),
            initial_backoff: Duration::from_millis(get_env_var_or(
                "FETCH_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SummarizeConfig {
    pub batch_size: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        SummarizeConfig {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ValidateConfig {
    /// Scores strictly above this emit a warning; the validation is still stored.
    pub warn_threshold: f64,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        ValidateConfig {
            warn_threshold: DEFAULT_WARN_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SynthesizeConfig {
    pub min_summaries: usize,
    pub max_score: f64,
}

impl Default for SynthesizeConfig {
    fn default() -> Self {
        SynthesizeConfig {
            min_summaries: DEFAULT_MIN_SUMMARIES,
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub database_path: String,
    pub llm: LlmConfig,
    pub fetch: FetchConfig,
    pub summarize: SummarizeConfig,
    pub validate: ValidateConfig,
    pub synthesize: SynthesizeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            llm: LlmConfig::default(),
            fetch: FetchConfig::default(),
            summarize: SummarizeConfig::default(),
            validate: ValidateConfig::default(),
            synthesize: SynthesizeConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        PipelineConfig {
            database_path: get_env_string_or("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            llm: LlmConfig::from_env(),
            fetch: FetchConfig::from_env(),
            summarize: SummarizeConfig {
                batch_size: get_env_var_or("SUMMARIZE_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            },
            validate: ValidateConfig {
                warn_threshold: get_env_var_or("VALIDATE_WARN_THRESHOLD", DEFAULT_WARN_THRESHOLD),
            },
            synthesize: SynthesizeConfig {
                min_summaries: get_env_var_or("SYNTHESIZE_MIN_SUMMARIES", DEFAULT_MIN_SUMMARIES),
                max_score: get_env_var_or("SYNTHESIZE_MAX_SCORE", DEFAULT_MAX_SCORE),
            },
        }
    }
}
