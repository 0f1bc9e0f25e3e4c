//! Fact-check engine.
//!
//! Asks the model which statements in a candidate text are not supported by
//! a grounding source and turns the free-form reply into a [`FactCheckResult`].
//! The engine holds no state and performs no persistence.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{FactCheckError, ScoreParseError};
use crate::llm::{strip_thinking_tags, LanguageModel};
use crate::prompt::{fact_check_template, PromptTemplate};
use crate::TARGET_LLM_REQUEST;

/// Structured outcome of one fact-check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactCheckResult {
    /// Number (or magnitude) of unsupported claims.
    pub score: f64,
    /// The unsupported claims, in the order the model listed them.
    pub issues: Vec<String>,
}

impl FactCheckResult {
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

#[async_trait]
pub trait FactCheck: Send + Sync {
    async fn score(
        &self,
        candidate_text: &str,
        source_text: &str,
    ) -> Result<FactCheckResult, FactCheckError>;
}

pub struct FactChecker {
    model: Arc<dyn LanguageModel>,
    prompt: PromptTemplate,
}

impl FactChecker {
    /// `model` should be configured for deterministic output (temperature 0).
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        FactChecker {
            model,
            prompt: fact_check_template(),
        }
    }
}

#[async_trait]
impl FactCheck for FactChecker {
    async fn score(
        &self,
        candidate_text: &str,
        source_text: &str,
    ) -> Result<FactCheckResult, FactCheckError> {
        let response = self
            .model
            .invoke(
                &self.prompt,
                &[("source", source_text), ("candidate", candidate_text)],
            )
            .await?;

        let result = parse_fact_check_response(&response).map_err(|e| {
            error!(target: TARGET_LLM_REQUEST, "Failed to parse fact-check response: {}", e);
            e
        })?;
        debug!(target: TARGET_LLM_REQUEST, "Fact-check score {} with {} issues", result.score, result.issues.len());
        Ok(result)
    }
}

/// Parses a model reply of the form `{"score": <number>, "issues": [<string>...]}`.
///
/// Missing fields default to a zero score and no issues. Reasoning blocks,
/// Markdown code fences and prose around the outermost object are ignored.
pub fn parse_fact_check_response(response: &str) -> Result<FactCheckResult, ScoreParseError> {
    let cleaned = strip_thinking_tags(response);
    let body = extract_json_body(&cleaned);
    let json = parse_leading_value(body).map_err(|source| ScoreParseError::InvalidJson {
        excerpt: body.chars().take(200).collect(),
        source,
    })?;

    let object = json.as_object().ok_or(ScoreParseError::NotAnObject)?;

    let score = match object.get("score") {
        None | Some(Value::Null) => 0.0,
        Some(value) => parse_score(value)?,
    };

    let issues = match object.get("issues") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|issue| !issue.is_empty())
            .collect(),
        Some(other) => {
            return Err(ScoreParseError::InvalidField {
                field: "issues",
                reason: format!("expected a list, got {}", json_type(other)),
            })
        }
    };

    Ok(FactCheckResult { score, issues })
}

fn parse_score(value: &Value) -> Result<f64, ScoreParseError> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ScoreParseError::InvalidField {
        field: "score",
        reason: format!("expected a number, got {}", json_type(value)),
    })?;

    if !score.is_finite() || score < 0.0 {
        return Err(ScoreParseError::InvalidField {
            field: "score",
            reason: format!("{} is not a non-negative number", score),
        });
    }
    Ok(score)
}

/// Text from the first `{` on, or the whole unfenced reply if there is none.
fn extract_json_body(response: &str) -> &str {
    let unfenced = strip_code_fence(response.trim());
    match unfenced.find('{') {
        Some(start) => &unfenced[start..],
        None => unfenced,
    }
}

/// Parses the first JSON value in `body`; whatever follows it is ignored.
fn parse_leading_value(body: &str) -> Result<Value, serde_json::Error> {
    match serde_json::Deserializer::from_str(body)
        .into_iter::<Value>()
        .next()
    {
        Some(value) => value,
        None => serde_json::from_str(body),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
