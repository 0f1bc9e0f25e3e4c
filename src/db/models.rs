//! Rows of the four persisted collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
    pub pub_date: Option<NaiveDate>,
    pub raw_payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub id: i64,
    pub article_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A summary joined with the article fields needed to check or report on it.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryWithSource {
    pub summary_id: i64,
    pub external_id: String,
    pub pub_date: Option<NaiveDate>,
    pub summary_text: String,
    pub abstract_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    pub id: i64,
    pub summary_id: i64,
    pub hallucination_score: f64,
    pub issues: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrendReport {
    pub id: i64,
    pub generated_at: DateTime<Utc>,
    pub text: String,
    pub issues: Vec<String>,
    pub hallucination_score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn verb(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "Created",
            UpsertOutcome::Updated => "Updated",
        }
    }
}

/// Row counts used by the status command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineCounts {
    pub articles: i64,
    pub summaries: i64,
    pub validations: i64,
    pub trend_reports: i64,
    pub pending_summaries: i64,
    pub pending_validations: i64,
}
