//! Hand-written stand-ins for the collaborator traits, plus seeding helpers.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::db::Database;
use crate::error::{FactCheckError, ModelError, ScoreParseError, TransportError};
use crate::fact_check::{FactCheck, FactCheckResult};
use crate::llm::LanguageModel;
use crate::orchestrator::Summarizer;
use crate::pubmed::{ArticleRecord, SourceAdapter};

pub fn record(id: &str, title: &str, abstract_text: &str, date: Option<(i32, u32, u32)>) -> ArticleRecord {
    ArticleRecord {
        external_id: id.to_string(),
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        pub_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        raw_payload: json!({ "pmid": id, "title": title, "abstract": abstract_text }),
    }
}

/// Inserts the records and returns their article ids in the given order.
pub async fn seed_articles(db: &Database, records: &[ArticleRecord]) -> Vec<i64> {
    db.upsert_articles(records).await.unwrap();
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        let article = db
            .get_article_by_external_id(&record.external_id)
            .await
            .unwrap()
            .unwrap();
        ids.push(article.id);
    }
    ids
}

/// Inserts the records with a `Summary of '<abstract>'` summary each and
/// returns the summary ids in the given order.
pub async fn seed_summaries(db: &Database, records: &[ArticleRecord]) -> Vec<i64> {
    let article_ids = seed_articles(db, records).await;
    let mut summary_ids = Vec::with_capacity(records.len());
    for (article_id, record) in article_ids.into_iter().zip(records) {
        let text = format!("Summary of '{}'", record.abstract_text);
        summary_ids.push(db.create_summary(article_id, &text).await.unwrap().id);
    }
    summary_ids
}

/// Replays canned replies (or echoes the prompt) and records every prompt.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    echo: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn echo() -> Self {
        ScriptedModel {
            replies: Mutex::new(VecDeque::new()),
            echo: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: Vec<Result<String, ModelError>>) -> Self {
        ScriptedModel {
            replies: Mutex::new(replies.into()),
            echo: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.echo {
            return Ok(prompt.to_string());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse))
    }
}

/// Summarizes as `Summary of '<abstract>'` and narrates as `Trends across N summaries`.
#[derive(Default)]
pub struct StubSummarizer {
    failing_abstracts: HashSet<String>,
    fail_trends: bool,
    summarized: Mutex<Vec<String>>,
    trend_inputs: Mutex<Vec<Vec<String>>>,
}

impl StubSummarizer {
    pub fn new() -> Self {
        StubSummarizer::default()
    }

    pub fn failing_on(mut self, abstract_text: &str) -> Self {
        self.failing_abstracts.insert(abstract_text.to_string());
        self
    }

    pub fn failing_trends(mut self) -> Self {
        self.fail_trends = true;
        self
    }

    /// Abstracts passed to `summarize`, in call order.
    pub fn summarized(&self) -> Vec<String> {
        self.summarized.lock().unwrap().clone()
    }

    pub fn trend_inputs(&self) -> Vec<Vec<String>> {
        self.trend_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, abstract_text: &str) -> Result<String, ModelError> {
        self.summarized.lock().unwrap().push(abstract_text.to_string());
        if self.failing_abstracts.contains(abstract_text) {
            return Err(ModelError::Request("stub summarizer failure".to_string()));
        }
        Ok(format!("Summary of '{}'", abstract_text))
    }

    async fn synthesize_trends(&self, summaries: &[String]) -> Result<String, ModelError> {
        self.trend_inputs.lock().unwrap().push(summaries.to_vec());
        if self.fail_trends {
            return Err(ModelError::Timeout(120));
        }
        Ok(format!("Trends across {} summaries", summaries.len()))
    }
}

/// Returns a fixed result, or a parse error for chosen candidate texts.
pub struct StubFactChecker {
    result: FactCheckResult,
    failing_candidates: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubFactChecker {
    pub fn returning(score: f64, issues: &[&str]) -> Self {
        StubFactChecker {
            result: FactCheckResult {
                score,
                issues: issues.iter().map(|issue| issue.to_string()).collect(),
            },
            failing_candidates: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, candidate_text: &str) -> Self {
        self.failing_candidates.insert(candidate_text.to_string());
        self
    }

    /// `(candidate, source)` pairs, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FactCheck for StubFactChecker {
    async fn score(
        &self,
        candidate_text: &str,
        source_text: &str,
    ) -> Result<FactCheckResult, FactCheckError> {
        self.calls
            .lock()
            .unwrap()
            .push((candidate_text.to_string(), source_text.to_string()));
        if self.failing_candidates.contains(candidate_text) {
            return Err(ScoreParseError::NotAnObject.into());
        }
        Ok(self.result.clone())
    }
}

/// Serves canned records per period start date; unknown periods return nothing.
#[derive(Default)]
pub struct StubSource {
    responses: HashMap<NaiveDate, Vec<ArticleRecord>>,
    failing: HashSet<NaiveDate>,
    calls: Mutex<Vec<(NaiveDate, NaiveDate, u32)>>,
}

impl StubSource {
    pub fn new() -> Self {
        StubSource::default()
    }

    pub fn with_period(mut self, start: NaiveDate, records: Vec<ArticleRecord>) -> Self {
        self.responses.insert(start, records);
        self
    }

    pub fn failing_period(mut self, start: NaiveDate) -> Self {
        self.failing.insert(start);
        self
    }

    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    async fn fetch(
        &self,
        _query: &str,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, TransportError> {
        self.calls.lock().unwrap().push((start, end, limit));
        if self.failing.contains(&start) {
            return Err(TransportError::Status {
                url: "https://eutils.example.test/esearch.fcgi".to_string(),
                status: 503,
            });
        }
        let mut records = self.responses.get(&start).cloned().unwrap_or_default();
        records.truncate(limit as usize);
        Ok(records)
    }
}
