//! Type definitions for the PubMed source adapter.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Duration;

/// A normalized article as parsed from one `PubmedArticle` element.
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleRecord {
    /// PMID; empty when the record carries none.
    pub external_id: String,
    pub title: String,
    pub abstract_text: String,
    /// Absent when no date location in the record could be parsed.
    pub pub_date: Option<NaiveDate>,
    pub raw_payload: Value,
}

/// `esearch.fcgi?retmode=json` response body.
#[derive(Debug, Deserialize)]
pub struct ESearchResponse {
    #[serde(default)]
    pub esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
pub struct ESearchResult {
    #[serde(default)]
    pub idlist: Vec<String>,
}

/// Bounded exponential backoff for literature API calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_JITTER_MS: u64 = 250;
/// Date format the E-utilities `mindate`/`maxdate` parameters expect.
pub const EUTILS_DATE_FORMAT: &str = "%Y/%m/%d";
