//! HTTP access to the NCBI E-utilities search and fetch endpoints.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use reqwest::header;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use url::Url;

use super::parser::parse_efetch_xml;
use super::types::{
    ArticleRecord, ESearchResponse, RetryPolicy, EUTILS_DATE_FORMAT, MAX_JITTER_MS,
    REQUEST_TIMEOUT,
};
use crate::error::TransportError;
use crate::TARGET_WEB_REQUEST;

/// A literature database that can be searched by query and date range.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Returns at most `limit` records published between `start` and `end`
    /// (inclusive), or an empty list when nothing matches.
    async fn fetch(
        &self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, TransportError>;
}

pub struct PubMedClient {
    http: reqwest::Client,
    esearch_url: Url,
    efetch_url: Url,
    retry: RetryPolicy,
}

impl PubMedClient {
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, TransportError> {
        let invalid_base = |e: url::ParseError| {
            TransportError::Configuration(format!("invalid base URL {:?}: {}", base_url, e))
        };
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).map_err(invalid_base)?;
        let http = reqwest::Client::builder()
            .gzip(true)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pubtrends/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        debug!(target: TARGET_WEB_REQUEST, "Created PubMed client for {}", base);

        Ok(PubMedClient {
            http,
            esearch_url: base.join("esearch.fcgi").map_err(invalid_base)?,
            efetch_url: base.join("efetch.fcgi").map_err(invalid_base)?,
            retry,
        })
    }

    /// ESearch request for ids published between `start` and `end`.
    fn search_request_url(&self, query: &str, start: NaiveDate, end: NaiveDate, limit: u32) -> Url {
        let mut url = self.esearch_url.clone();
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("term", query)
            .append_pair("datetype", "pdat")
            .append_pair("mindate", &start.format(EUTILS_DATE_FORMAT).to_string())
            .append_pair("maxdate", &end.format(EUTILS_DATE_FORMAT).to_string())
            .append_pair("retmax", &limit.to_string())
            .append_pair("retmode", "json");
        url
    }

    /// EFetch request for the full XML records of `ids`.
    fn fetch_request_url(&self, ids: &[String]) -> Url {
        let mut url = self.efetch_url.clone();
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", &ids.join(","))
            .append_pair("retmode", "xml");
        url
    }

    async fn search_ids(
        &self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<String>, TransportError> {
        let url = self.search_request_url(query, start, end, limit);
        let body = with_retry(url.as_str(), &self.retry, || self.get_text(&url)).await?;
        parse_esearch_body(&body, limit).map_err(|e| TransportError::InvalidBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_records(&self, ids: &[String]) -> Result<Vec<ArticleRecord>, TransportError> {
        let url = self.fetch_request_url(ids);
        let body = with_retry(url.as_str(), &self.retry, || self.get_text(&url)).await?;
        parse_efetch_xml(&body).map_err(|e| TransportError::InvalidBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        debug!(target: TARGET_WEB_REQUEST, "GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/json, application/xml, text/xml, */*;q=0.8")
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SourceAdapter for PubMedClient {
    async fn fetch(
        &self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, TransportError> {
        let ids = self.search_ids(query, start, end, limit).await?;
        if ids.is_empty() {
            info!(target: TARGET_WEB_REQUEST, "No PubMed ids between {} and {}", start, end);
            return Ok(Vec::new());
        }

        info!(target: TARGET_WEB_REQUEST, "Fetching {} PubMed records between {} and {}", ids.len(), start, end);
        self.fetch_records(&ids).await
    }
}

/// Reads the id list from an ESearch JSON body, keeping at most `limit` ids.
pub fn parse_esearch_body(body: &str, limit: u32) -> Result<Vec<String>, serde_json::Error> {
    let response: ESearchResponse = serde_json::from_str(body)?;
    let mut ids = response.esearchresult.idlist;
    ids.truncate(limit as usize);
    Ok(ids)
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is used up. The wait doubles after every failure.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                warn!(target: TARGET_WEB_REQUEST, "Giving up on {} after {} attempt(s): {}", label, attempt, err);
                return Err(err);
            }
            Err(err) => {
                // Jitter keeps repeated runs from hitting the API in lockstep.
                let jitter = Duration::from_millis(rand::rng().random_range(0..=MAX_JITTER_MS));
                let delay = backoff + jitter;
                warn!(
                    target: TARGET_WEB_REQUEST,
                    "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
                    attempt, max_attempts, label, err, delay
                );
                sleep(delay).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
