//! Error taxonomy shared by the source adapter, the LLM collaborator, the
//! fact-check engine and the stage drivers.

use thiserror::Error;

/// Failure talking to the literature search API.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {reason}")]
    InvalidBody { url: String, reason: String },

    #[error("literature client configuration error: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Network failures, rate limiting (429) and server errors (5xx) are worth
    /// another attempt. Other statuses will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::InvalidBody { .. } | TransportError::Configuration(_) => false,
        }
    }
}

/// Failure invoking the language model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model request timed out after {0} seconds")]
    Timeout(u64),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model configuration error: {0}")]
    Configuration(String),
}

/// The fact-check response could not be read as `{score, issues}`.
#[derive(Error, Debug)]
pub enum ScoreParseError {
    #[error("response is not valid JSON ({source}): {excerpt}")]
    InvalidJson {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum FactCheckError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Parse(#[from] ScoreParseError),
}

/// Failures that end a stage run.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    FactCheck(#[from] FactCheckError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_body_is_not_retryable() {
        let err = TransportError::InvalidBody {
            url: "http://example.test".to_string(),
            reason: "truncated".to_string(),
        };
        assert!(!err.is_retryable());

        let err = TransportError::Status {
            url: "http://example.test".to_string(),
            status: 503,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_rate_limit_and_server_statuses_are_retryable() {
        let status = |status| TransportError::Status {
            url: "http://example.test".to_string(),
            status,
        };
        for code in [429, 500, 502, 503, 504] {
            assert!(status(code).is_retryable(), "HTTP {} should be retried", code);
        }
        for code in [400, 401, 403, 404, 414] {
            assert!(!status(code).is_retryable(), "HTTP {} should not be retried", code);
        }
        assert!(!TransportError::Configuration("bad url".to_string()).is_retryable());
    }

    #[test]
    fn test_fact_check_error_is_transparent() {
        let err: FactCheckError = ModelError::EmptyResponse.into();
        assert_eq!(err.to_string(), "model returned an empty response");
    }
}
