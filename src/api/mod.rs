//! Semantic Scholar API access.
//!
//! This module defines the error taxonomy surfaced to callers and the
//! [`RetryPolicy`] that governs how rate-limited requests are re-issued.
//! The client itself lives in [`client`].

mod client;

pub use client::{
    PaperSearchQuery, SemanticScholar, BIBTEX_FIELDS, DEFAULT_AUTHOR_FIELDS, DEFAULT_PAPER_FIELDS,
};

use serde_json::{json, Map, Value};
use std::fmt;

/// API documentation URL appended to every serialized error.
pub const DOCUMENTATION_URL: &str = "https://api.semanticscholar.org/api-docs/";

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Resource does not exist (HTTP 404)
    NotFound,
    /// Malformed query parameters or field names (HTTP 400)
    BadRequest,
    /// Rate limit exceeded and retries exhausted or disabled (HTTP 429)
    RateLimited,
    /// Any other non-2xx response
    ApiError,
}

impl ErrorCode {
    /// Wire representation used in JSON error output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ApiError => "API_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned when the API rejects a request.
///
/// Immutable once constructed. A rate-limit error additionally carries the
/// `Retry-After` delay parsed from the response, when the server sent one.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
    pub status_code: Option<u16>,
    /// Seconds suggested by the `Retry-After` header on a 429 response.
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: "Resource not found".to_string(),
            suggestion: Some("Check the ID format or try searching instead".to_string()),
            status_code: Some(404),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::BadRequest,
            message: message.into(),
            suggestion: Some("Check query parameters and field names".to_string()),
            status_code: Some(400),
            retry_after: None,
        }
    }

    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        Self {
            code: ErrorCode::RateLimited,
            message: "Rate limit exceeded".to_string(),
            suggestion: Some("Wait a moment or use an API key for higher limits".to_string()),
            status_code: Some(429),
            retry_after,
        }
    }

    pub fn api_error(status: u16) -> Self {
        Self {
            code: ErrorCode::ApiError,
            message: format!("API returned status {}", status),
            suggestion: None,
            status_code: Some(status),
            retry_after: None,
        }
    }

    /// Serialize to the fixed JSON error shape:
    /// `{"error": {code, message, suggestion?, status_code?, documentation}}`.
    pub fn to_json(&self) -> Value {
        let mut error = Map::new();
        error.insert("code".to_string(), json!(self.code.as_str()));
        error.insert("message".to_string(), json!(self.message));
        if let Some(suggestion) = &self.suggestion {
            error.insert("suggestion".to_string(), json!(suggestion));
        }
        if let Some(status) = self.status_code {
            error.insert("status_code".to_string(), json!(status));
        }
        error.insert("documentation".to_string(), json!(DOCUMENTATION_URL));
        json!({ "error": error })
    }
}

/// Errors surfaced by the client.
///
/// API rejections are classified into [`ApiError`]; transport failures
/// (connect errors, timeouts, malformed success bodies) stay as the
/// underlying [`reqwest::Error`] and are not reclassified.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Progress report passed to the retry notification callback, once per
/// re-issued request.
#[derive(Debug, Clone, Copy)]
pub struct RetryStatus {
    /// Retry attempt number, starting at 1
    pub attempt: u32,
    /// Configured retry ceiling
    pub max_retries: u32,
    /// Seconds the client is about to sleep before re-issuing
    pub delay_secs: u64,
}

type RetryCallback = Box<dyn Fn(&RetryStatus) + Send + Sync>;

/// Policy applied when the API answers 429.
///
/// The attempt counter is local to a single logical call; nothing carries
/// over between calls. All other error classes are terminal on first
/// occurrence.
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    on_retry: Option<RetryCallback>,
}

impl RetryPolicy {
    /// Retry up to `max_retries` times.
    pub fn new(max_retries: u32) -> Self {
        Self {
            enabled: true,
            max_retries,
            on_retry: None,
        }
    }

    /// Fail immediately on the first 429.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            on_retry: None,
        }
    }

    /// Install a callback invoked once per retry attempt, before sleeping.
    pub fn with_callback(mut self, callback: impl Fn(&RetryStatus) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Box::new(callback));
        self
    }

    pub(crate) fn notify(&self, status: &RetryStatus) {
        if let Some(callback) = &self.on_retry {
            callback(status);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
