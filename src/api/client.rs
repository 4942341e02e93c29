//! Retry-aware Semantic Scholar client.
//!
//! Every public operation is a thin parameter layer over one request
//! primitive that builds the query, dispatches, and classifies the
//! response. Rate-limited requests (HTTP 429) are re-issued per the
//! configured [`RetryPolicy`]; all other failures are terminal.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;

use crate::api::{ApiError, ClientError, RetryPolicy, RetryStatus};

const GRAPH_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const RECOMMENDATIONS_API_BASE: &str = "https://api.semanticscholar.org/recommendations/v1";
const DATASETS_API_BASE: &str = "https://api.semanticscholar.org/datasets/v1";

/// Default fields requested for paper endpoints.
pub const DEFAULT_PAPER_FIELDS: &str =
    "paperId,title,year,authors,citationCount,abstract,venue,openAccessPdf,externalIds";

/// Default fields requested for author endpoints.
pub const DEFAULT_AUTHOR_FIELDS: &str =
    "authorId,name,affiliations,paperCount,citationCount,hIndex";

/// Field set covering everything the BibTeX formatter can use.
pub const BIBTEX_FIELDS: &str =
    "paperId,title,year,authors,venue,externalIds,journal,publicationVenue,abstract,openAccessPdf";

// Per-endpoint API ceilings; requests are clamped, never rejected.
const MAX_SEARCH_LIMIT: usize = 100;
const MAX_LISTING_LIMIT: usize = 1000;
const MAX_BATCH_IDS: usize = 500;
const MAX_RECOMMENDATION_LIMIT: usize = 500;

/// Sleep applied on a 429 that carries no usable Retry-After header.
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Filters for the paper relevance-search endpoint.
///
/// Optional filters are only put on the wire when set; `open_access_pdf`
/// becomes a presence-only parameter with an empty value.
#[derive(Debug, Clone)]
pub struct PaperSearchQuery {
    /// Keyword query string
    pub query: String,
    /// Comma-separated fields to return (default: [`DEFAULT_PAPER_FIELDS`])
    pub fields: Option<String>,
    /// Number of results (clamped to the API maximum of 100)
    pub limit: usize,
    /// Pagination offset
    pub offset: usize,
    /// Year or range, e.g. "2023" or "2020-2023"
    pub year: Option<String>,
    /// Venue name filter
    pub venue: Option<String>,
    /// Comma-separated fields of study
    pub fields_of_study: Option<String>,
    /// Minimum citation count
    pub min_citation_count: Option<u64>,
    /// Only papers with a freely available PDF
    pub open_access_pdf: bool,
    /// Comma-separated publication types
    pub publication_types: Option<String>,
}

impl Default for PaperSearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            fields: None,
            limit: 10,
            offset: 0,
            year: None,
            venue: None,
            fields_of_study: None,
            min_citation_count: None,
            open_access_pdf: false,
            publication_types: None,
        }
    }
}

impl PaperSearchQuery {
    /// Create a query with default pagination and no filters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Client for the Semantic Scholar graph, recommendations, and datasets APIs.
///
/// One instance owns one connection pool; the pool is released when the
/// client is dropped, on every exit path. Construct one per logical
/// session and pass it to consumers rather than sharing process-wide
/// state.
#[derive(Debug)]
pub struct SemanticScholar {
    http: Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    graph_base: String,
    recommendations_base: String,
    datasets_base: String,
}

impl SemanticScholar {
    /// Create a client with a 30 second timeout and the default retry
    /// policy. Falls back to the `S2_API_KEY` environment variable when no
    /// key is given; a missing key only affects rate limits.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_options(api_key, Duration::from_secs(30), RetryPolicy::default())
    }

    /// Create a client with an explicit timeout and retry policy.
    pub fn with_options(api_key: Option<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        let api_key = api_key.or_else(|| std::env::var("S2_API_KEY").ok());
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_key,
            retry,
            graph_base: GRAPH_API_BASE.to_string(),
            recommendations_base: RECOMMENDATIONS_API_BASE.to_string(),
            datasets_base: DATASETS_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host. The standard prefixes
    /// (`/graph/v1`, `/recommendations/v1`, `/datasets/v1`) are appended to
    /// `base`. Used by tests and proxy setups.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.graph_base = format!("{}/graph/v1", base);
        self.recommendations_base = format!("{}/recommendations/v1", base);
        self.datasets_base = format!("{}/datasets/v1", base);
        self
    }

    // ========== PAPER ENDPOINTS ==========

    /// Search for papers by keyword.
    pub fn search_papers(&self, query: &PaperSearchQuery) -> Result<Value, ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.query.clone()),
            ("fields", fields_or(query.fields.as_deref(), DEFAULT_PAPER_FIELDS)),
            ("limit", query.limit.min(MAX_SEARCH_LIMIT).to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(year) = &query.year {
            params.push(("year", year.clone()));
        }
        if let Some(venue) = &query.venue {
            params.push(("venue", venue.clone()));
        }
        if let Some(fields_of_study) = &query.fields_of_study {
            params.push(("fieldsOfStudy", fields_of_study.clone()));
        }
        if let Some(min_citations) = query.min_citation_count {
            params.push(("minCitationCount", min_citations.to_string()));
        }
        if query.open_access_pdf {
            // Presence-only flag: the API expects the bare parameter
            params.push(("openAccessPdf", String::new()));
        }
        if let Some(types) = &query.publication_types {
            params.push(("publicationTypes", types.clone()));
        }

        let url = format!("{}/paper/search", self.graph_base);
        self.request(Method::GET, &url, &params, None)
    }

    /// Get details for a single paper by S2 ID, DOI, arXiv ID, or CorpusId.
    pub fn get_paper(&self, paper_id: &str, fields: Option<&str>) -> Result<Value, ClientError> {
        let params = [("fields", fields_or(fields, DEFAULT_PAPER_FIELDS))];
        let url = format!("{}/paper/{}", self.graph_base, encode_id(paper_id));
        self.request(Method::GET, &url, &params, None)
    }

    /// Get details for multiple papers via the batch endpoint. At most 500
    /// IDs are sent; the rest are dropped.
    pub fn get_papers_batch(
        &self,
        paper_ids: &[String],
        fields: Option<&str>,
    ) -> Result<Value, ClientError> {
        let params = [("fields", fields_or(fields, DEFAULT_PAPER_FIELDS))];
        let ids = &paper_ids[..paper_ids.len().min(MAX_BATCH_IDS)];
        let body = json!({ "ids": ids });
        let url = format!("{}/paper/batch", self.graph_base);
        self.request(Method::POST, &url, &params, Some(&body))
    }

    /// Get papers citing this paper.
    pub fn get_paper_citations(
        &self,
        paper_id: &str,
        fields: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Value, ClientError> {
        let url = format!("{}/paper/{}/citations", self.graph_base, encode_id(paper_id));
        self.request(Method::GET, &url, &listing_params(fields, limit, offset), None)
    }

    /// Get papers cited by this paper.
    pub fn get_paper_references(
        &self,
        paper_id: &str,
        fields: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Value, ClientError> {
        let url = format!("{}/paper/{}/references", self.graph_base, encode_id(paper_id));
        self.request(Method::GET, &url, &listing_params(fields, limit, offset), None)
    }

    // ========== AUTHOR ENDPOINTS ==========

    /// Search for authors by name.
    pub fn search_authors(
        &self,
        query: &str,
        fields: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Value, ClientError> {
        let params = [
            ("query", query.to_string()),
            ("fields", fields_or(fields, DEFAULT_AUTHOR_FIELDS)),
            ("limit", limit.min(MAX_LISTING_LIMIT).to_string()),
            ("offset", offset.to_string()),
        ];
        let url = format!("{}/author/search", self.graph_base);
        self.request(Method::GET, &url, &params, None)
    }

    /// Get details for a single author.
    pub fn get_author(&self, author_id: &str, fields: Option<&str>) -> Result<Value, ClientError> {
        let params = [("fields", fields_or(fields, DEFAULT_AUTHOR_FIELDS))];
        let url = format!("{}/author/{}", self.graph_base, author_id);
        self.request(Method::GET, &url, &params, None)
    }

    /// Get papers written by an author.
    pub fn get_author_papers(
        &self,
        author_id: &str,
        fields: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Value, ClientError> {
        let url = format!("{}/author/{}/papers", self.graph_base, author_id);
        self.request(Method::GET, &url, &listing_params(fields, limit, offset), None)
    }

    // ========== RECOMMENDATION ENDPOINTS ==========

    /// Get recommendations seeded by a single paper. `pool` selects the
    /// candidate pool, "recent" or "all-cs".
    pub fn get_recommendations(
        &self,
        paper_id: &str,
        fields: Option<&str>,
        limit: usize,
        pool: &str,
    ) -> Result<Value, ClientError> {
        let params = [
            ("fields", fields_or(fields, DEFAULT_PAPER_FIELDS)),
            ("limit", limit.min(MAX_RECOMMENDATION_LIMIT).to_string()),
            ("from", pool.to_string()),
        ];
        let url = format!(
            "{}/papers/forpaper/{}",
            self.recommendations_base,
            encode_id(paper_id)
        );
        self.request(Method::GET, &url, &params, None)
    }

    /// Get recommendations from positive and negative example papers.
    pub fn get_recommendations_multi(
        &self,
        positive_paper_ids: &[String],
        negative_paper_ids: &[String],
        fields: Option<&str>,
        limit: usize,
    ) -> Result<Value, ClientError> {
        let params = [
            ("fields", fields_or(fields, DEFAULT_PAPER_FIELDS)),
            ("limit", limit.min(MAX_RECOMMENDATION_LIMIT).to_string()),
        ];
        let mut body = json!({ "positivePaperIds": positive_paper_ids });
        if !negative_paper_ids.is_empty() {
            body["negativePaperIds"] = json!(negative_paper_ids);
        }
        let url = format!("{}/papers/", self.recommendations_base);
        self.request(Method::POST, &url, &params, Some(&body))
    }

    // ========== DATASET ENDPOINTS ==========

    /// List available dataset release IDs.
    pub fn list_releases(&self) -> Result<Value, ClientError> {
        let url = format!("{}/release/", self.datasets_base);
        self.request(Method::GET, &url, &[], None)
    }

    /// Get the datasets contained in a release.
    pub fn get_release(&self, release_id: &str) -> Result<Value, ClientError> {
        let url = format!("{}/release/{}", self.datasets_base, release_id);
        self.request(Method::GET, &url, &[], None)
    }

    /// Get download links for a dataset within a release.
    pub fn get_dataset_links(
        &self,
        release_id: &str,
        dataset_name: &str,
    ) -> Result<Value, ClientError> {
        let url = format!(
            "{}/release/{}/dataset/{}",
            self.datasets_base, release_id, dataset_name
        );
        self.request(Method::GET, &url, &[], None)
    }

    /// Build, dispatch, and classify one logical request, re-issuing it on
    /// 429 per the retry policy.
    fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        run_with_retry(&self.retry, || {
            tracing::debug!(%method, url, "dispatching request");
            let mut request = self.http.request(method.clone(), url);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(key) = &self.api_key {
                request = request.header("x-api-key", key);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            classify(request.send()?)
        })
    }
}

/// What a single dispatch produced: either a final answer (success or a
/// terminal error via `Err`) or a rate-limit signal the retry loop may act
/// on.
enum Dispatch {
    Body(Value),
    RateLimited(Option<u64>),
}

/// Map a response onto the error taxonomy.
fn classify(response: Response) -> Result<Dispatch, ClientError> {
    let status = response.status().as_u16();
    match status {
        200 => Ok(Dispatch::Body(response.json()?)),
        404 => Err(ApiError::not_found().into()),
        400 => {
            // Use the server's message when the body is parseable JSON
            let message = response
                .json::<Value>()
                .ok()
                .and_then(|body| {
                    body.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| "Bad request".to_string());
            Err(ApiError::bad_request(message).into())
        }
        429 => Ok(Dispatch::RateLimited(parse_retry_after(response.headers()))),
        other => Err(ApiError::api_error(other).into()),
    }
}

/// Bounded retry loop around one logical call. The counter and delay live
/// here and nowhere else.
fn run_with_retry<F>(policy: &RetryPolicy, mut send: F) -> Result<Value, ClientError>
where
    F: FnMut() -> Result<Dispatch, ClientError>,
{
    let mut attempt: u32 = 0;
    loop {
        match send()? {
            Dispatch::Body(value) => return Ok(value),
            Dispatch::RateLimited(retry_after) => {
                if !policy.enabled || attempt >= policy.max_retries {
                    return Err(ApiError::rate_limited(retry_after).into());
                }
                attempt += 1;
                let delay_secs = retry_after.unwrap_or(DEFAULT_RETRY_DELAY_SECS);
                let status = RetryStatus {
                    attempt,
                    max_retries: policy.max_retries,
                    delay_secs,
                };
                policy.notify(&status);
                tracing::debug!(attempt, delay_secs, "rate limited, retrying");
                thread::sleep(Duration::from_secs(delay_secs));
            }
        }
    }
}

/// Parse a Retry-After header as whole seconds. Absent or non-numeric
/// values are treated as unknown.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

/// Percent-encode an identifier while keeping the `:` separator of
/// compound ID schemes (`DOI:...`, `ARXIV:...`) literal, so DOIs with
/// slashes survive the path.
fn encode_id(id: &str) -> String {
    urlencoding::encode(id).replace("%3A", ":")
}

fn fields_or(fields: Option<&str>, default: &str) -> String {
    fields.unwrap_or(default).to_string()
}

fn listing_params(fields: Option<&str>, limit: usize, offset: usize) -> [(&'static str, String); 3] {
    [
        ("fields", fields_or(fields, DEFAULT_PAPER_FIELDS)),
        ("limit", limit.min(MAX_LISTING_LIMIT).to_string()),
        ("offset", offset.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorCode;
    use reqwest::header::HeaderValue;
    use std::cell::RefCell;

    #[test]
    fn encode_id_preserves_compound_scheme_separator() {
        assert_eq!(encode_id("ARXIV:2106.12345"), "ARXIV:2106.12345");
        assert_eq!(encode_id("DOI:10.18653/v1/N18-3011"), "DOI:10.18653%2Fv1%2FN18-3011");
        assert_eq!(
            encode_id("649def34f8be52c8b66281af98ae884c09aef38b"),
            "649def34f8be52c8b66281af98ae884c09aef38b"
        );
    }

    #[test]
    fn parse_retry_after_integer() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(30));
    }

    #[test]
    fn parse_retry_after_missing_or_invalid() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("invalid"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn retry_reissues_until_success() {
        let calls = RefCell::new(0u32);
        let policy = RetryPolicy::new(1);

        let result = run_with_retry(&policy, || {
            *calls.borrow_mut() += 1;
            if *calls.borrow() == 1 {
                Ok(Dispatch::RateLimited(Some(0)))
            } else {
                Ok(Dispatch::Body(serde_json::json!({"paperId": "123"})))
            }
        })
        .unwrap();

        assert_eq!(result["paperId"], "123");
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn retry_gives_up_after_max_retries() {
        let calls = RefCell::new(0u32);
        let policy = RetryPolicy::new(2);

        let result = run_with_retry(&policy, || {
            *calls.borrow_mut() += 1;
            Ok(Dispatch::RateLimited(Some(0)))
        });

        // Initial attempt + 2 retries = 3 requests
        assert_eq!(*calls.borrow(), 3);
        match result {
            Err(ClientError::Api(error)) => {
                assert_eq!(error.code, ErrorCode::RateLimited);
                assert_eq!(error.retry_after, Some(0));
            }
            other => panic!("expected rate limit error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn retry_disabled_fails_on_first_429() {
        let calls = RefCell::new(0u32);
        let policy = RetryPolicy::disabled();

        let result = run_with_retry(&policy, || {
            *calls.borrow_mut() += 1;
            Ok(Dispatch::RateLimited(Some(60)))
        });

        assert_eq!(*calls.borrow(), 1);
        match result {
            Err(ClientError::Api(error)) => assert_eq!(error.retry_after, Some(60)),
            other => panic!("expected rate limit error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn retry_notifies_callback_each_attempt() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let notified = Arc::new(AtomicU32::new(0));
        let policy = {
            let notified = notified.clone();
            RetryPolicy::new(2).with_callback(move |_| {
                notified.fetch_add(1, Ordering::SeqCst);
            })
        };

        let result = run_with_retry(&policy, || Ok(Dispatch::RateLimited(Some(0))));
        assert!(result.is_err());
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn terminal_errors_are_not_retried() {
        let calls = RefCell::new(0u32);
        let policy = RetryPolicy::new(3);

        let result = run_with_retry(&policy, || {
            *calls.borrow_mut() += 1;
            Err(ApiError::not_found().into())
        });

        assert_eq!(*calls.borrow(), 1);
        assert!(matches!(result, Err(ClientError::Api(e)) if e.code == ErrorCode::NotFound));
    }
}
