// Async HTTP client for the stockline inventory service.
//
// Every operation funnels through `InventoryClient::request`, which owns
// validation, rate limiting, the timeout, envelope normalization and the
// per-request log record. Endpoint wrappers live in `products.rs`,
// `inventory.rs` and `analytics.rs` as further `impl InventoryClient` blocks.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::envelope::{Envelope, body_preview};
use crate::error::Error;
use crate::query::QueryParams;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::request_log::{RequestLog, RequestOutcome, RequestRecord, TracingRequestLog};
use crate::transport::TransportConfig;

/// Async client for the inventory service REST API.
///
/// Cheap to share behind an `Arc`. Holds no retry state: callers that want
/// retries (the source resolver) drive them.
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    key_header: HeaderValue,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
    log: Arc<dyn RequestLog>,
}

impl std::fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InventoryClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` authenticating with `api_key`.
    ///
    /// Uses a fresh rate limiter with default limits and logs requests
    /// through `tracing`.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(HeaderMap::new())?;
        Self::from_reqwest(base_url, api_key, http, transport.timeout)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        api_key: &SecretString,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;

        let mut key_header =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Validation {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_header.set_sensitive(true);

        Ok(Self {
            http,
            base_url,
            api_key: api_key.clone(),
            key_header,
            timeout,
            limiter: Arc::new(RateLimiter::default()),
            log: Arc::new(TracingRequestLog),
        })
    }

    /// Share a rate limiter, e.g. across clients rebuilt for the same key.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the request log sink.
    pub fn with_request_log(mut self, log: Arc<dyn RequestLog>) -> Self {
        self.log = log;
        self
    }

    /// Base URL without a trailing slash; endpoints are appended verbatim.
    fn normalize_base_url(raw: &str) -> Result<String, Error> {
        let url = Url::parse(raw.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Validation {
                message: format!("unsupported URL scheme: {}", url.scheme()),
            });
        }
        Ok(url.as_str().trim_end_matches('/').to_owned())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    // ── Request primitive ────────────────────────────────────────────

    /// Issue one request and normalize the response into an [`Envelope`].
    ///
    /// Exactly one [`RequestRecord`] is written per call, whatever the
    /// outcome, including calls rejected before any network I/O.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &QueryParams,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, Error> {
        let started = Instant::now();
        let mut status = None;

        let result = self
            .execute(&method, endpoint, query, body, &mut status)
            .await;

        let outcome = match &result {
            Ok(_) => RequestOutcome::Completed {
                status: status.unwrap_or(200),
            },
            Err(e) => RequestOutcome::Failed {
                kind: e.kind(),
                status: e.status().or(status),
            },
        };
        self.record(&method, endpoint, outcome, started);

        result
    }

    fn record(&self, method: &Method, endpoint: &str, outcome: RequestOutcome, started: Instant) {
        self.log.record(RequestRecord {
            at: chrono::Utc::now(),
            method: method.to_string(),
            endpoint: endpoint.to_owned(),
            outcome,
            elapsed: started.elapsed(),
        });
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &Method,
        endpoint: &str,
        query: &QueryParams,
        body: Option<&serde_json::Value>,
        status_out: &mut Option<u16>,
    ) -> Result<Envelope<T>, Error> {
        if endpoint.is_empty() || !endpoint.starts_with('/') {
            return Err(Error::Validation {
                message: format!("endpoint must start with '/': {endpoint:?}"),
            });
        }
        if endpoint.len() > 1 && endpoint.split('/').skip(1).any(str::is_empty) {
            return Err(Error::Validation {
                message: format!("endpoint has an empty path segment: {endpoint:?}"),
            });
        }

        let admitted = self.limiter.check(self.api_key.expose_secret())?;

        let url = format!("{}{endpoint}", self.base_url);
        if query.is_empty() {
            debug!("{method} {url}");
        } else {
            debug!("{method} {url} params={:?}", query.as_pairs());
        }

        let mut req = self
            .http
            .request(method.clone(), &url)
            .headers(self.request_headers(admitted))
            .query(query.as_pairs());
        if let Some(body) = body {
            req = req.json(body);
        }

        let timeout_secs = self.timeout.as_secs() + u64::from(self.timeout.subsec_nanos() > 0);
        let send = async {
            let resp = req.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(self.timeout, send).await {
            Err(_elapsed) => return Err(Error::Timeout { timeout_secs }),
            Ok(Err(e)) if e.is_timeout() => return Err(Error::Timeout { timeout_secs }),
            Ok(Err(e)) => return Err(Error::Network(e)),
            Ok(Ok(pair)) => pair,
        };
        *status_out = Some(status.as_u16());

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Self::normalize(&text)?.decode()
    }

    fn request_headers(&self, admitted: RateLimitStatus) -> HeaderMap {
        let reset_at = chrono::Utc::now()
            + chrono::TimeDelta::from_std(admitted.reset_in).unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", self.key_header.clone());
        headers.insert("X-Rate-Limit-Remaining", admitted.remaining.into());
        headers.insert("X-Rate-Limit-Reset", reset_at.timestamp_millis().into());
        headers
    }

    /// Parse a 2xx body. An empty body (204) normalizes to `data: null`.
    fn normalize(text: &str) -> Result<Envelope<serde_json::Value>, Error> {
        if text.trim().is_empty() {
            return Ok(Envelope::ok(serde_json::Value::Null));
        }
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| Error::Parse {
            message: format!("{e} (body preview: {:?})", body_preview(text)),
            body: text.to_owned(),
        })?;
        Envelope::normalize(value)
    }

    // ── Typed helpers for the endpoint wrappers ──────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &QueryParams,
    ) -> Result<Envelope<T>, Error> {
        self.request(Method::GET, endpoint, query, None).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<Envelope<T>, Error> {
        let started = Instant::now();
        match serde_json::to_value(body) {
            Ok(body) => {
                self.request(method, endpoint, &QueryParams::new(), Some(&body))
                    .await
            }
            Err(e) => {
                let err = Error::Validation {
                    message: format!("request body is not serializable: {e}"),
                };
                let outcome = RequestOutcome::Failed {
                    kind: err.kind(),
                    status: None,
                };
                self.record(&method, endpoint, outcome, started);
                Err(err)
            }
        }
    }
}

/// Escape a caller-supplied id for use as one path segment.
///
/// An empty id yields an empty segment, which `request` rejects.
pub(crate) fn path_segment(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.trim().chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            ' ' => out.push_str("%20"),
            other => out.push(other),
        }
    }
    out
}
