use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Top-level error type for the `stockline-api` crate.
///
/// Every failure of a remote call is classified into one of these variants
/// before it reaches the caller. `stockline-core` maps them into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Request shape ───────────────────────────────────────────────
    /// Malformed call, rejected before any network I/O.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// Client-side throttling. The request was never sent.
    #[error("Rate limit exceeded -- try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// Request exceeded its time bound and was aborted.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Transport failure (connection refused, DNS failure, reset, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Response ────────────────────────────────────────────────────
    /// Non-2xx response from the service.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A 2xx response whose body could not be decoded, with the raw body
    /// for debugging.
    #[error("Invalid JSON response from server: {message}")]
    Parse { message: String, body: String },

    /// The service answered `{success: false}` or omitted `data`.
    #[error("API request failed: {message}")]
    Api { message: String },
}

/// Coarse classification used by the request log and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    RateLimited,
    Timeout,
    Network,
    Http,
    Parse,
    Api,
    Config,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Api { .. } => ErrorKind::Api,
            Self::InvalidUrl(_) | Self::Tls(_) => ErrorKind::Config,
        }
    }

    /// HTTP status carried by this error, if any.
    ///
    /// Timeouts report 408 and rate-limit rejections 429, matching what the
    /// request log records for them.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(408),
            Self::RateLimited { .. } => Some(429),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
