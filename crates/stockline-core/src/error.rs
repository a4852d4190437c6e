// ── Core error types ──
//
// Domain-level errors from stockline-core. The resolver and the sync loop
// absorb remote failures into their state; these errors surface only from
// operations a caller drives directly (connection tests, one-shot reads,
// persistence). `From<stockline_api::Error>` translates transport errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("No inventory service configured")]
    NotConfigured,

    #[error("Cannot connect to inventory service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Inventory service timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Request rejected by inventory service: {message}")]
    Rejected { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<stockline_api::Error> for CoreError {
    fn from(err: stockline_api::Error) -> Self {
        use stockline_api::Error as Api;

        match err {
            Api::Validation { message } => CoreError::ValidationFailed { message },
            Api::RateLimited { retry_after_secs } => CoreError::RateLimited { retry_after_secs },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Network(ref e) if e.is_timeout() => CoreError::Timeout { timeout_secs: 0 },
            Api::Network(ref e) if e.is_connect() => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            Api::Network(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Http { status: 401 | 403, body } => CoreError::AuthenticationFailed {
                message: if body.is_empty() {
                    "API key rejected".into()
                } else {
                    body
                },
            },
            Api::Http { status: 404, body } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: body,
            },
            Api::Http { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            Api::Parse { message, body: _ } => {
                CoreError::Internal(format!("Invalid response from server: {message}"))
            }
            Api::Api { message } => CoreError::Rejected { message },
        }
    }
}

impl CoreError {
    /// Attach the entity type and identifier a caller was looking up to a
    /// generic not-found error.
    pub fn for_entity(self, entity_type: &str, identifier: &str) -> Self {
        match self {
            CoreError::NotFound { .. } => CoreError::NotFound {
                entity_type: entity_type.into(),
                identifier: identifier.into(),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_map_to_domain_errors() {
        let auth: CoreError = stockline_api::Error::Http {
            status: 401,
            body: String::new(),
        }
        .into();
        assert!(matches!(auth, CoreError::AuthenticationFailed { .. }));

        let missing: CoreError = stockline_api::Error::Http {
            status: 404,
            body: "gone".into(),
        }
        .into();
        let missing = missing.for_entity("product", "prod-404");
        assert_eq!(missing.to_string(), "Not found: product prod-404");

        let server: CoreError = stockline_api::Error::Http {
            status: 503,
            body: String::new(),
        }
        .into();
        assert!(matches!(server, CoreError::Api { status: Some(503), .. }));
    }

    #[test]
    fn unsuccessful_envelope_is_rejection() {
        let err: CoreError = stockline_api::Error::Api {
            message: "sku already exists".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::Rejected { ref message } if message == "sku already exists"
        ));
    }
}
