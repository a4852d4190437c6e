// ── Runtime configuration ──
//
// These types describe how to reach the inventory service and how the
// resolver and the sync loop pace themselves. They never touch disk: the
// CLI builds them from a config profile and hands them in.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use stockline_api::{
    InventoryClient, RateLimitConfig, RateLimiter, RequestLog, TlsMode, TransportConfig,
};

use crate::error::CoreError;

// ── Remote service ───────────────────────────────────────────────────

/// Connection settings for one inventory service deployment.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Service base URL (e.g. `https://inventory.example.com`).
    pub base_url: Url,
    /// Static per-deployment API key.
    pub api_key: SecretString,
    /// TLS verification strategy.
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Client-side request budget per API key.
    pub rate_limit: RateLimitConfig,
}

impl RemoteConfig {
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            rate_limit: RateLimitConfig::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }

    /// Build a client that reports every request to `log`.
    pub fn build_client(&self, log: Arc<dyn RequestLog>) -> Result<InventoryClient, CoreError> {
        let client = InventoryClient::new(self.base_url.as_str(), &self.api_key, &self.transport())?
            .with_rate_limiter(Arc::new(RateLimiter::new(self.rate_limit)))
            .with_request_log(log);
        Ok(client)
    }
}

// ── Source resolver ──────────────────────────────────────────────────

/// Bounded exponential retry for remote producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total remote attempts per resolution, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failures` failed ones:
    /// `base * 2^failures`, so 2s then 4s with the defaults.
    pub fn delay_after(&self, failures: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(failures))
    }

    /// Whether another attempt is allowed after `failures` failed ones.
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub retry: RetryPolicy,
    /// Re-resolve periodically while data comes from the service.
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            auto_refresh: true,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

// ── Sync loop ────────────────────────────────────────────────────────

/// Which consecutive-error counts raise a user-facing notification.
///
/// Admits `n` when `n >= min_errors` and `n` is a multiple of `every`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorNotifyPolicy {
    pub min_errors: u32,
    pub every: u32,
}

impl Default for ErrorNotifyPolicy {
    fn default() -> Self {
        Self {
            min_errors: 2,
            every: 5,
        }
    }
}

impl ErrorNotifyPolicy {
    pub fn admits(&self, consecutive_errors: u32) -> bool {
        self.every != 0
            && consecutive_errors >= self.min_errors
            && consecutive_errors % self.every == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Run cycles automatically. Manual cycles work either way.
    pub enabled: bool,
    pub interval: Duration,
    /// Bound on one whole cycle, independent of the request timeout.
    pub cycle_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Automatic cycles stop once this many cycles failed in a row.
    pub max_consecutive_errors: u32,
    pub notify: ErrorNotifyPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            cycle_timeout: Duration::from_secs(15),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
            max_consecutive_errors: 10,
            notify: ErrorNotifyPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Extra-cycle delay after the `n`-th consecutive failure:
    /// `min(base * 2^(n-1), cap)`.
    pub fn backoff_for(&self, consecutive_errors: u32) -> Duration {
        let exp = consecutive_errors.saturating_sub(1);
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(exp))
            .min(self.backoff_cap)
    }

    /// Whether automatic cycles are suspended at this error count.
    pub fn is_halted(&self, consecutive_errors: u32) -> bool {
        consecutive_errors >= self.max_consecutive_errors
    }
}
