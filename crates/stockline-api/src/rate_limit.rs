// Client-side request throttling
//
// Fixed windows keyed by credential. A rejected request is never sent and
// never counted. The check-and-increment runs under the DashMap shard
// lock for the credential, so concurrent callers cannot overshoot `limit`.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::Error;

/// Limits applied per credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 1000,
            window: Duration::from_secs(3600),
        }
    }
}

/// Snapshot of a credential's window after an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Requests still allowed in the current window.
    pub remaining: u32,
    /// Time until the window resets.
    pub reset_in: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed-window rate limiter shared by every request of a client.
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Admit or reject one request for `credential`.
    ///
    /// Returns [`Error::RateLimited`] with the whole seconds left until the
    /// window resets when the window is exhausted.
    pub fn check(&self, credential: &str) -> Result<RateLimitStatus, Error> {
        let now = Instant::now();
        let mut window = self
            .windows
            .entry(credential.to_owned())
            .or_insert(Window {
                start: now,
                count: 0,
            });

        if now >= window.start + self.config.window {
            window.start = now;
            window.count = 0;
        }

        let reset_in = (window.start + self.config.window).saturating_duration_since(now);

        if window.count >= self.config.limit {
            return Err(Error::RateLimited {
                retry_after_secs: ceil_secs(reset_in),
            });
        }

        window.count += 1;
        Ok(RateLimitStatus {
            remaining: self.config.limit - window.count,
            reset_in,
        })
    }

    /// Requests already admitted in the credential's active window.
    pub fn used(&self, credential: &str) -> u32 {
        let now = Instant::now();
        self.windows
            .get(credential)
            .filter(|w| now < w.start + self.config.window)
            .map_or(0, |w| w.count)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 { secs + 1 } else { secs }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            limit,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_request_past_limit() {
        let rl = limiter(3, 60);
        for expected_remaining in [2, 1, 0] {
            assert_eq!(rl.check("key").unwrap().remaining, expected_remaining);
        }

        let err = rl.check("key").unwrap_err();
        assert!(matches!(err, Error::RateLimited { retry_after_secs: 60 }));
        // Rejections do not count against the window.
        assert_eq!(rl.used("key"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_elapsing() {
        let rl = limiter(1, 10);
        rl.check("key").unwrap();
        assert!(rl.check("key").is_err());

        tokio::time::advance(Duration::from_millis(4_500)).await;
        let err = rl.check("key").unwrap_err();
        assert!(matches!(err, Error::RateLimited { retry_after_secs: 6 }));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(rl.check("key").unwrap().remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn credentials_have_independent_windows() {
        let rl = limiter(1, 60);
        rl.check("alpha").unwrap();
        assert!(rl.check("alpha").is_err());
        assert!(rl.check("beta").is_ok());
    }
}
