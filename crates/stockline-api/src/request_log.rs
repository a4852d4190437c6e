// Per-request observability
//
// The client reports every attempt exactly once, success or failure,
// through a `RequestLog`. Retries are the caller's business, so a retried
// operation shows up as several records.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ErrorKind;

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The service answered; `status` is the HTTP status code.
    Completed { status: u16 },
    /// The attempt failed before or while talking to the service.
    Failed { kind: ErrorKind, status: Option<u16> },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { status } if (200..300).contains(status))
    }

    /// Status code to display: the HTTP status, or 0 for transport failures.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Completed { status } => *status,
            Self::Failed { status, .. } => status.unwrap_or(0),
        }
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub at: DateTime<Utc>,
    pub method: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub outcome: RequestOutcome,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

mod millis {
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// Sink for request records.
pub trait RequestLog: Send + Sync {
    fn record(&self, record: RequestRecord);
}

/// Emits one `tracing` event per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRequestLog;

impl RequestLog for TracingRequestLog {
    fn record(&self, record: RequestRecord) {
        let elapsed_ms = record.elapsed.as_millis();
        match record.outcome {
            RequestOutcome::Completed { status } => debug!(
                method = %record.method,
                endpoint = %record.endpoint,
                status,
                elapsed_ms,
                "request completed"
            ),
            RequestOutcome::Failed { kind, status } => warn!(
                method = %record.method,
                endpoint = %record.endpoint,
                %kind,
                status = status.unwrap_or(0),
                elapsed_ms,
                "request failed"
            ),
        }
    }
}

/// Bounded in-memory history of recent requests.
///
/// Also forwards each record to [`TracingRequestLog`], so installing a
/// history never silences the log output.
#[derive(Debug)]
pub struct RequestHistory {
    capacity: usize,
    records: Mutex<VecDeque<RequestRecord>>,
}

/// Aggregate view over a [`RequestHistory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rate_limited: usize,
    pub average_ms: u128,
}

impl RequestHistory {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Copy of the retained records, oldest first.
    pub fn records(&self) -> Vec<RequestRecord> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn summary(&self) -> HistorySummary {
        let records = self.lock();
        let total = records.len();
        let succeeded = records.iter().filter(|r| r.outcome.is_success()).count();
        let rate_limited = records
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    RequestOutcome::Failed {
                        kind: ErrorKind::RateLimited,
                        ..
                    }
                )
            })
            .count();
        let total_ms: u128 = records.iter().map(|r| r.elapsed.as_millis()).sum();

        HistorySummary {
            total,
            succeeded,
            failed: total - succeeded,
            rate_limited,
            average_ms: if total == 0 {
                0
            } else {
                total_ms / total as u128
            },
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RequestRecord>> {
        // A poisoned history is still a valid history.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl RequestLog for RequestHistory {
    fn record(&self, record: RequestRecord) {
        TracingRequestLog.record(record.clone());
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: Option<u16>, kind: Option<ErrorKind>, ms: u64) -> RequestRecord {
        let outcome = match kind {
            None => RequestOutcome::Completed {
                status: status.unwrap_or(200),
            },
            Some(kind) => RequestOutcome::Failed { kind, status },
        };
        RequestRecord {
            at: Utc::now(),
            method: "GET".into(),
            endpoint: "/api/products".into(),
            outcome,
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn history_is_bounded() {
        let history = RequestHistory::new(2);
        history.record(record(Some(200), None, 1));
        history.record(record(Some(201), None, 1));
        history.record(record(Some(204), None, 1));

        let statuses: Vec<u16> = history
            .records()
            .iter()
            .map(|r| r.outcome.status_code())
            .collect();
        assert_eq!(statuses, vec![201, 204]);
    }

    #[test]
    fn summary_counts_outcomes() {
        let history = RequestHistory::default();
        history.record(record(Some(200), None, 10));
        history.record(record(Some(404), Some(ErrorKind::Http), 20));
        history.record(record(Some(429), Some(ErrorKind::RateLimited), 0));
        history.record(record(None, Some(ErrorKind::Network), 30));

        let summary = history.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.rate_limited, 1);
        assert_eq!(summary.average_ms, 15);
    }

    #[test]
    fn non_2xx_completion_is_not_success() {
        assert!(!RequestOutcome::Completed { status: 500 }.is_success());
        assert_eq!(
            RequestOutcome::Failed {
                kind: ErrorKind::Network,
                status: None
            }
            .status_code(),
            0
        );
    }
}
