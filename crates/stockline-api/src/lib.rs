// stockline-api: Async Rust client for the stockline inventory service

pub mod client;
pub mod envelope;
pub mod error;
pub mod models;
pub mod query;
pub mod rate_limit;
pub mod request_log;
pub mod transport;

mod analytics;
mod inventory;
mod products;

pub use client::InventoryClient;
pub use envelope::Envelope;
pub use error::{Error, ErrorKind};
pub use query::QueryParams;
pub use rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter};
pub use request_log::{
    HistorySummary, RequestHistory, RequestLog, RequestOutcome, RequestRecord, TracingRequestLog,
};
pub use transport::{TlsMode, TransportConfig};

pub use reqwest::Method;
