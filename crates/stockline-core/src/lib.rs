// stockline-core: Hybrid local/remote data layer between stockline-api and consumers.

pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod notify;
pub mod persist;
pub mod resolver;
pub mod source;
pub mod sources;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ErrorNotifyPolicy, RemoteConfig, ResolverConfig, RetryPolicy, SyncConfig};
pub use connectivity::{Connectivity, ConnectivityStatus};
pub use error::CoreError;
pub use notify::{BroadcastNotifier, Notification, Notifier, TracingNotifier};
pub use persist::{
    JsonFileStore, KnownGoodData, MemoryStore, SnapshotStore, SyncSnapshot, VersionedStore,
};
pub use resolver::{Phase, Provenance, ResolvedState, ResolverHandle, SourceResolver};
pub use source::{RemoteCall, SourceDescriptor};
pub use sync::{CycleOutcome, SkipReason, SyncHandle, SyncLoop, SyncState, SyncStatus};

// Re-export the remote client so consumers need only this crate.
pub use stockline_api::{
    Envelope, HistorySummary, InventoryClient, RateLimitConfig, RequestHistory, RequestLog,
    RequestOutcome, RequestRecord, TlsMode, TransportConfig, models,
};
