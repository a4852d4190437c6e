// ── Snapshot persistence ──
//
// Key-value storage of JSON blobs, versioned per key. A stored blob whose
// version differs from the reader's, or that fails to decode, reads as
// absent. There is no migration.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stockline_api::models::{InventoryStats, StockAlert};

use crate::error::CoreError;

/// Raw JSON key-value store.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError>;
    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), CoreError>;
}

// ── File store ───────────────────────────────────────────────────────

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::Persistence {
                    message: format!("failed to read {}: {e}", path.display()),
                });
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt snapshot file");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), CoreError> {
        let persistence = |e: std::io::Error| CoreError::Persistence {
            message: format!("failed to write snapshot {key}: {e}"),
        };

        std::fs::create_dir_all(&self.dir).map_err(persistence)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(value).map_err(|e| CoreError::Persistence {
            message: format!("failed to encode snapshot {key}: {e}"),
        })?;
        std::fs::write(&tmp, body).map_err(persistence)?;
        std::fs::rename(&tmp, &path).map_err(persistence)?;

        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}

// ── Memory store ─────────────────────────────────────────────────────

/// Process-local store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.clone());
        Ok(())
    }
}

// ── Versioning ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct Versioned<T> {
    version: u32,
    data: T,
}

/// Typed, versioned view over a [`SnapshotStore`].
pub struct VersionedStore<'a> {
    store: &'a dyn SnapshotStore,
    version: u32,
}

impl<'a> VersionedStore<'a> {
    pub fn new(store: &'a dyn SnapshotStore, version: u32) -> Self {
        Self { store, version }
    }

    /// Read `key`. Missing, corrupt, undecodable and other-version blobs
    /// all read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.store.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "snapshot unreadable; treating as absent");
                return None;
            }
        };

        let found = value.get("version").and_then(serde_json::Value::as_u64);
        if found != Some(u64::from(self.version)) {
            debug!(key, ?found, expected = self.version, "snapshot version mismatch");
            return None;
        }

        match serde_json::from_value::<Versioned<T>>(value) {
            Ok(v) => Some(v.data),
            Err(e) => {
                warn!(key, error = %e, "snapshot does not match schema; treating as absent");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<(), CoreError> {
        let value = serde_json::to_value(Versioned {
            version: self.version,
            data,
        })
        .map_err(|e| CoreError::Persistence {
            message: format!("failed to encode snapshot {key}: {e}"),
        })?;
        self.store.save(key, &value)
    }
}

// ── Sync snapshot ────────────────────────────────────────────────────

/// Last payload fetched by a successful sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownGoodData {
    pub stats: InventoryStats,
    pub alerts: Vec<StockAlert>,
}

/// Cross-session record of synchronization, written only by the sync loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub consecutive_errors: u32,
    pub last_known_good_data: Option<KnownGoodData>,
}

impl SyncSnapshot {
    pub const KEY: &'static str = "realtime-sync-state";
    pub const VERSION: u32 = 1;

    /// Load from `store`, or start fresh.
    pub fn load(store: &dyn SnapshotStore) -> Self {
        VersionedStore::new(store, Self::VERSION)
            .load(Self::KEY)
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn SnapshotStore) -> Result<(), CoreError> {
        VersionedStore::new(store, Self::VERSION).save(Self::KEY, self)
    }
}
