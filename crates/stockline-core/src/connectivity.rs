// ── Connectivity context ──
//
// Holds the current inventory client (if any) and whether the service is
// configured and reachable. Replaced atomically on reconfiguration; every
// change is published on a `watch` channel so resolvers and the sync loop
// can react.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use stockline_api::InventoryClient;

use crate::error::CoreError;

/// Observable connectivity flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityStatus {
    /// A client is installed and remote use is enabled.
    pub configured: bool,
    /// The last connection probe succeeded.
    pub online: bool,
    /// Bumped whenever the installed client changes.
    pub revision: u64,
}

impl ConnectivityStatus {
    /// Remote sources may be used.
    pub fn is_usable(&self) -> bool {
        self.configured && self.online
    }
}

/// Shared connectivity state. Cheap to clone.
#[derive(Clone)]
pub struct Connectivity {
    inner: Arc<ConnectivityInner>,
}

struct ConnectivityInner {
    client: ArcSwapOption<InventoryClient>,
    status: watch::Sender<ConnectivityStatus>,
}

impl Connectivity {
    /// Unconfigured and offline.
    pub fn new() -> Self {
        let (status, _) = watch::channel(ConnectivityStatus::default());
        Self {
            inner: Arc::new(ConnectivityInner {
                client: ArcSwapOption::empty(),
                status,
            }),
        }
    }

    /// Install `client`. The service counts as offline until a probe
    /// succeeds or [`set_online`](Self::set_online) says otherwise.
    pub fn configure(&self, client: InventoryClient) {
        debug!(base_url = client.base_url(), "installing inventory client");
        self.inner.client.store(Some(Arc::new(client)));
        self.inner.status.send_modify(|s| {
            s.configured = true;
            s.online = false;
            s.revision += 1;
        });
    }

    /// Remove the client and go back to local-only operation.
    pub fn clear(&self) {
        self.inner.client.store(None);
        self.inner.status.send_modify(|s| {
            s.configured = false;
            s.online = false;
            s.revision += 1;
        });
        info!("inventory service cleared; using local data");
    }

    pub fn set_online(&self, online: bool) {
        self.inner.status.send_if_modified(|s| {
            let changed = s.online != online;
            s.online = online;
            changed
        });
    }

    /// Probe the service with `GET /api/inventory/stats` and record the
    /// result in the `online` flag.
    pub async fn test_connection(&self) -> Result<(), CoreError> {
        let Some(client) = self.client() else {
            self.set_online(false);
            return Err(CoreError::NotConfigured);
        };

        match client.inventory_stats().await {
            Ok(_) => {
                self.set_online(true);
                info!(base_url = client.base_url(), "inventory service reachable");
                Ok(())
            }
            Err(e) => {
                self.set_online(false);
                warn!(error = %e, "inventory service connection test failed");
                Err(e.into())
            }
        }
    }

    /// Install `client` and probe it. Returns whether the service is online.
    pub async fn connect(&self, client: InventoryClient) -> bool {
        self.configure(client);
        self.test_connection().await.is_ok()
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn client(&self) -> Option<Arc<InventoryClient>> {
        self.inner.client.load_full()
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.inner.status.subscribe()
    }

    /// The client, when the service is configured and online.
    pub fn usable_client(&self) -> Option<Arc<InventoryClient>> {
        if self.status().is_usable() {
            self.client()
        } else {
            None
        }
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connectivity")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
