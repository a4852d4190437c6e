// ── Background sync loop ──
//
// Periodically fetches inventory stats and stock alerts, persists the last
// good payload, and reports status through a `watch` channel. One spawned
// task drives automatic cycles; manual cycles run on the caller's task. An
// in-progress flag keeps cycles mutually exclusive across both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use stockline_api::{Envelope, InventoryClient};

use crate::config::SyncConfig;
use crate::connectivity::{Connectivity, ConnectivityStatus};
use crate::error::CoreError;
use crate::notify::{Notification, Notifier};
use crate::persist::{KnownGoodData, SnapshotStore, SyncSnapshot};

const SYNC_OPERATION: &str = "sync inventory data";

// ── State ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub sync_status: SyncStatus,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Consecutive failed cycles in this session.
    pub error_count: u32,
    /// Automatic cycles are running against a usable service.
    pub is_real_time_enabled: bool,
    pub last_known_good: Option<KnownGoodData>,
    /// Persisted failure count, carried across sessions.
    pub consecutive_errors: u32,
    /// Automatic cycles are suspended until a manual cycle succeeds.
    pub halted: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    Offline,
    InProgress,
}

/// Result of one cycle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failed { error_count: u32 },
    Skipped(SkipReason),
}

// ── Cycle guard ──────────────────────────────────────────────────────

struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Shared cycle logic ───────────────────────────────────────────────

struct Shared {
    config: SyncConfig,
    connectivity: Connectivity,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SyncState>,
    in_progress: AtomicBool,
    snapshot: Mutex<SyncSnapshot>,
    backoff: mpsc::UnboundedSender<Duration>,
}

impl Shared {
    async fn run_cycle(&self) -> CycleOutcome {
        let status = self.connectivity.status();
        let skip = if !status.configured {
            Some(SkipReason::NotConfigured)
        } else if !status.online {
            Some(SkipReason::Offline)
        } else {
            None
        };
        let client = match (skip, self.connectivity.usable_client()) {
            (None, Some(client)) => client,
            (reason, _) => {
                let reason = reason.unwrap_or(SkipReason::NotConfigured);
                debug!(?reason, "skipping sync cycle");
                self.set_status(SyncStatus::Idle);
                return CycleOutcome::Skipped(reason);
            }
        };

        let Some(_guard) = CycleGuard::acquire(&self.in_progress) else {
            debug!("sync cycle already running; skipping");
            return CycleOutcome::Skipped(SkipReason::InProgress);
        };

        self.set_status(SyncStatus::Syncing);
        let started = Instant::now();
        let limit = self.config.cycle_timeout;
        let result = match tokio::time::timeout(limit, fetch(&client)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(CoreError::Timeout {
                timeout_secs: limit.as_secs() + u64::from(limit.subsec_nanos() > 0),
            }),
        };
        let elapsed_ms = started.elapsed().as_millis();

        match result {
            Ok(data) => {
                debug!(elapsed_ms, alerts = data.alerts.len(), "sync cycle succeeded");
                self.on_success(data).await
            }
            Err(e) => self.on_failure(&e).await,
        }
    }

    async fn on_success(&self, data: KnownGoodData) -> CycleOutcome {
        let previous_errors = self.state.borrow().error_count;
        let now = Utc::now();

        self.persist(|snap| {
            snap.last_successful_sync = Some(now);
            snap.consecutive_errors = 0;
            snap.last_known_good_data = Some(data.clone());
        })
        .await;

        for alert in data.alerts.iter().filter(|a| a.is_critical()) {
            self.notifier.notify(Notification::StockAlert {
                product_name: alert.product_name.clone(),
                current_stock: alert.current_stock,
                threshold: alert.threshold,
            });
        }
        if previous_errors > 0 {
            info!(previous_errors, "sync restored");
            self.notifier.notify(Notification::success(
                "Sync Restored",
                "Successfully reconnected to server",
            ));
        }

        self.state.send_modify(|s| {
            s.sync_status = SyncStatus::Success;
            s.last_sync_time = Some(now);
            s.error_count = 0;
            s.consecutive_errors = 0;
            s.halted = false;
            s.last_error = None;
            s.last_known_good = Some(data);
        });
        CycleOutcome::Success
    }

    async fn on_failure(&self, err: &CoreError) -> CycleOutcome {
        let error_count = self.state.borrow().error_count.saturating_add(1);
        let persisted = self
            .persist(|snap| {
                snap.consecutive_errors = snap.consecutive_errors.saturating_add(1);
            })
            .await;
        let halted = self.config.is_halted(error_count);
        warn!(error_count, error = %err, "sync cycle failed");

        self.state.send_modify(|s| {
            s.sync_status = SyncStatus::Error;
            s.error_count = error_count;
            s.consecutive_errors = persisted.consecutive_errors;
            s.halted = halted;
            s.last_error = Some(err.to_string());
        });

        if self.config.notify.admits(error_count) {
            self.notifier
                .notify(Notification::api_error(SYNC_OPERATION, err.to_string()));
        }

        if halted {
            warn!(error_count, "too many sync failures; automatic sync suspended");
        } else {
            let delay = self.config.backoff_for(error_count);
            debug!(?delay, "scheduling backoff sync");
            let _ = self.backoff.send(delay);
        }
        CycleOutcome::Failed { error_count }
    }

    /// Apply `update` to the snapshot and write it out on the blocking pool.
    /// Write failures are logged; the in-memory copy stays authoritative.
    /// Cycles are exclusive, so writes land in order.
    async fn persist(&self, update: impl FnOnce(&mut SyncSnapshot)) -> SyncSnapshot {
        let snap = {
            let mut guard = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            update(&mut guard);
            guard.clone()
        };

        let store = Arc::clone(&self.store);
        let pending = snap.clone();
        match tokio::task::spawn_blocking(move || pending.save(store.as_ref())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to persist sync snapshot"),
            Err(e) => warn!(error = %e, "snapshot writer task failed"),
        }
        snap
    }

    fn set_status(&self, status: SyncStatus) {
        self.state.send_if_modified(|s| {
            let changed = s.sync_status != status;
            s.sync_status = status;
            changed
        });
    }

    fn reflect_connectivity(&self, status: ConnectivityStatus) {
        let enabled = self.config.enabled && status.is_usable();
        self.state.send_if_modified(|s| {
            let before = (s.sync_status, s.is_real_time_enabled);
            s.is_real_time_enabled = enabled;
            if !status.configured {
                s.sync_status = SyncStatus::Idle;
            } else if !status.online {
                s.sync_status = SyncStatus::Error;
            }
            before != (s.sync_status, s.is_real_time_enabled)
        });
    }

    fn is_halted(&self) -> bool {
        self.state.borrow().halted
    }
}

async fn fetch(client: &InventoryClient) -> Result<KnownGoodData, CoreError> {
    let (stats, alerts) = tokio::join!(client.inventory_stats(), client.stock_alerts());
    Ok(KnownGoodData {
        stats: stats.and_then(Envelope::into_data)?,
        alerts: alerts.and_then(Envelope::into_data)?,
    })
}

// ── Handle ───────────────────────────────────────────────────────────

/// Consumer-side handle to a sync loop. Dropping it stops automatic
/// cycles; the persisted snapshot survives.
pub struct SyncHandle {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn state(&self) -> SyncState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    /// Run one cycle now. Returns `Skipped(InProgress)` without queueing if
    /// another cycle is running. Runs even while automatic cycles are halted.
    pub async fn manual_sync(&self) -> CycleOutcome {
        debug!("manual sync requested");
        self.shared.run_cycle().await
    }

    /// Stop automatic cycles and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ── Loop ─────────────────────────────────────────────────────────────

pub struct SyncLoop;

impl SyncLoop {
    /// Load the persisted snapshot and, when `config.enabled`, start
    /// automatic cycles with an immediate first one.
    pub fn spawn(
        config: SyncConfig,
        connectivity: Connectivity,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> SyncHandle {
        let snapshot = SyncSnapshot::load(store.as_ref());
        let conn_status = connectivity.status();
        let initial = SyncState {
            sync_status: SyncStatus::Idle,
            last_sync_time: snapshot.last_successful_sync,
            error_count: 0,
            is_real_time_enabled: config.enabled && conn_status.is_usable(),
            last_known_good: snapshot.last_known_good_data.clone(),
            consecutive_errors: snapshot.consecutive_errors,
            halted: false,
            last_error: None,
        };
        let (state, _) = watch::channel(initial);
        let (backoff, backoff_rx) = mpsc::unbounded_channel();
        let conn_rx = connectivity.subscribe();

        let shared = Arc::new(Shared {
            config,
            connectivity,
            store,
            notifier,
            state,
            in_progress: AtomicBool::new(false),
            snapshot: Mutex::new(snapshot),
            backoff,
        });
        let cancel = CancellationToken::new();

        let task = config.enabled.then(|| {
            tokio::spawn(sync_task(
                Arc::clone(&shared),
                backoff_rx,
                conn_rx,
                cancel.clone(),
            ))
        });

        SyncHandle {
            shared,
            cancel,
            task,
        }
    }
}

async fn sync_task(
    shared: Arc<Shared>,
    mut backoff_rx: mpsc::UnboundedReceiver<Duration>,
    mut conn_rx: watch::Receiver<ConnectivityStatus>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(shared.config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut backoff_at: Option<Instant> = None;

    info!(interval = ?shared.config.interval, "sync loop started");

    loop {
        let trigger = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = conn_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *conn_rx.borrow_and_update();
                shared.reflect_connectivity(status);
                if !status.is_usable() {
                    continue;
                }
                "connectivity"
            }
            Some(delay) = backoff_rx.recv() => {
                backoff_at = Some(Instant::now() + delay);
                continue;
            }
            () = sleep_until_backoff(backoff_at), if backoff_at.is_some() => {
                backoff_at = None;
                "backoff"
            }
            _ = interval.tick() => "interval",
        };

        if shared.is_halted() {
            debug!(trigger, "automatic sync suspended; skipping cycle");
            continue;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = shared.run_cycle() => debug!(trigger, ?outcome, "sync cycle finished"),
        }
    }

    shared.state.send_modify(|s| {
        s.is_real_time_enabled = false;
        if s.sync_status == SyncStatus::Syncing {
            s.sync_status = SyncStatus::Idle;
        }
    });
    info!("sync loop stopped");
}

async fn sleep_until_backoff(at: Option<Instant>) {
    if let Some(at) = at {
        tokio::time::sleep_until(at).await;
    }
}
