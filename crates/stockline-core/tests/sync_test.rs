// Sync loop tests against a wiremock inventory service.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::{broadcast, oneshot};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockline_api::{InventoryClient, TransportConfig};
use stockline_core::{
    BroadcastNotifier, Connectivity, CoreError, CycleOutcome, MemoryStore, Notification,
    SkipReason, SnapshotStore, SyncConfig, SyncHandle, SyncLoop, SyncSnapshot, SyncStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn stats_body() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "totalProducts": 2,
            "totalValue": 1250000.0,
            "lowStockCount": 1,
            "outOfStockCount": 1,
            "topProducts": []
        }
    })
}

fn alerts_body() -> serde_json::Value {
    json!([
        {
            "id": "alert-001",
            "productId": "prod-005",
            "productName": "Splitter Fiber Optic 1:8",
            "type": "OUT_OF_STOCK",
            "currentStock": 0,
            "threshold": 10,
            "severity": "CRITICAL",
            "message": "Out of stock"
        },
        {
            "id": "alert-002",
            "productId": "prod-006",
            "productName": "Access Point Indoor",
            "type": "LOW_STOCK",
            "currentStock": 8,
            "threshold": 15,
            "severity": "HIGH",
            "message": "Stock is low"
        }
    ])
}

async fn mount_healthy(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/inventory/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stats_body())
                .set_delay(delay),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alerts_body()))
        .mount(server)
        .await;
}

async fn mount_failing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/inventory/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alerts_body()))
        .mount(server)
        .await;
}

fn online(server: &MockServer) -> Connectivity {
    let client = InventoryClient::new(
        &server.uri(),
        &SecretString::from("test-key"),
        &TransportConfig::default(),
    )
    .unwrap();
    let conn = Connectivity::new();
    conn.configure(client);
    conn.set_online(true);
    conn
}

fn manual_only() -> SyncConfig {
    SyncConfig {
        enabled: false,
        ..SyncConfig::default()
    }
}

struct Harness {
    handle: SyncHandle,
    store: Arc<MemoryStore>,
    notes: broadcast::Receiver<Notification>,
}

fn spawn(config: SyncConfig, conn: Connectivity, store: Arc<MemoryStore>) -> Harness {
    let notifier = BroadcastNotifier::new();
    let notes = notifier.subscribe();
    let handle = SyncLoop::spawn(config, conn, store.clone(), Arc::new(notifier));
    Harness {
        handle,
        store,
        notes,
    }
}

fn drain(notes: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    std::iter::from_fn(|| notes.try_recv().ok()).collect()
}

async fn stats_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/inventory/stats")
        .count()
}

// ── Cycles ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_cycle_persists_and_raises_critical_alerts() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;
    let mut h = spawn(manual_only(), online(&server), Arc::new(MemoryStore::new()));

    assert_eq!(h.handle.manual_sync().await, CycleOutcome::Success);

    let state = h.handle.state();
    assert_eq!(state.sync_status, SyncStatus::Success);
    assert_eq!(state.error_count, 0);
    assert!(state.last_sync_time.is_some());
    let known = state.last_known_good.unwrap();
    assert_eq!(known.stats.total_products, 2);
    assert_eq!(known.alerts.len(), 2);

    let saved = SyncSnapshot::load(h.store.as_ref());
    assert_eq!(saved.consecutive_errors, 0);
    assert_eq!(saved.last_successful_sync, state.last_sync_time);
    assert!(saved.last_known_good_data.is_some());

    let raw = h.store.load(SyncSnapshot::KEY).unwrap().unwrap();
    assert_eq!(raw["version"], 1);
    assert!(raw["data"]["lastKnownGoodData"]["alerts"].is_array());

    assert_eq!(
        drain(&mut h.notes),
        vec![Notification::StockAlert {
            product_name: "Splitter Fiber Optic 1:8".into(),
            current_stock: 0,
            threshold: 10,
        }]
    );
}

#[tokio::test]
async fn test_cycle_skips_when_unconfigured_or_offline() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;

    let h = spawn(manual_only(), Connectivity::new(), Arc::new(MemoryStore::new()));
    assert_eq!(
        h.handle.manual_sync().await,
        CycleOutcome::Skipped(SkipReason::NotConfigured)
    );
    assert_eq!(h.handle.state().sync_status, SyncStatus::Idle);

    let conn = online(&server);
    conn.set_online(false);
    let h = spawn(manual_only(), conn, Arc::new(MemoryStore::new()));
    assert_eq!(
        h.handle.manual_sync().await,
        CycleOutcome::Skipped(SkipReason::Offline)
    );
    assert_eq!(stats_requests(&server).await, 0);
}

#[tokio::test]
async fn test_concurrent_cycles_are_mutually_exclusive() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::from_millis(300)).await;
    let h = spawn(manual_only(), online(&server), Arc::new(MemoryStore::new()));

    let (first, second) = tokio::join!(h.handle.manual_sync(), h.handle.manual_sync());
    assert_eq!(first, CycleOutcome::Success);
    assert_eq!(second, CycleOutcome::Skipped(SkipReason::InProgress));
    assert_eq!(stats_requests(&server).await, 1);

    // The flag is released once the cycle completes.
    assert_eq!(h.handle.manual_sync().await, CycleOutcome::Success);
}

#[tokio::test]
async fn test_cycle_timeout_counts_as_failure() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::from_secs(2)).await;
    let config = SyncConfig {
        cycle_timeout: Duration::from_millis(200),
        ..manual_only()
    };
    let h = spawn(config, online(&server), Arc::new(MemoryStore::new()));

    assert_eq!(
        h.handle.manual_sync().await,
        CycleOutcome::Failed { error_count: 1 }
    );
    let state = h.handle.state();
    assert_eq!(state.sync_status, SyncStatus::Error);
    assert!(state.last_error.unwrap().contains("timed out"));
}

// ── Error accounting ────────────────────────────────────────────────

#[tokio::test]
async fn test_error_notifications_are_throttled_and_restore_is_announced_once() {
    let server = MockServer::start().await;
    mount_failing(&server).await;
    let mut h = spawn(manual_only(), online(&server), Arc::new(MemoryStore::new()));

    for n in 1..=10 {
        assert_eq!(
            h.handle.manual_sync().await,
            CycleOutcome::Failed { error_count: n }
        );
    }

    let errors: Vec<_> = drain(&mut h.notes)
        .into_iter()
        .filter(|n| matches!(n, Notification::ApiError { .. }))
        .collect();
    assert_eq!(errors.len(), 2);
    match &errors[0] {
        Notification::ApiError { operation, .. } => assert_eq!(operation, "sync inventory data"),
        other => panic!("unexpected notification: {other:?}"),
    }

    let state = h.handle.state();
    assert_eq!(state.error_count, 10);
    assert_eq!(state.consecutive_errors, 10);
    assert!(state.halted);
    assert_eq!(SyncSnapshot::load(h.store.as_ref()).consecutive_errors, 10);

    server.reset().await;
    mount_healthy(&server, Duration::ZERO).await;

    assert_eq!(h.handle.manual_sync().await, CycleOutcome::Success);
    assert_eq!(h.handle.manual_sync().await, CycleOutcome::Success);

    let restored: Vec<_> = drain(&mut h.notes)
        .into_iter()
        .filter(|n| matches!(n, Notification::Success { .. }))
        .collect();
    assert_eq!(
        restored,
        vec![Notification::success(
            "Sync Restored",
            "Successfully reconnected to server"
        )]
    );

    let state = h.handle.state();
    assert_eq!(state.error_count, 0);
    assert!(!state.halted);
    assert_eq!(SyncSnapshot::load(h.store.as_ref()).consecutive_errors, 0);
}

#[tokio::test]
async fn test_failure_keeps_last_known_good_data() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;
    let h = spawn(manual_only(), online(&server), Arc::new(MemoryStore::new()));
    h.handle.manual_sync().await;

    server.reset().await;
    mount_failing(&server).await;
    h.handle.manual_sync().await;

    let saved = SyncSnapshot::load(h.store.as_ref());
    assert_eq!(saved.consecutive_errors, 1);
    assert!(saved.last_known_good_data.is_some());
    assert!(h.handle.state().last_known_good.is_some());
}

#[tokio::test]
async fn test_persisted_snapshot_is_loaded_on_spawn() {
    let store = Arc::new(MemoryStore::new());
    SyncSnapshot {
        consecutive_errors: 3,
        ..SyncSnapshot::default()
    }
    .save(store.as_ref())
    .unwrap();

    let h = spawn(manual_only(), Connectivity::new(), store);
    let state = h.handle.state();
    assert_eq!(state.consecutive_errors, 3);
    assert_eq!(state.error_count, 0);
    assert_eq!(state.sync_status, SyncStatus::Idle);
    assert!(!state.is_real_time_enabled);
}

// ── Automatic cycles ────────────────────────────────────────────────

#[tokio::test]
async fn test_automatic_cycles_back_off_then_halt() {
    let server = MockServer::start().await;
    mount_failing(&server).await;
    let config = SyncConfig {
        interval: Duration::from_secs(3600),
        backoff_base: Duration::from_millis(20),
        backoff_cap: Duration::from_millis(40),
        max_consecutive_errors: 3,
        ..SyncConfig::default()
    };
    let h = spawn(config, online(&server), Arc::new(MemoryStore::new()));
    assert!(h.handle.state().is_real_time_enabled);

    let mut rx = h.handle.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.halted))
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(stats_requests(&server).await, 3);

    // Manual cycles still run while automatic ones are suspended.
    assert_eq!(
        h.handle.manual_sync().await,
        CycleOutcome::Failed { error_count: 4 }
    );
}

#[tokio::test]
async fn test_enabled_loop_runs_immediately_and_stops_on_shutdown() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;
    let config = SyncConfig {
        interval: Duration::from_secs(3600),
        ..SyncConfig::default()
    };
    let h = spawn(config, online(&server), Arc::new(MemoryStore::new()));

    let mut rx = h.handle.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.sync_status == SyncStatus::Success),
    )
    .await
    .unwrap()
    .unwrap();

    h.handle.shutdown().await;
    assert!(!rx.borrow().is_real_time_enabled);
}

#[tokio::test]
async fn test_losing_connectivity_is_reflected() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;
    let config = SyncConfig {
        interval: Duration::from_secs(3600),
        ..SyncConfig::default()
    };
    let conn = online(&server);
    let h = spawn(config, conn.clone(), Arc::new(MemoryStore::new()));

    let mut rx = h.handle.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.sync_status == SyncStatus::Success),
    )
    .await
    .unwrap()
    .unwrap();

    conn.set_online(false);
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.sync_status == SyncStatus::Error),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(!state.is_real_time_enabled);

    conn.clear();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.sync_status == SyncStatus::Idle),
    )
    .await
    .unwrap()
    .unwrap();
}

// ── Persistence ─────────────────────────────────────────────────────

/// Store whose writes wait for a go-ahead sent from an async task.
struct GatedStore {
    inner: MemoryStore,
    started: Mutex<Option<oneshot::Sender<()>>>,
    go: Mutex<mpsc::Receiver<()>>,
    released: AtomicBool,
}

impl SnapshotStore for GatedStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), CoreError> {
        if let Some(started) = self.started.lock().unwrap().take() {
            let _ = started.send(());
        }
        let go = self.go.lock().unwrap().recv_timeout(Duration::from_secs(2));
        self.released.fetch_or(go.is_ok(), Ordering::SeqCst);
        self.inner.save(key, value)
    }
}

#[tokio::test]
async fn test_snapshot_write_leaves_runtime_free() {
    let server = MockServer::start().await;
    mount_healthy(&server, Duration::ZERO).await;

    let (started_tx, started_rx) = oneshot::channel();
    let (go_tx, go_rx) = mpsc::channel();
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        started: Mutex::new(Some(started_tx)),
        go: Mutex::new(go_rx),
        released: AtomicBool::new(false),
    });
    let handle = SyncLoop::spawn(
        manual_only(),
        online(&server),
        store.clone(),
        Arc::new(BroadcastNotifier::new()),
    );

    // Only runs if the write is not holding the runtime thread.
    let releaser = tokio::spawn(async move {
        if started_rx.await.is_ok() {
            let _ = go_tx.send(());
        }
    });

    assert_eq!(handle.manual_sync().await, CycleOutcome::Success);
    releaser.await.unwrap();
    assert!(store.released.load(Ordering::SeqCst));
    assert!(SyncSnapshot::load(store.as_ref()).last_known_good_data.is_some());
}
