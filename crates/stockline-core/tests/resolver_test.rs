// Resolver state-machine tests on a paused tokio clock.
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::broadcast;
use tokio::time::Instant;

use stockline_api::{Envelope, Error, InventoryClient, TransportConfig};
use stockline_core::{
    BroadcastNotifier, Connectivity, Notification, Phase, Provenance, ResolvedState,
    ResolverConfig, ResolverHandle, SourceDescriptor, SourceResolver,
};

// ── Helpers ─────────────────────────────────────────────────────────

const LOCAL: [u32; 1] = [0];

type Step = (Duration, Result<Envelope<Vec<u32>>, Error>);

/// Remote producer that replays `steps` in order and repeats the last one.
struct Script {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    started_at: Mutex<Vec<Instant>>,
}

impl Script {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            started_at: Mutex::new(Vec::new()),
        })
    }

    fn next(&self) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started_at.lock().unwrap().push(Instant::now());
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            let (delay, result) = steps.front().unwrap();
            let result = match result {
                Ok(env) => Ok(env.clone()),
                Err(_) => Err(unavailable()),
            };
            (*delay, result)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gaps(&self) -> Vec<Duration> {
        let started = self.started_at.lock().unwrap();
        started.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

fn unavailable() -> Error {
    Error::Http {
        status: 503,
        body: "unavailable".into(),
    }
}

fn ok(data: Vec<u32>) -> Step {
    (Duration::ZERO, Ok(Envelope::ok(data)))
}

fn fail() -> Step {
    (Duration::ZERO, Err(unavailable()))
}

fn descriptor(script: &Arc<Script>) -> SourceDescriptor<Vec<u32>> {
    let script = Arc::clone(script);
    SourceDescriptor::new("numbers", || LOCAL.to_vec())
        .with_remote(move |_client| {
            let (delay, result) = script.next();
            async move {
                tokio::time::sleep(delay).await;
                result
            }
        })
        .with_auto_refresh(true)
}

fn client() -> InventoryClient {
    InventoryClient::new(
        "http://127.0.0.1:9",
        &SecretString::from("test-key"),
        &TransportConfig::default(),
    )
    .unwrap()
}

fn online() -> Connectivity {
    let conn = Connectivity::new();
    conn.configure(client());
    conn.set_online(true);
    conn
}

fn spawn(
    source: SourceDescriptor<Vec<u32>>,
    conn: &Connectivity,
) -> (ResolverHandle<Vec<u32>>, broadcast::Receiver<Notification>) {
    let notifier = BroadcastNotifier::new();
    let rx = notifier.subscribe();
    let handle = SourceResolver::spawn(
        source,
        conn.clone(),
        Arc::new(notifier),
        ResolverConfig::default(),
    );
    (handle, rx)
}

async fn wait_until(
    handle: &ResolverHandle<Vec<u32>>,
    pred: impl FnMut(&ResolvedState<Vec<u32>>) -> bool,
) -> ResolvedState<Vec<u32>> {
    let mut rx = handle.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
        .await
        .unwrap()
        .unwrap()
        .clone();
    state
}

// ── Fallback and provenance ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_unconfigured_source_settles_on_local_data() {
    let script = Script::new(vec![ok(vec![1, 2])]);
    let (handle, _rx) = spawn(descriptor(&script), &Connectivity::new());

    assert_eq!(handle.state().data, LOCAL.to_vec());

    let state = handle.settled().await;
    assert_eq!(state.phase, Phase::Settled(Provenance::Local));
    assert_eq!(state.data, LOCAL.to_vec());
    assert!(!state.is_from_api);
    assert!(!state.is_loading);
    assert!(state.last_updated.is_some());
    assert_eq!(script.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_offline_service_is_not_called() {
    let conn = Connectivity::new();
    conn.configure(client());
    let script = Script::new(vec![ok(vec![1])]);
    let (handle, _rx) = spawn(descriptor(&script), &conn);

    let state = handle.settled().await;
    assert!(!state.is_from_api);
    assert_eq!(script.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_local_only_descriptor_never_goes_remote() {
    let source = SourceDescriptor::new("local", || vec![7_u32]);
    let (handle, _rx) = spawn(source, &online());

    let state = handle.settled().await;
    assert_eq!(state.data, vec![7]);
    assert_eq!(state.phase, Phase::Settled(Provenance::Local));
}

#[tokio::test(start_paused = true)]
async fn test_remote_success_is_adopted() {
    let script = Script::new(vec![ok(vec![4, 5, 6])]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let state = handle.settled().await;
    assert_eq!(state.phase, Phase::Settled(Provenance::Api));
    assert_eq!(state.data, vec![4, 5, 6]);
    assert!(state.is_from_api);
    assert_eq!(state.error, None);
    assert_eq!(state.attempts, 1);
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsuccessful_envelope_counts_as_failure() {
    let script = Script::new(vec![(
        Duration::ZERO,
        Ok(Envelope::failure("Product catalog unavailable")),
    )]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let state = handle.settled().await;
    assert!(!state.is_from_api);
    assert_eq!(state.data, LOCAL.to_vec());
    assert!(state.error.unwrap().contains("Product catalog unavailable"));
    assert_eq!(script.calls(), 3);
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_retries_twice_with_doubling_delay_then_falls_back() {
    let script = Script::new(vec![fail()]);
    let (handle, mut notes) = spawn(descriptor(&script), &online());

    let state = handle.settled().await;
    assert_eq!(script.calls(), 3);
    assert_eq!(
        script.gaps(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
    assert_eq!(state.phase, Phase::Settled(Provenance::Local));
    assert_eq!(state.data, LOCAL.to_vec());
    assert!(state.error.is_some());
    assert_eq!(state.attempts, 3);

    match notes.try_recv().unwrap() {
        Notification::ApiError { operation, message } => {
            assert_eq!(operation, "load numbers");
            assert_eq!(message, "Using local data. Will retry automatically.");
        }
        other => panic!("unexpected notification: {other:?}"),
    }
    assert!(notes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_loading_stays_set_between_retries() {
    let script = Script::new(vec![fail()]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let state = wait_until(&handle, |s| s.attempts == 2).await;
    assert!(state.is_loading);
    assert_eq!(state.phase, Phase::Loading);
    assert!(state.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_degraded_notification_fires_once_per_episode() {
    let script = Script::new(vec![fail()]);
    let (handle, mut notes) = spawn(descriptor(&script), &online());
    handle.settled().await;
    assert!(notes.try_recv().is_ok());

    handle.refresh();
    wait_until(&handle, |s| s.is_settled() && script.calls() == 6).await;
    assert!(notes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_after_fallback_recovers() {
    let script = Script::new(vec![fail(), fail(), fail(), ok(vec![9])]);
    let (handle, mut notes) = spawn(descriptor(&script), &online());
    handle.settled().await;
    assert!(notes.try_recv().is_ok());

    handle.refresh();
    let state = wait_until(&handle, |s| s.is_from_api).await;
    assert_eq!(state.data, vec![9]);
    assert_eq!(state.error, None);
    assert_eq!(state.attempts, 1);
    assert_eq!(script.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_success_on_second_attempt_clears_error() {
    let script = Script::new(vec![fail(), ok(vec![3])]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let state = handle.settled().await;
    assert!(state.is_from_api);
    assert_eq!(state.error, None);
    assert_eq!(state.attempts, 2);
    assert_eq!(script.gaps(), vec![Duration::from_secs(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_clear_error_keeps_data() {
    let script = Script::new(vec![fail()]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let before = handle.settled().await;
    assert!(before.error.is_some());

    handle.clear_error();
    let after = handle.state();
    assert_eq!(after.error, None);
    assert_eq!(after.data, before.data);
    assert_eq!(after.phase, before.phase);
}

// ── Staleness and cancellation ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_superseded_response_is_discarded() {
    let script = Script::new(vec![(Duration::from_secs(5), Ok(Envelope::ok(vec![1])))]);
    let conn = online();
    let (handle, _rx) = spawn(descriptor(&script), &conn);

    wait_until(&handle, |s| s.phase == Phase::Loading).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    conn.clear();

    let state = wait_until(&handle, ResolvedState::is_settled).await;
    assert_eq!(state.phase, Phase::Settled(Provenance::Local));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let state = handle.state();
    assert_eq!(state.data, LOCAL.to_vec());
    assert!(!state.is_from_api);
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_during_flight_is_queued() {
    let script = Script::new(vec![
        (Duration::from_secs(3), Ok(Envelope::ok(vec![1]))),
        ok(vec![2]),
    ]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    wait_until(&handle, |s| s.phase == Phase::Loading).await;
    handle.refresh();

    let state = wait_until(&handle, |s| s.data == vec![2]).await;
    assert!(state.is_from_api);
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_queued_behind_failing_attempt_skips_backoff() {
    let script = Script::new(vec![
        (Duration::from_secs(1), Err(unavailable())),
        ok(vec![2]),
    ]);
    let started = Instant::now();
    let (handle, _rx) = spawn(descriptor(&script), &online());

    wait_until(&handle, |s| s.attempts == 1).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.refresh();

    let state = wait_until(&handle, |s| s.is_from_api).await;
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert_eq!(state.data, vec![2]);
    assert_eq!(state.attempts, 1);
    assert_eq!(script.gaps(), vec![Duration::from_secs(1)]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_resolution() {
    let script = Script::new(vec![fail()]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    wait_until(&handle, |s| s.attempts == 1).await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(script.calls(), 1);
}

// ── Auto-refresh ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_runs_only_while_remote() {
    let script = Script::new(vec![ok(vec![1]), ok(vec![2])]);
    let (handle, _rx) = spawn(descriptor(&script), &online());
    handle.settled().await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(script.calls(), 2);
    assert_eq!(handle.state().data, vec![2]);

    let local = Script::new(vec![ok(vec![1])]);
    let (local_handle, _rx) = spawn(descriptor(&local), &Connectivity::new());
    local_handle.settled().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(local.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_triggers_resolution() {
    let conn = Connectivity::new();
    let script = Script::new(vec![ok(vec![8])]);
    let (handle, _rx) = spawn(descriptor(&script), &conn);
    handle.settled().await;
    assert_eq!(script.calls(), 0);

    conn.configure(client());
    conn.set_online(true);

    let state = wait_until(&handle, |s| s.is_from_api).await;
    assert_eq!(state.data, vec![8]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_keeps_auto_refresh_schedule() {
    let script = Script::new(vec![ok(vec![1])]);
    let (handle, _rx) = spawn(descriptor(&script), &online());
    handle.settled().await;

    tokio::time::sleep(Duration::from_secs(20)).await;
    handle.refresh();
    tokio::time::sleep(Duration::from_secs(45)).await;

    assert_eq!(script.calls(), 4);
    assert_eq!(
        script.gaps(),
        vec![
            Duration::from_secs(20),
            Duration::from_secs(10),
            Duration::from_secs(30),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_stops_after_remote_fallback() {
    let script = Script::new(vec![fail()]);
    let (handle, _rx) = spawn(descriptor(&script), &online());

    let state = handle.settled().await;
    assert_eq!(state.phase, Phase::Settled(Provenance::Local));
    assert_eq!(script.calls(), 3);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(script.calls(), 3);
    assert_eq!(handle.state().phase, Phase::Settled(Provenance::Local));
}
