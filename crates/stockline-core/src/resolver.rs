// ── Source resolver ──
//
// Keeps one `ResolvedState<T>` current for a source descriptor. Each
// resolver is a single tokio task owning its state machine: resolutions
// are strictly sequential and retries are explicit timers. Starting a new
// resolution drops the in-flight remote call, so a superseded response can
// never land. Dropping the handle cancels the task with its pending timer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use stockline_api::{Envelope, Error};

use crate::config::ResolverConfig;
use crate::connectivity::{Connectivity, ConnectivityStatus};
use crate::notify::{Notification, Notifier};
use crate::source::{RemoteCall, SourceDescriptor};

const DEGRADED_MESSAGE: &str = "Using local data. Will retry automatically.";

// ── State ────────────────────────────────────────────────────────────

/// Where the current data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Api,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Settled(Provenance),
}

/// What a consumer renders.
///
/// `data` is always present: it holds the local producer's value until the
/// first resolution settles.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedState<T> {
    pub data: T,
    pub is_from_api: bool,
    pub last_updated: Option<DateTime<Utc>>,
    /// Last remote failure. Cleared only by a remote success or
    /// [`ResolverHandle::clear_error`].
    pub error: Option<String>,
    pub is_loading: bool,
    pub phase: Phase,
    /// Remote attempts made by the current resolution.
    pub attempts: u32,
}

impl<T> ResolvedState<T> {
    fn seeded(data: T) -> Self {
        Self {
            data,
            is_from_api: false,
            last_updated: None,
            error: None,
            is_loading: false,
            phase: Phase::Idle,
            attempts: 0,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Settled(_))
    }
}

// ── Handle ───────────────────────────────────────────────────────────

enum Command {
    Refresh,
}

/// Consumer-side handle. Dropping it stops the resolver.
pub struct ResolverHandle<T> {
    state: Arc<watch::Sender<ResolvedState<T>>>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone> ResolverHandle<T> {
    /// Current state.
    pub fn state(&self) -> ResolvedState<T> {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ResolvedState<T>> {
        self.state.subscribe()
    }

    /// Force a new resolution with a fresh retry budget. Queued if a remote
    /// call is in flight; the auto-refresh period is left alone.
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    /// Forget the last error without touching data or provenance.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Wait until the current resolution has settled.
    pub async fn settled(&self) -> ResolvedState<T> {
        let mut rx = self.subscribe();
        let result = rx.wait_for(ResolvedState::is_settled).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Stop the resolver and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for ResolverHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Resolver ─────────────────────────────────────────────────────────

pub struct SourceResolver;

impl SourceResolver {
    /// Spawn a resolver for `source` and start the first resolution.
    pub fn spawn<T>(
        source: SourceDescriptor<T>,
        connectivity: Connectivity,
        notifier: Arc<dyn Notifier>,
        config: ResolverConfig,
    ) -> ResolverHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ResolvedState::seeded(source.produce_local()));
        let state = Arc::new(state);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = Worker {
            connectivity_rx: connectivity.subscribe(),
            source,
            connectivity,
            notifier,
            config,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
            commands: command_rx,
            trigger: Trigger::Initial,
            retry: RetryState::default(),
            refresh_queued: false,
            schedule_live: false,
            degraded_notified: false,
        };
        let task = tokio::spawn(worker.run());

        ResolverHandle {
            state,
            commands,
            cancel,
            task: Some(task),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RetryState {
    /// Failed remote attempts in the current resolution.
    failures: u32,
    next_retry_at: Option<Instant>,
}

/// What started the current resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Initial,
    Connectivity,
    Auto,
    Manual,
}

struct Worker<T> {
    source: SourceDescriptor<T>,
    connectivity: Connectivity,
    connectivity_rx: watch::Receiver<ConnectivityStatus>,
    notifier: Arc<dyn Notifier>,
    config: ResolverConfig,
    state: Arc<watch::Sender<ResolvedState<T>>>,
    cancel: CancellationToken,
    commands: mpsc::UnboundedReceiver<Command>,
    trigger: Trigger,
    retry: RetryState,
    refresh_queued: bool,
    /// The auto-refresh interval has been running since the last remote
    /// success. False after settling on local data.
    schedule_live: bool,
    /// One "using local data" notification per degraded episode.
    degraded_notified: bool,
}

impl<T> Worker<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(mut self) {
        let period = self.config.refresh_interval;
        let mut auto = tokio::time::interval_at(Instant::now() + period, period);
        auto.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let auto_enabled = self.config.auto_refresh && self.source.auto_refresh();

        let mut in_flight = self.begin(Trigger::Initial);

        loop {
            let retry_at = self.retry.next_retry_at;
            let auto_armed = auto_enabled
                && in_flight.is_none()
                && retry_at.is_none()
                && self.state.borrow().phase == Phase::Settled(Provenance::Api);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = poll_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    self.complete(result);
                    let remote = self.state.borrow().phase == Phase::Settled(Provenance::Api);
                    if remote {
                        // A manual refresh keeps the running schedule.
                        if self.trigger != Trigger::Manual || !self.schedule_live {
                            auto.reset();
                        }
                        self.schedule_live = true;
                    }
                    if self.refresh_queued {
                        debug!(source = self.source.name(), "running queued refresh");
                        in_flight = self.begin(Trigger::Manual);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Refresh) if in_flight.is_some() => self.refresh_queued = true,
                    Some(Command::Refresh) => {
                        debug!(source = self.source.name(), "manual refresh");
                        in_flight = self.begin(Trigger::Manual);
                    }
                    None => break,
                },
                changed = self.connectivity_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!(source = self.source.name(), "connectivity changed; re-resolving");
                    in_flight = self.begin(Trigger::Connectivity);
                }
                () = sleep_until_retry(retry_at), if retry_at.is_some() => {
                    self.retry.next_retry_at = None;
                    in_flight = self.attempt();
                }
                _ = auto.tick(), if auto_armed => {
                    debug!(source = self.source.name(), "auto-refresh");
                    in_flight = self.begin(Trigger::Auto);
                }
            }
        }

        debug!(source = self.source.name(), "resolver stopped");
    }

    /// Start a new resolution, superseding whatever was pending. Any queued
    /// refresh is satisfied by it.
    fn begin(&mut self, trigger: Trigger) -> Option<RemoteCall<T>> {
        self.trigger = trigger;
        self.refresh_queued = false;
        self.retry = RetryState::default();
        self.state.send_modify(|s| {
            s.phase = Phase::Loading;
            s.is_loading = true;
            s.attempts = 0;
        });
        self.attempt()
    }

    /// Issue one remote attempt, or settle on local data when the remote
    /// side is absent or unusable.
    fn attempt(&mut self) -> Option<RemoteCall<T>> {
        let call = self
            .connectivity
            .usable_client()
            .and_then(|client| self.source.produce_remote(client));

        let Some(call) = call else {
            self.settle_local();
            return None;
        };

        self.state.send_modify(|s| s.attempts += 1);
        Some(call)
    }

    fn complete(&mut self, result: Result<Envelope<T>, Error>) {
        match result.and_then(Envelope::into_data) {
            Ok(data) => self.settle_api(data),
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, err: &Error) {
        self.retry.failures += 1;
        let failures = self.retry.failures;
        let message = err.to_string();
        warn!(
            source = self.source.name(),
            attempt = failures,
            error = %err,
            "remote source failed"
        );
        self.state.send_modify(|s| s.error = Some(message));

        let policy = self.config.retry;
        if policy.allows_retry(failures) {
            let delay = policy.delay_after(failures);
            debug!(source = self.source.name(), ?delay, "scheduling retry");
            self.retry.next_retry_at = Some(Instant::now() + delay);
            return;
        }

        self.settle_local();
        if !self.degraded_notified {
            self.degraded_notified = true;
            self.notifier.notify(Notification::api_error(
                format!("load {}", self.source.name()),
                DEGRADED_MESSAGE,
            ));
        }
    }

    fn settle_api(&mut self, data: T) {
        self.retry = RetryState::default();
        if self.degraded_notified {
            info!(source = self.source.name(), "remote source recovered");
        }
        self.degraded_notified = false;
        self.state.send_modify(|s| {
            s.data = data;
            s.is_from_api = true;
            s.last_updated = Some(Utc::now());
            s.error = None;
            s.is_loading = false;
            s.phase = Phase::Settled(Provenance::Api);
        });
    }

    fn settle_local(&mut self) {
        self.retry.next_retry_at = None;
        self.schedule_live = false;
        let data = self.source.produce_local();
        self.state.send_modify(|s| {
            s.data = data;
            s.is_from_api = false;
            s.last_updated = Some(Utc::now());
            s.is_loading = false;
            s.phase = Phase::Settled(Provenance::Local);
        });
    }
}

async fn poll_in_flight<T>(in_flight: &mut Option<RemoteCall<T>>) -> Result<Envelope<T>, Error> {
    match in_flight {
        Some(call) => call.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_retry(at: Option<Instant>) {
    if let Some(at) = at {
        tokio::time::sleep_until(at).await;
    }
}
