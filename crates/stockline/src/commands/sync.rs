//! `sync`: run the background sync loop in the foreground, or one cycle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{Instant, sleep_until};

use stockline_core::{
    BroadcastNotifier, CycleOutcome, JsonFileStore, Notification, Notifier, SkipReason,
    SnapshotStore, SyncLoop, SyncState,
};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn detail(s: &SyncState) -> String {
    let mut lines = vec![
        format!("Status:          {}", s.sync_status),
        format!("Last sync:       {}", util::age(s.last_sync_time.as_ref())),
        format!("Errors:          {}", s.error_count),
        format!("Persisted errs:  {}", s.consecutive_errors),
        format!("Real-time:       {}", s.is_real_time_enabled),
    ];
    if s.halted {
        lines.push("Halted:          automatic cycles suspended".into());
    }
    if let Some(ref err) = s.last_error {
        lines.push(format!("Last error:      {err}"));
    }
    if let Some(ref good) = s.last_known_good {
        lines.push(format!(
            "Known good:      {} products, {} alerts",
            good.stats.total_products,
            good.alerts.len()
        ));
    }
    lines.join("\n")
}

fn print_state(state: &SyncState, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, state, detail, |s| s.sync_status.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_note(note: &Notification, quiet: bool) {
    if !quiet {
        eprintln!("! {note}");
    }
}

fn drain_notes(notes: &mut broadcast::Receiver<Notification>, quiet: bool) {
    while let Ok(note) = notes.try_recv() {
        print_note(&note, quiet);
    }
}

pub async fn handle(ctx: &Context, args: &SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let connectivity = ctx.connectivity().await?;
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(ctx.runtime.state_dir.clone()));
    let notifier = Arc::new(BroadcastNotifier::new());
    let mut notes = notifier.subscribe();
    let sink: Arc<dyn Notifier> = notifier.clone();

    let mut config = ctx.runtime.sync;
    if args.once {
        config.enabled = false;
    }
    let handle = SyncLoop::spawn(config, connectivity.clone(), store, sink);

    if args.once {
        let outcome = handle.manual_sync().await;
        drain_notes(&mut notes, global.quiet);
        let state = handle.state();
        handle.shutdown().await;
        print_state(&state, global)?;
        return match outcome {
            CycleOutcome::Success | CycleOutcome::Skipped(SkipReason::InProgress) => Ok(()),
            CycleOutcome::Skipped(SkipReason::NotConfigured) => Err(CliError::NoConfig {
                path: stockline_config::config_path().display().to_string(),
            }),
            CycleOutcome::Skipped(SkipReason::Offline) => Err(CliError::ConnectionFailed {
                url: connectivity
                    .client()
                    .map(|c| c.base_url().to_owned())
                    .unwrap_or_default(),
                reason: "service did not answer the connection probe".into(),
            }),
            CycleOutcome::Failed { error_count } => Err(CliError::ApiError {
                code: format!("sync-failed-{error_count}"),
                message: state
                    .last_error
                    .unwrap_or_else(|| "sync cycle failed".into()),
            }),
        };
    }

    let mut rx = handle.subscribe();
    print_state(&rx.borrow_and_update().clone(), global)?;

    let deadline = args.duration.map(|d| Instant::now() + d);
    let stop_after = async move {
        match deadline {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop_after);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut probe = tokio::time::interval(ctx.runtime.sync.interval);
    probe.reset();

    loop {
        tokio::select! {
            () = &mut stop_after => break,
            _ = &mut ctrl_c => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                print_state(&state, global)?;
            }
            Ok(note) = notes.recv() => print_note(&note, global.quiet),
            _ = probe.tick() => {
                let status = connectivity.status();
                if status.configured && !status.online {
                    let _ = connectivity.test_connection().await;
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
