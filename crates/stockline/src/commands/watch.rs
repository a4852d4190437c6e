//! `watch`: resolve one data source with local fallback and print every
//! settled state until interrupted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep_until};

use stockline_core::models::{InventoryStats, Product, StockAlert, StockMovement};
use stockline_core::{
    BroadcastNotifier, Connectivity, Notification, Notifier, ResolvedState, SourceDescriptor,
    SourceResolver, sources,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs, WatchSource};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::alerts::AlertRow;
use super::movements::MovementRow;
use super::products::ProductRow;

/// Structured view of a resolved state for json/yaml output.
#[derive(Serialize)]
struct StateView<'a, T> {
    source: &'a str,
    from_api: bool,
    last_updated: Option<DateTime<Utc>>,
    error: Option<&'a str>,
    attempts: u32,
    data: &'a T,
}

type Render<T> = fn(&T, &OutputFormat, bool) -> Result<String, CliError>;

#[allow(clippy::ptr_arg)]
fn render_products(
    data: &Vec<Product>,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    output::render_list(format, data, |p| ProductRow::new(p, color), |p| p.id.clone())
}

#[allow(clippy::ptr_arg)]
fn render_movements(
    data: &Vec<StockMovement>,
    format: &OutputFormat,
    _color: bool,
) -> Result<String, CliError> {
    output::render_list(format, data, |x| MovementRow::from(x), |m| m.id.clone())
}

#[allow(clippy::ptr_arg)]
fn render_alerts(
    data: &Vec<StockAlert>,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    output::render_list(format, data, |a| AlertRow::new(a, color), |a| a.id.clone())
}

fn render_stats(
    data: &InventoryStats,
    format: &OutputFormat,
    _color: bool,
) -> Result<String, CliError> {
    output::render_single(format, data, super::stats::detail, |s| {
        s.total_products.to_string()
    })
}

pub async fn handle(ctx: &Context, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let connectivity = ctx.connectivity().await?;
    match args.source {
        WatchSource::Products => {
            watch(ctx, connectivity, sources::products(), render_products, args, global).await
        }
        WatchSource::Movements => {
            watch(
                ctx,
                connectivity,
                sources::stock_movements(),
                render_movements,
                args,
                global,
            )
            .await
        }
        WatchSource::Stats => {
            watch(ctx, connectivity, sources::inventory_stats(), render_stats, args, global).await
        }
        WatchSource::Alerts => {
            watch(ctx, connectivity, sources::stock_alerts(), render_alerts, args, global).await
        }
    }
}

async fn watch<T>(
    ctx: &Context,
    connectivity: Connectivity,
    source: SourceDescriptor<T>,
    render: Render<T>,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError>
where
    T: Clone + Send + Sync + Serialize + 'static,
{
    let name = source.name().to_owned();
    let notifier = Arc::new(BroadcastNotifier::new());
    let mut notes = notifier.subscribe();
    let sink: Arc<dyn Notifier> = notifier.clone();

    let handle = SourceResolver::spawn(source, connectivity.clone(), sink, ctx.runtime.resolver);

    if args.once {
        let state = handle.settled().await;
        print_state(&name, &state, render, global)?;
        drain_notes(&mut notes, global.quiet);
        handle.shutdown().await;
        return Ok(());
    }

    let mut rx = handle.subscribe();
    let initial = rx.borrow_and_update().clone();
    if initial.is_settled() {
        print_state(&name, &initial, render, global)?;
    }

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

    // Re-probe an unreachable service so the resolver can switch back.
    let mut probe = tokio::time::interval(ctx.runtime.resolver.refresh_interval);
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
                if state.is_settled() {
                    print_state(&name, &state, render, global)?;
                }
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

fn print_state<T: Serialize>(
    name: &str,
    state: &ResolvedState<T>,
    render: Render<T>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let view = StateView {
                source: name,
                from_api: state.is_from_api,
                last_updated: state.last_updated,
                error: state.error.as_deref(),
                attempts: state.attempts,
                data: &state.data,
            };
            output::render_single(&global.output, &view, |_| String::new(), |_| String::new())?
        }
        OutputFormat::Table | OutputFormat::Plain => {
            if !global.quiet {
                let color = output::should_color(&global.color);
                let origin = if state.is_from_api { "api" } else { "local" };
                eprintln!(
                    "── {name} ({}) · updated {}",
                    output::paint_status(origin, color),
                    super::util::age(state.last_updated.as_ref())
                );
                if let Some(ref err) = state.error {
                    eprintln!("   last error: {err}");
                }
            }
            render(&state.data, &global.output, output::should_color(&global.color))?
        }
    };
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
