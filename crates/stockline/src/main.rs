mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tabled::Tabled;
use tracing_subscriber::EnvFilter;

use stockline_core::RequestRecord;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a service
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "stockline", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let runtime = config::build_runtime(&cli.global)?;
            let ctx = Context::new(runtime);

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &ctx, &cli.global).await;
            if cli.global.show_requests {
                print_request_history(&ctx);
            }
            result
        }
    }
}

// ── Request history ─────────────────────────────────────────────────

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "Time")]
    at: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Status")]
    status: u16,
    #[tabled(rename = "ms")]
    elapsed_ms: u128,
}

impl From<&RequestRecord> for RequestRow {
    fn from(r: &RequestRecord) -> Self {
        Self {
            at: r.at.format("%H:%M:%S%.3f").to_string(),
            method: r.method.clone(),
            endpoint: r.endpoint.clone(),
            status: r.outcome.status_code(),
            elapsed_ms: r.elapsed.as_millis(),
        }
    }
}

fn print_request_history(ctx: &Context) {
    let records = ctx.history.records();
    if records.is_empty() {
        eprintln!("No requests made.");
        return;
    }
    let table = tabled::Table::new(records.iter().map(RequestRow::from))
        .with(tabled::settings::Style::rounded())
        .to_string();
    let summary = ctx.history.summary();
    eprintln!("{table}");
    eprintln!(
        "{} requests: {} ok, {} failed ({} rate limited), avg {} ms",
        summary.total, summary.succeeded, summary.failed, summary.rate_limited, summary.average_ms
    );
}
