//! Command dispatch and the per-invocation context.

pub mod alerts;
pub mod analytics;
pub mod config_cmd;
pub mod movements;
pub mod products;
pub mod stats;
pub mod sync;
pub mod util;
pub mod watch;

use std::sync::Arc;

use stockline_config::RuntimeConfig;
use stockline_core::{
    Connectivity, CoreError, Envelope, InventoryClient, RequestHistory, RequestLog,
};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a command handler needs besides its own arguments.
pub struct Context {
    pub runtime: RuntimeConfig,
    pub history: Arc<RequestHistory>,
}

impl Context {
    pub fn new(runtime: RuntimeConfig) -> Self {
        Self {
            runtime,
            history: Arc::new(RequestHistory::default()),
        }
    }

    /// A client for the configured service, reporting into `history`.
    pub fn client(&self) -> Result<InventoryClient, CliError> {
        let remote = self.runtime.remote.as_ref().ok_or(CoreError::NotConfigured)?;
        let log: Arc<dyn RequestLog> = self.history.clone();
        Ok(remote.build_client(log)?)
    }

    /// Connectivity for the hybrid commands. Without a configured service
    /// it stays unconfigured and everything runs on the bundled catalog.
    pub async fn connectivity(&self) -> Result<Connectivity, CliError> {
        let connectivity = Connectivity::new();
        if self.runtime.remote.is_none() {
            tracing::info!("no inventory service configured; using local data");
            return Ok(connectivity);
        }
        let client = self.client()?;
        if !connectivity.connect(client).await {
            eprintln!("Inventory service unreachable; using local data until it responds.");
        }
        Ok(connectivity)
    }
}

/// Unwrap a remote call into its payload.
pub fn payload<T, E>(result: Result<Envelope<T>, E>) -> Result<T, CliError>
where
    CoreError: From<E>,
{
    let envelope = result.map_err(CoreError::from)?;
    envelope
        .into_data()
        .map_err(|e| CliError::from(Into::<CoreError>::into(e)))
}

/// Like [`payload`], naming the entity a 404 refers to.
pub fn entity_payload<T, E>(
    result: Result<Envelope<T>, E>,
    entity_type: &str,
    identifier: &str,
) -> Result<T, CliError>
where
    CoreError: From<E>,
{
    let envelope = result.map_err(|e| CoreError::from(e).for_entity(entity_type, identifier))?;
    envelope
        .into_data()
        .map_err(|e| CliError::from(Into::<CoreError>::into(e)))
}

pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Products(args) => products::handle(ctx, args, global).await,
        Command::Movements(args) => movements::handle(ctx, args, global).await,
        Command::Alerts(args) => alerts::handle(ctx, &args, global).await,
        Command::Stats => stats::handle(ctx, global).await,
        Command::Analytics(args) => analytics::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, &args, global).await,
        Command::Sync(args) => sync::handle(ctx, &args, global).await,
        // Handled before a context exists.
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
