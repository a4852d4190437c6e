//! Shared helpers for command handlers.

use chrono::{DateTime, Utc};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal the prompt cannot be shown, so `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Short timestamp for table cells.
pub fn short_time(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// Relative age, e.g. "3m ago".
pub fn age(at: Option<&DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "never".into();
    };
    let secs = Utc::now().signed_duration_since(*at).num_seconds().max(0);
    let secs = u64::try_from(secs).unwrap_or_default();
    let rounded = std::time::Duration::from_secs(secs);
    format!("{} ago", humantime::format_duration(rounded))
}

pub fn money(value: f64) -> String {
    format!("{value:.2}")
}
