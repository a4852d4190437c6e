//! CLI configuration: thin wrapper around `stockline_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --api-key, --insecure, --timeout).

use secrecy::SecretString;

use stockline_config::{Config, Profile, RuntimeConfig, build_runtime_config};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use stockline_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Apply flag overrides on top of a profile. Flags win over the file.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
        profile.enabled = true;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

/// Build the runtime config for this invocation.
///
/// With neither a matching profile nor `--api-url`, the run is local-only:
/// `remote` is `None` and commands that need the service report it.
pub fn build_runtime(global: &GlobalOpts) -> Result<RuntimeConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match (cfg.profiles.get(&profile_name), &global.api_url) {
        (Some(profile), _) => apply_overrides(profile.clone(), global),
        (None, Some(url)) => apply_overrides(Profile::new(url.clone()), global),
        (None, None) => {
            // An explicitly requested profile must exist.
            if global.profile.is_some() {
                cfg.profile(&profile_name)?;
            }
            tracing::debug!(profile = %profile_name, "no profile configured; local-only run");
            let mut local = Profile::new(String::new());
            local.enabled = false;
            return Ok(build_runtime_config(&local, &cfg.defaults, None)?);
        }
    };

    let api_key = match (profile.enabled, &global.api_key) {
        (false, _) => None,
        (true, Some(key)) => Some(SecretString::from(key.clone())),
        (true, None) => Some(stockline_config::resolve_api_key(&profile, &profile_name)?),
    };

    Ok(build_runtime_config(&profile, &cfg.defaults, api_key)?)
}
