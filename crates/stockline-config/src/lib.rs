//! Shared configuration for the stockline CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation into `stockline_core` runtime config. Core never sees
//! these types; it receives pre-built `RemoteConfig` / `SyncConfig` /
//! `ResolverConfig` values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use stockline_core::{RateLimitConfig, RemoteConfig, ResolverConfig, SyncConfig, TlsMode};

const KEYRING_SERVICE: &str = "stockline";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named inventory service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.profiles.keys().cloned().collect();
            available.sort();
            ConfigError::ProfileNotFound {
                name: name.into(),
                available,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Where the sync snapshot lives. Platform data dir when unset.
    pub state_dir: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            sync_interval_secs: default_sync_interval(),
            refresh_interval_secs: default_refresh_interval(),
            state_dir: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_sync_interval() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    30
}
fn default_enabled() -> bool {
    true
}

/// A named inventory service profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "https://inventory.example.com").
    pub api_url: String,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Use the remote service at all. When false everything runs on the
    /// bundled catalog.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Requests allowed per rate-limit window.
    pub rate_limit: Option<u32>,

    /// Rate-limit window length in seconds.
    pub rate_window_secs: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,
}

impl Profile {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            api_key_env: None,
            enabled: true,
            timeout: None,
            rate_limit: None,
            rate_window_secs: None,
            ca_cert: None,
            insecure: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "stockline", "stockline")
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("stockline");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for persisted sync state.
pub fn default_state_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("state"),
        |dirs| dirs.data_dir().join("state"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment overrides use `STOCKLINE_` with `__` between nesting
/// levels, e.g. `STOCKLINE_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("STOCKLINE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve an API key: `api_key_env` → system keyring → plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(key.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Runtime translation ─────────────────────────────────────────────

/// Everything the core needs for one run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// `None` when the profile disables the remote service.
    pub remote: Option<RemoteConfig>,
    pub resolver: ResolverConfig,
    pub sync: SyncConfig,
    pub state_dir: PathBuf,
}

fn positive(field: &str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(value))
}

/// Build the runtime config for a profile, resolving its API key through
/// the credential chain.
pub fn profile_to_runtime_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<RuntimeConfig, ConfigError> {
    let api_key = if profile.enabled {
        Some(resolve_api_key(profile, profile_name)?)
    } else {
        None
    };
    build_runtime_config(profile, defaults, api_key)
}

/// Build the runtime config with an already-resolved API key.
///
/// A disabled profile yields `remote: None` whatever the key.
pub fn build_runtime_config(
    profile: &Profile,
    defaults: &Defaults,
    api_key: Option<SecretString>,
) -> Result<RuntimeConfig, ConfigError> {
    let remote = match api_key {
        Some(api_key) if profile.enabled => Some(remote_config(profile, defaults, api_key)?),
        None if profile.enabled => {
            return Err(ConfigError::Validation {
                field: "api_key".into(),
                reason: "an API key is required when the profile is enabled".into(),
            });
        }
        _ => None,
    };

    let resolver = ResolverConfig {
        refresh_interval: positive("refresh_interval_secs", defaults.refresh_interval_secs)?,
        ..ResolverConfig::default()
    };
    let sync = SyncConfig {
        enabled: profile.enabled,
        interval: positive("sync_interval_secs", defaults.sync_interval_secs)?,
        ..SyncConfig::default()
    };

    Ok(RuntimeConfig {
        remote,
        resolver,
        sync,
        state_dir: defaults.state_dir.clone().unwrap_or_else(default_state_dir),
    })
}

fn remote_config(
    profile: &Profile,
    defaults: &Defaults,
    api_key: SecretString,
) -> Result<RemoteConfig, ConfigError> {
    let base_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected an http(s) URL, got '{}'", profile.api_url),
        });
    }

    let tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let defaults_limit = RateLimitConfig::default();
    let limit = profile.rate_limit.unwrap_or(defaults_limit.limit);
    if limit == 0 {
        return Err(ConfigError::Validation {
            field: "rate_limit".into(),
            reason: "must be greater than zero".into(),
        });
    }
    let window = match profile.rate_window_secs {
        Some(secs) => positive("rate_window_secs", secs)?,
        None => defaults_limit.window,
    };

    Ok(RemoteConfig {
        tls,
        timeout: positive("timeout", profile.timeout.unwrap_or(defaults.timeout))?,
        rate_limit: RateLimitConfig { limit, window },
        ..RemoteConfig::new(base_url, api_key)
    })
}
