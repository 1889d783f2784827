//! Configuration for the fordwatch monitor.
//!
//! TOML file + environment merging, credential resolution
//! (env + keyring + plaintext), and translation into the core crate's
//! `MonitorConfig` / `DetectPolicy`.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fordwatch_core::{
    BackoffConfig, DetectPolicy, FirstObservation, MonitorConfig, RangeUnit,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured (set {env_var}, add it to the config file, or store it in the keyring)")]
    MissingCredential { what: String, env_var: String },

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

// ── TOML config struct ──────────────────────────────────────────────

/// Top-level TOML configuration. One user, one vehicle -- no profiles.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Vehicle identification number.
    pub vin: Option<String>,

    /// FordPass account username/email.
    pub username: Option<String>,

    /// FordPass password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Polling interval in seconds.
    pub interval_secs: u64,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Range display unit: "km" or "miles".
    pub unit: String,

    /// Charge rounding granularity in percent.
    pub charge_step_percent: f64,

    /// Range rounding granularity, in the configured unit.
    pub range_step: f64,

    /// Whether the very first observation (no state on disk) fires a
    /// notification.
    pub notify_on_first_observation: bool,

    /// Consecutive auth failures before the monitor aborts.
    pub max_auth_failures: u32,

    /// Override for the state file location.
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vin: None,
            username: None,
            password: None,
            interval_secs: 60,
            timeout_secs: 30,
            unit: "km".into(),
            charge_step_percent: 1.0,
            range_step: 1.0,
            notify_on_first_observation: false,
            max_auth_failures: 3,
            state_path: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fordwatch", "fordwatch")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default state file location (config `state_path` overrides it).
pub fn default_state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fordwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from an explicit file path + environment.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FORDWATCH_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring service name used for the stored password.
const KEYRING_SERVICE: &str = "fordwatch";

/// Resolve the VIN: `FORDPASS_VIN` env var, then config.
pub fn resolve_vin(cfg: &Config) -> Result<String, ConfigError> {
    std::env::var("FORDPASS_VIN")
        .ok()
        .or_else(|| cfg.vin.clone())
        .ok_or_else(|| ConfigError::MissingCredential {
            what: "VIN".into(),
            env_var: "FORDPASS_VIN".into(),
        })
}

/// Resolve the account username: `FORDPASS_USERNAME` env var, then config.
pub fn resolve_username(cfg: &Config) -> Result<String, ConfigError> {
    std::env::var("FORDPASS_USERNAME")
        .ok()
        .or_else(|| cfg.username.clone())
        .ok_or_else(|| ConfigError::MissingCredential {
            what: "username".into(),
            env_var: "FORDPASS_USERNAME".into(),
        })
}

/// Resolve the password through the credential chain:
/// env var, system keyring, plaintext config.
pub fn resolve_password(cfg: &Config, username: &str) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var("FORDPASS_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::MissingCredential {
        what: "password".into(),
        env_var: "FORDPASS_PASSWORD".into(),
    })
}

/// Store the password in the system keyring.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, username)
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to core types ───────────────────────────────────────

/// Parse the configured range unit.
pub fn parse_unit(unit: &str) -> Result<RangeUnit, ConfigError> {
    match unit.to_ascii_lowercase().as_str() {
        "km" | "kilometers" | "kilometres" => Ok(RangeUnit::Km),
        "mi" | "miles" => Ok(RangeUnit::Miles),
        other => Err(ConfigError::Validation {
            field: "unit".into(),
            reason: format!("expected 'km' or 'miles', got '{other}'"),
        }),
    }
}

/// Build a `DetectPolicy` from the config.
pub fn detect_policy(cfg: &Config) -> Result<DetectPolicy, ConfigError> {
    if cfg.charge_step_percent <= 0.0 {
        return Err(ConfigError::Validation {
            field: "charge_step_percent".into(),
            reason: "must be positive".into(),
        });
    }
    if cfg.range_step <= 0.0 {
        return Err(ConfigError::Validation {
            field: "range_step".into(),
            reason: "must be positive".into(),
        });
    }

    Ok(DetectPolicy {
        charge_step_percent: cfg.charge_step_percent,
        range_step: cfg.range_step,
        range_unit: parse_unit(&cfg.unit)?,
        first_observation: if cfg.notify_on_first_observation {
            FirstObservation::Notify
        } else {
            FirstObservation::Suppress
        },
    })
}

/// Build a `MonitorConfig` from the config.
pub fn monitor_config(cfg: &Config) -> Result<MonitorConfig, ConfigError> {
    if cfg.interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "interval_secs".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(MonitorConfig {
        interval: Duration::from_secs(cfg.interval_secs),
        backoff: BackoffConfig::default(),
        max_auth_failures: cfg.max_auth_failures,
    })
}

/// The state file path: config override or the platform default.
pub fn state_path(cfg: &Config) -> PathBuf {
    cfg.state_path.clone().unwrap_or_else(default_state_path)
}

// ── Tests ───────────────────────────────────────────────────────────
