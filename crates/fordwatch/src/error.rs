//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` / `ConfigError` variants into user-facing errors
//! with actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fordwatch_config::ConfigError;
use fordwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fordwatch::auth_failed),
        help(
            "Verify your FordPass credentials.\n\
             Set FORDPASS_USERNAME / FORDPASS_PASSWORD, or store the password\n\
             in the system keyring under service 'fordwatch'."
        )
    )]
    AuthFailed { message: String },

    #[error("Missing credentials: {message}")]
    #[diagnostic(
        code(fordwatch::no_credentials),
        help(
            "Create a config file with: fordwatch config init\n\
             Or set the FORDPASS_USERNAME / FORDPASS_PASSWORD / FORDPASS_VIN\n\
             environment variables."
        )
    )]
    NoCredentials { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the telemetry API: {reason}")]
    #[diagnostic(
        code(fordwatch::connection_failed),
        help("Check your network connection; the vendor API may also be down.")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(fordwatch::timeout),
        help("Increase timeout_secs in the config file.")
    )]
    Timeout { seconds: u64 },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Telemetry API error: {message}")]
    #[diagnostic(code(fordwatch::api_error))]
    ApiError { message: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fordwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(fordwatch::config),
        help("Inspect the file with: fordwatch config show")
    )]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Api { message } | CoreError::Persistence { message } => {
                CliError::ApiError { message }
            }
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredential { .. } => CliError::NoCredentials {
                message: err.to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
