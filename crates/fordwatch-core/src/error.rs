// ── Core error types ──
//
// User-facing errors from fordwatch-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<fordwatch_api::Error>` impl translates transport-layer
// errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the telemetry API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api { message: String },

    // ── Local state ──────────────────────────────────────────────────
    /// State file could not be written. Absorbed by the monitor loop
    /// (it continues with in-memory state), never fatal.
    #[error("Failed to persist state: {message}")]
    Persistence { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fordwatch_api::Error> for CoreError {
    fn from(err: fordwatch_api::Error) -> Self {
        match err {
            fordwatch_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            fordwatch_api::Error::SessionExpired { status } => CoreError::AuthenticationFailed {
                message: format!("token rejected (HTTP {status}) after re-authentication"),
            },
            fordwatch_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            fordwatch_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            fordwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid endpoint URL: {e}"),
            },
            fordwatch_api::Error::Api { status, message } => CoreError::Api {
                message: format!("HTTP {status}: {message}"),
            },
            fordwatch_api::Error::Deserialization { message } => CoreError::Api {
                message: format!("unexpected response shape: {message}"),
            },
        }
    }
}
