//! Shared construction helpers for command handlers.

use std::time::Duration;

use fordwatch_api::{Credentials, Endpoints, SessionManager, TransportConfig, VehicleStatusClient};
use fordwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve credentials and build an authenticated telemetry client.
///
/// CLI flags win over env vars and the config file for username and VIN;
/// the password always goes through the env → keyring → config chain.
pub fn build_client(cfg: &Config, global: &GlobalOpts) -> Result<VehicleStatusClient, CliError> {
    let username = match global.username.clone() {
        Some(u) => u,
        None => fordwatch_config::resolve_username(cfg)?,
    };
    let password = fordwatch_config::resolve_password(cfg, &username)?;
    let vin = match global.vin.clone() {
        Some(v) => v,
        None => fordwatch_config::resolve_vin(cfg)?,
    };

    let transport = TransportConfig {
        timeout: Duration::from_secs(cfg.timeout_secs),
    };
    let http = transport
        .build_client()
        .map_err(|e| CliError::ConnectionFailed {
            reason: e.to_string(),
        })?;

    let session = SessionManager::new(
        http,
        Credentials { username, password },
        Endpoints::production(),
    );
    Ok(VehicleStatusClient::new(session, vin))
}
