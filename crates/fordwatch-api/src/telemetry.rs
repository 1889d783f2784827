// Telemetry client and status normalization.
//
// A thin translation layer: one authenticated GET keyed by VIN, and the
// conversion from the vendor's `metrics` map into the fixed
// `VehicleStatus` shape. Optional metrics the vendor omits become `None`
// rather than failures -- a transient field dropout must not crash the
// poll loop.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::session::SessionManager;

// ── Wire types ───────────────────────────────────────────────────────

/// Vendor metric wrapper: `{ "value": ..., "updateTime": "..." }`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metric<T> {
    value: Option<T>,
    update_time: Option<DateTime<Utc>>,
}

/// The subset of the telemetry `metrics` map this monitor reads.
///
/// Every field is optional; the vendor drops metrics freely depending on
/// vehicle model and firmware.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Metrics {
    xev_battery_actual_state_of_charge: Metric<f64>,
    xev_battery_range: Metric<f64>,
    xev_plug_charger_status: Metric<String>,
    xev_battery_charge_display_status: Metric<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelemetryResponse {
    metrics: Metrics,
}

// ── Normalized status ────────────────────────────────────────────────

/// Normalized battery status for one observation.
///
/// Range is always kilometres here (the vendor reports km); unit
/// conversion happens at presentation time. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    /// State of charge, 0-100. `None` when the vehicle did not report it.
    pub charge_percent: Option<f64>,

    /// Estimated range in kilometres.
    pub range_km: Option<f64>,

    /// When the vendor says this reading was taken.
    pub raw_timestamp: Option<DateTime<Utc>>,

    /// Charge plug state, e.g. `"CONNECTED"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plug_status: Option<String>,

    /// Charging display state, e.g. `"IN_PROGRESS"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_status: Option<String>,
}

impl From<TelemetryResponse> for VehicleStatus {
    fn from(resp: TelemetryResponse) -> Self {
        let m = resp.metrics;
        Self {
            charge_percent: m.xev_battery_actual_state_of_charge.value,
            range_km: m.xev_battery_range.value,
            raw_timestamp: m
                .xev_battery_actual_state_of_charge
                .update_time
                .or(m.xev_battery_range.update_time),
            plug_status: m.xev_plug_charger_status.value,
            charging_status: m.xev_battery_charge_display_status.value,
        }
    }
}

/// First 200 characters of an error body, for diagnostics.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

// ── Client ───────────────────────────────────────────────────────────

/// Issues the authenticated status request for one vehicle.
pub struct VehicleStatusClient {
    session: SessionManager,
    vin: String,
}

impl VehicleStatusClient {
    pub fn new(session: SessionManager, vin: impl Into<String>) -> Self {
        Self {
            session,
            vin: vin.into(),
        }
    }

    /// The VIN this client is bound to.
    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// Fetch and normalize the current battery status.
    ///
    /// On a 401/403 the session is invalidated and the request retried
    /// exactly once with a freshly obtained token.
    pub async fn fetch(&self) -> Result<VehicleStatus, Error> {
        match self.fetch_once().await {
            Err(e) if e.is_auth_expired() => {
                warn!("token rejected by telemetry endpoint -- re-authenticating");
                self.session.invalidate();
                self.fetch_once().await
            }
            other => other,
        }
    }

    fn vehicle_url(&self) -> Result<Url, Error> {
        self.session
            .endpoints()
            .telemetry_base
            .join(&self.vin)
            .map_err(Error::InvalidUrl)
    }

    async fn fetch_once(&self) -> Result<VehicleStatus, Error> {
        let token = self.session.get_token().await?;
        let url = self.vehicle_url()?;

        debug!("GET {}", url);

        let resp = self
            .session
            .http()
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::SessionExpired {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let telemetry: TelemetryResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
            }
        })?;

        let status = VehicleStatus::from(telemetry);
        if status.charge_percent.is_none() && status.range_km.is_none() {
            warn!("telemetry response carried no battery metrics");
        }
        Ok(status)
    }
}
