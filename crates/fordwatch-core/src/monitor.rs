// ── The monitor loop ──
//
// One fetch-compare-notify cycle at a time, strictly sequential.
// Transient failures back off exponentially and never kill the loop;
// repeated authentication failures do, after a bounded number of
// attempts. Every sleep races the cancellation token, so shutdown is
// prompt rather than waiting out the interval.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fordwatch_api::{Error as ApiError, VehicleStatusClient};

use crate::config::{BackoffConfig, MonitorConfig};
use crate::detect::{ChangeResult, DetectPolicy, detect};
use crate::error::CoreError;
use crate::notify::NotificationDispatcher;
use crate::state::{PersistedState, StateStore};

/// Title used for every battery notification.
pub const NOTIFICATION_TITLE: &str = "Ford EV Battery Update";

/// Owns the poll cycle and the process lifetime of the monitor.
pub struct Monitor {
    client: VehicleStatusClient,
    store: StateStore,
    dispatcher: NotificationDispatcher,
    policy: DetectPolicy,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        client: VehicleStatusClient,
        store: StateStore,
        dispatcher: NotificationDispatcher,
        policy: DetectPolicy,
        config: MonitorConfig,
    ) -> Self {
        Self {
            client,
            store,
            dispatcher,
            policy,
            config,
        }
    }

    /// Run until cancelled or fatally failed.
    ///
    /// Returns `Ok(())` on cancellation; the only error path is
    /// authentication failing `max_auth_failures` times in a row.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        let loaded = self.store.load();
        let mut last_notified_at = loaded.as_ref().and_then(|s| s.last_notified_at);
        let mut last = loaded.map(|s| s.last_known);
        if let Some(ref prev) = last {
            info!(
                charge = ?prev.charge_percent,
                range_km = ?prev.range_km,
                "loaded previous state"
            );
        }

        let mut transient_failures: u32 = 0;
        let mut auth_failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("monitor stopped");
                return Ok(());
            }

            match self.client.fetch().await {
                Ok(current) => {
                    transient_failures = 0;
                    auth_failures = 0;

                    info!(
                        charge = ?current.charge_percent,
                        range_km = ?current.range_km,
                        "battery status"
                    );

                    if let ChangeResult::Changed(message) =
                        detect(last.as_ref(), &current, &self.policy)
                    {
                        info!(%message, "battery status changed");
                        self.deliver(message).await;
                        last_notified_at = Some(Utc::now());
                    }

                    // Persist after every successful cycle, not just on
                    // change, so a restart never replays a stale baseline.
                    let state = PersistedState {
                        last_known: current.clone(),
                        last_notified_at,
                    };
                    if let Err(e) = self.store.save(&state) {
                        warn!(error = %e, "state not persisted -- continuing in memory");
                    }
                    last = Some(current);

                    if self.pause(self.config.interval, &cancel).await {
                        return Ok(());
                    }
                }

                Err(e @ (ApiError::Authentication { .. } | ApiError::SessionExpired { .. })) => {
                    auth_failures += 1;
                    if auth_failures >= self.config.max_auth_failures {
                        error!(
                            error = %e,
                            attempts = auth_failures,
                            "giving up after repeated authentication failures"
                        );
                        return Err(CoreError::from(e));
                    }

                    let delay = calculate_backoff(auth_failures - 1, &self.config.backoff);
                    warn!(error = %e, attempt = auth_failures, ?delay, "authentication failed");
                    if self.pause(delay, &cancel).await {
                        return Ok(());
                    }
                }

                Err(e) => {
                    transient_failures += 1;
                    let delay = calculate_backoff(transient_failures - 1, &self.config.backoff);
                    warn!(error = %e, attempt = transient_failures, ?delay, "poll cycle failed");
                    if self.pause(delay, &cancel).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Dispatch a notification without blocking the runtime.
    ///
    /// Backends run external programs synchronously, so delivery moves
    /// to a blocking task. Delivery failure is logged, never fatal.
    async fn deliver(&self, message: String) {
        let dispatcher = self.dispatcher.clone();
        match tokio::task::spawn_blocking(move || {
            dispatcher.notify(NOTIFICATION_TITLE, &message)
        })
        .await
        {
            Ok(true) => {}
            Ok(false) => warn!("no notification backend accepted the message"),
            Err(e) => warn!(error = %e, "notification task failed"),
        }
    }

    /// Sleep for `duration`, returning `true` if cancelled first.
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(duration) => false,
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25%, deterministically seeded from the attempt number.
pub fn calculate_backoff(attempt: u32, config: &BackoffConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
