//! The `run` command: the long-running monitor loop.

use tokio_util::sync::CancellationToken;
use tracing::info;

use fordwatch_core::{Monitor, NotificationDispatcher, StateStore};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = fordwatch_config::load_config()?;
    if let Some(interval) = args.interval {
        cfg.interval_secs = interval;
    }

    let policy = fordwatch_config::detect_policy(&cfg)?;
    let monitor_config = fordwatch_config::monitor_config(&cfg)?;
    let state_path = fordwatch_config::state_path(&cfg);
    let client = util::build_client(&cfg, global)?;

    info!(
        vin = client.vin(),
        interval_secs = cfg.interval_secs,
        state = %state_path.display(),
        "starting battery monitor"
    );

    let monitor = Monitor::new(
        client,
        StateStore::new(state_path),
        NotificationDispatcher::for_platform(),
        policy,
        monitor_config,
    );

    // Ctrl-C cancels the loop between cycles, interrupting any sleep.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received -- shutting down");
                cancel.cancel();
            }
        });
    }

    monitor.run(cancel).await.map_err(CliError::from)
}
