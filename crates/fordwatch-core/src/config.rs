// Monitor runtime configuration.

use std::time::Duration;

/// Exponential backoff bounds for failed poll cycles.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry. Default: 5s.
    pub initial_delay: Duration,
    /// Upper bound on backoff delay. Default: 5 minutes.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

/// Configuration for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base polling interval between successful cycles.
    pub interval: Duration,

    /// Backoff bounds applied after transient failures.
    pub backoff: BackoffConfig,

    /// Consecutive authentication failures tolerated before the loop
    /// aborts. Bounded to avoid locking the account out with repeated
    /// bad login attempts.
    pub max_auth_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            backoff: BackoffConfig::default(),
            max_auth_failures: 3,
        }
    }
}
