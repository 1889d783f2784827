//! Domain layer between `fordwatch-api` and the CLI binary.
//!
//! This crate owns the engineering content of the monitor:
//!
//! - **[`Monitor`]** — the poll loop. One fetch-compare-notify cycle at a
//!   time, exponential backoff on transient failures, bounded retries on
//!   authentication failures, prompt cancellation between cycles.
//!
//! - **[`detect`](detect::detect)** — pure change detection over two
//!   normalized status records under quantization/hysteresis rules,
//!   producing one batched human-readable message.
//!
//! - **[`StateStore`]** — the last observed status, persisted as a small
//!   JSON file with atomic writes so restarts compare against the right
//!   baseline.
//!
//! - **[`NotificationDispatcher`]** — best-effort delivery through a
//!   priority-ordered list of platform notifiers, with a plain-text
//!   fallback so a change is never silently lost.

pub mod config;
pub mod detect;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BackoffConfig, MonitorConfig};
pub use detect::{ChangeResult, DetectPolicy, FirstObservation, RangeUnit, detect};
pub use error::CoreError;
pub use monitor::{Monitor, NOTIFICATION_TITLE};
pub use notify::{NotificationDispatcher, NotifyBackend};
pub use state::{PersistedState, StateStore};

// Re-export the normalized status type for consumers.
pub use fordwatch_api::VehicleStatus;
