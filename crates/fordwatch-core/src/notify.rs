// Desktop notification dispatch.
//
// A closed set of tagged backend variants tried in priority order.
// Delivery is best-effort: a backend that fails (missing binary,
// nonzero exit) just hands off to the next one, and when every backend
// fails the message still lands on stdout. Nothing here can take the
// monitor loop down.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// One notification delivery strategy.
///
/// Program names are fields (not hardcoded in `deliver`) so tests can
/// point a variant at a nonexistent binary.
#[derive(Debug, Clone)]
pub enum NotifyBackend {
    /// macOS `osascript` display-notification.
    OsaScript { program: String },
    /// Linux libnotify via the `notify-send` CLI.
    NotifySend { program: String },
    /// Windows toast through a PowerShell one-liner.
    PowerShellToast { program: String },
    /// Plain line on stdout. Always succeeds.
    Console,
}

impl NotifyBackend {
    pub fn osascript() -> Self {
        Self::OsaScript {
            program: "osascript".into(),
        }
    }

    pub fn notify_send() -> Self {
        Self::NotifySend {
            program: "notify-send".into(),
        }
    }

    pub fn powershell_toast() -> Self {
        Self::PowerShellToast {
            program: "powershell".into(),
        }
    }

    /// Attempt delivery. Returns `true` on success; never panics.
    fn deliver(&self, title: &str, body: &str) -> bool {
        match self {
            Self::OsaScript { program } => {
                let esc = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    esc(body),
                    esc(title)
                );
                run_quiet(Command::new(program).arg("-e").arg(script))
            }
            Self::NotifySend { program } => {
                run_quiet(Command::new(program).arg(title).arg(body))
            }
            Self::PowerShellToast { program } => {
                // Balloon tip via Windows Forms -- works without any
                // toast module installed.
                let esc = |s: &str| s.replace('\'', "''");
                let script = format!(
                    "Add-Type -AssemblyName System.Windows.Forms; \
                     $n = New-Object System.Windows.Forms.NotifyIcon; \
                     $n.Icon = [System.Drawing.SystemIcons]::Information; \
                     $n.Visible = $true; \
                     $n.ShowBalloonTip(10000, '{}', '{}', 'Info')",
                    esc(title),
                    esc(body)
                );
                run_quiet(
                    Command::new(program)
                        .arg("-NoProfile")
                        .arg("-Command")
                        .arg(script),
                )
            }
            Self::Console => {
                println!("[NOTIFICATION] {title}: {body}");
                true
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OsaScript { .. } => "osascript",
            Self::NotifySend { .. } => "notify-send",
            Self::PowerShellToast { .. } => "powershell-toast",
            Self::Console => "console",
        }
    }
}

fn run_quiet(cmd: &mut Command) -> bool {
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Tries each available backend in priority order until one delivers.
///
/// Delivery runs external programs synchronously; async callers should
/// dispatch from a blocking task (the monitor loop does).
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    backends: Vec<NotifyBackend>,
}

impl NotificationDispatcher {
    /// Dispatcher with the backends appropriate to the running platform,
    /// console fallback last.
    pub fn for_platform() -> Self {
        let mut backends = Vec::new();
        if cfg!(target_os = "macos") {
            backends.push(NotifyBackend::osascript());
        } else if cfg!(target_os = "linux") {
            backends.push(NotifyBackend::notify_send());
        } else if cfg!(target_os = "windows") {
            backends.push(NotifyBackend::powershell_toast());
        }
        backends.push(NotifyBackend::Console);
        Self { backends }
    }

    /// Dispatcher over an explicit backend list (tests, headless setups).
    pub fn with_backends(backends: Vec<NotifyBackend>) -> Self {
        Self { backends }
    }

    /// Deliver (title, body) through the first backend that accepts it.
    ///
    /// Returns `false` only when every backend failed; even then the
    /// message is emitted as a plain line so it is never silently lost.
    pub fn notify(&self, title: &str, body: &str) -> bool {
        for backend in &self.backends {
            if backend.deliver(title, body) {
                debug!(backend = backend.name(), "notification delivered");
                return true;
            }
            warn!(backend = backend.name(), "notification backend failed");
        }

        println!("[NOTIFICATION] {title}: {body}");
        false
    }
}
