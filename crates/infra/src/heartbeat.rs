//! Supervisor liveness signaling.

use std::path::PathBuf;

/// Port for per-iteration liveness signals.
///
/// Contract: best-effort. Implementations swallow their own failures; the
/// consumer loop must never slow down or fail because the supervisor
/// channel is absent.
pub trait Heartbeat: Send + Sync {
    fn notify(&self);
}

/// systemd watchdog notification: writes `WATCHDOG=1` to the notify channel.
///
/// Absence of the channel (not running under systemd) is not an error.
#[derive(Debug, Clone)]
pub struct SystemdWatchdog {
    path: PathBuf,
}

impl SystemdWatchdog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for SystemdWatchdog {
    fn default() -> Self {
        Self::new("/run/systemd/notify")
    }
}

impl Heartbeat for SystemdWatchdog {
    fn notify(&self) {
        let _ = std::fs::write(&self.path, "WATCHDOG=1\n");
    }
}

/// No-op heartbeat for tests and environments without a supervisor.
#[derive(Debug, Clone, Default)]
pub struct NoopHeartbeat;

impl Heartbeat for NoopHeartbeat {
    fn notify(&self) {}
}
