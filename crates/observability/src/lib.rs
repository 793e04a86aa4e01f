//! Tracing/logging initialization for billflow binaries.

use tracing_subscriber::EnvFilter;

/// Initialize logging for the process.
///
/// Compact line-oriented output (the worker runs under a supervisor that
/// already timestamps and routes its stderr), filtered via `RUST_LOG`.
/// sqlx statement logging is noisy at info level, so it defaults to warn.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(true)
        .try_init();
}
