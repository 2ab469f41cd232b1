//! File logging for the terminal app.
//!
//! The TUI owns stdout, so everything goes to `ringside.log` under
//! [`AppDirs::log_dir`]. `RINGSIDE_LOG` takes an `EnvFilter` directive and
//! defaults to `info`.

use ringside::app_dirs::AppDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILTER_ENV: &str = "RINGSIDE_LOG";

/// Installs the global subscriber. The returned guard flushes buffered
/// lines when dropped and must be held until exit.
///
/// Returns `None` without installing anything if the log directory is
/// unusable; the timer runs fine without logs.
pub fn init() -> Option<WorkerGuard> {
    let log_dir = AppDirs::log_dir()?;

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // No subscriber yet, and stdout is about to become the TUI.
        eprintln!("ringside: cannot create log directory {log_dir:?}: {e}");
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&log_dir, "ringside.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
    {
        eprintln!("ringside: logging already initialised: {e}");
        return None;
    }

    Some(guard)
}
