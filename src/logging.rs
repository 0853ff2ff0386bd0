//! File-based logging setup.
//!
//! The host is a menu-bar app with no terminal of its own, so logs go to a
//! rotating file. The host may also install its own subscriber instead of
//! calling this.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "nowbar";

/// Initialize the logging system.
///
/// Logs are written to `.logs/nowbar.YYYY-MM-DD.log` with daily rotation.
/// The log level can be controlled via the `RUST_LOG` environment variable;
/// by default the crate logs at DEBUG and everything else at WARN.
///
/// The returned guard flushes the non-blocking writer on drop; the host must
/// keep it alive for as long as it wants logs written.
pub fn init_logging() -> anyhow::Result<WorkerGuard> {
    init_logging_to(Path::new(LOG_DIR))
}

fn init_logging_to(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);

    // Non-blocking writer so logging never stalls the async runtime.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nowbar_core=debug,warn"));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI colors in log files
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Logging initialized - logs written to {}/", log_dir.display());

    Ok(guard)
}
