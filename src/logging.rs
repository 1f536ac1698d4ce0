//! Console + rotating file logging
//!
//! Files land in `<log_dir>/meteorite_dashboard.YYYY-MM-DD.log`.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,meteorite_dashboard=debug,eframe=warn,egui_glow=warn";

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(log_dir: &str) -> anyhow::Result<()> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "meteorite_dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer must outlive every log call, so the guard is never dropped
    std::mem::forget(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized. Log directory: {}", log_dir);
    Ok(())
}

/// Log an outgoing API request
#[macro_export]
macro_rules! log_fetch {
    ($endpoint:expr, $($field:tt)*) => {
        tracing::debug!(endpoint = %$endpoint, $($field)*, "Fetch issued");
    };
}

/// Log a failed fetch; the caller keeps the previous chart on screen
#[macro_export]
macro_rules! log_fetch_error {
    ($err:expr, $endpoint:expr, $($field:tt)*) => {
        tracing::error!(error = %$err, kind = ?$err.kind(), endpoint = %$endpoint, $($field)*, "Fetch failed");
    };
}
