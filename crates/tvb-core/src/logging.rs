//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is human-readable. With a log directory, every event is also
//! written as one JSON object per line to a daily-rotating file, which serves
//! as the audit trail of alerts, decisions and order outcomes.
//!
//! The level comes from `RUST_LOG` when set, otherwise from the caller.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Call once at program start and keep the returned guard alive until exit;
/// dropping it flushes and stops the file writer.
///
/// # Parameters
///
/// - `log_level`: default level if `RUST_LOG` env var is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating JSON log files
/// - `file_prefix`: log file prefix (e.g. `"tvb-runner"` → `tvb-runner.log.2024-01-31`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, file_prefix: &str) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let console_layer = fmt::layer().with_target(false).with_ansi(true);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).init();
        return None;
    };

    let file_appender = tracing_appender::rolling::daily(dir, format!("{file_prefix}.log"));
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(writer).with_ansi(false).with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Some(guard)
}
