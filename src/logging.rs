//! Logging setup and helpers for the CLI and gateway integrations.
//!
//! The library itself only emits through the `log` facade: exchange failures
//! at `warn`, baud switches and configuration loads at `info`, frame dumps at
//! `debug`. Binaries pick the backend; `env_logger` is the default here.

use crate::instrumentation::ExchangeStatistics;
use log::{debug, error, info, warn};
use std::fmt::Display;

/// Initializes the logger with the `env_logger` crate.
///
/// Verbosity follows `RUST_LOG`, falling back to `default_filter`; frame hex
/// dumps appear at `debug`. Later calls are ignored.
pub fn init_logger_with_default(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

pub fn log_error(message: impl Display) {
    error!("{message}");
}

pub fn log_warn(message: impl Display) {
    warn!("{message}");
}

pub fn log_info(message: impl Display) {
    info!("{message}");
}

pub fn log_debug(message: impl Display) {
    debug!("{message}");
}

/// Logs a one-line bus health summary, at `warn` once failures dominate.
pub fn log_statistics(label: &str, stats: &ExchangeStatistics) {
    let line = format!(
        "{label}: {}/{} exchanges ok ({:.1}%), {} timeouts, {} CRC errors, {} other",
        stats.successful_requests,
        stats.total_requests,
        stats.success_rate(),
        stats.timeouts,
        stats.crc_errors,
        stats.other_failures()
    );
    if stats.total_requests > 0 && stats.success_rate() < 50.0 {
        warn!("{line}");
    } else {
        info!("{line}");
    }
}
