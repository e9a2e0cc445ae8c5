//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The level comes from `--log-level`, else the `K_SYNC_LOG` environment
//! variable, else `info`. Logs go to stderr so that stdout only carries the
//! profile listing.

use clap::ValueEnum;
use tracing::Level;

pub static LOG_ENV_VAR: &str = "K_SYNC_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    cli_level
        .map(Level::from)
        .or_else(|| env_value.and_then(parse_level_str))
        .unwrap_or(Level::INFO)
}

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    tracing_subscriber::fmt()
        .with_max_level(resolve_level(cli_level, env_value.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
