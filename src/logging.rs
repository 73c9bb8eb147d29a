//! Process-level logging setup.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Verbosity of the process logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Install `env_logger` as the `log` backend.
///
/// `RUST_LOG` takes precedence over `log_level`. Calling this more than once is harmless; only the first
/// logger is kept.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
