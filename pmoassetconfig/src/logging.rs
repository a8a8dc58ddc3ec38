//! Initialisation of the `tracing` subscriber from the configuration.
//!
//! `RUST_LOG` wins when set; otherwise `log.min_level` is used.

use crate::Config;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Parses a level name (`TRACE`, `debug`, `Warn`, ...).
pub fn string_to_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Installs the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &Config) -> bool {
    let level = string_to_level(&config.get_log_min_level()).unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console = config
        .get_log_enable_console()
        .then(|| fmt::layer().with_target(true));

    Registry::default()
        .with(filter)
        .with(console)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_level() {
        assert_eq!(string_to_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(string_to_level("Warning"), Some(LevelFilter::WARN));
        assert_eq!(string_to_level("loud"), None);
    }
}
