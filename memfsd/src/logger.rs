//! Daemon logger
//!
//! Thin setup over `env_logger`. The `--log-level` flag sets the default
//! filter; `RUST_LOG` still refines it per module.

use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};

/// Installs the logger
///
/// Fails if another logger is already installed.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    Builder::new()
        .filter_level(max_level)
        .parse_default_env()
        .try_init()
}

/// Parses a level name as accepted by `--log-level`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_init_installs_once() {
        let _ = init(LevelFilter::Info);
        assert!(init(LevelFilter::Debug).is_err());
        log::info!("logger installed");
    }
}
