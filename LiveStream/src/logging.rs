use lsconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

fn string_to_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Level filter from `logger.min_level`, forced to DEBUG in debug mode
pub fn configured_level(config: &Config) -> LevelFilter {
    if config.get_debug() {
        return LevelFilter::DEBUG;
    }
    match string_to_level(&config.get_log_min_level()) {
        Some(level) => LevelFilter::from_level(level),
        None => LevelFilter::INFO,
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, wins over the
/// configured level.
pub fn init_logging(config: &Config) {
    fn fmt_layer<S>() -> tracing_subscriber::fmt::Layer<S> {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    }

    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => Registry::default().with(env_filter).with(fmt_layer()).init(),
        Err(_) => Registry::default()
            .with(configured_level(config))
            .with(fmt_layer())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_level() {
        assert_eq!(string_to_level("info"), Some(Level::INFO));
        assert_eq!(string_to_level("Warning"), Some(Level::WARN));
        assert_eq!(string_to_level("verbose"), None);
    }

    #[test]
    fn test_debug_forces_debug_level() {
        let dir = tempfile::tempdir().unwrap();
        let vars = vec![
            ("LIVESTREAM_CONFIG__DEBUG".to_string(), "true".to_string()),
            ("LIVESTREAM_CONFIG__LOGGER__MIN_LEVEL".to_string(), "ERROR".to_string()),
        ];
        let config = Config::load_config_with_env(dir.path().to_str().unwrap(), vars).unwrap();
        assert_eq!(configured_level(&config), LevelFilter::DEBUG);

        let vars = vec![("LIVESTREAM_CONFIG__LOGGER__MIN_LEVEL".to_string(), "warn".to_string())];
        let config = Config::load_config_with_env(dir.path().to_str().unwrap(), vars).unwrap();
        assert_eq!(configured_level(&config), LevelFilter::WARN);
    }
}
