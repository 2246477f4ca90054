//! Logging initialization.
//!
//! Structured logging via `tracing`, initialized once at startup. The
//! `CASKD_LOG` environment variable overrides the configured level using
//! the usual `EnvFilter` directives.

use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level (e.g. "info", "debug").
    pub level: String,
    /// Whether to include the module path in log lines.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Development settings: more detail, human-readable.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            include_target: true,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_env("CASKD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(LogConfig::default().level, "info");
    }

    #[test]
    fn test_development_level() {
        assert_eq!(LogConfig::development().level, "debug");
    }
}
