//! Logging setup for the binaries.
//!
//! Library code only emits `tracing` events with structured fields; this module
//! installs the subscriber that prints them. Environment overrides:
//!
//! - `LOG_LEVEL`: trace, debug, info, warn, error
//! - `LOG_FORMAT`: text or json
//! - `RUST_LOG`: full filter directives, wins over both of the above

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Extra directives appended to the level (e.g. "sqlx=warn")
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            filter_directives: Some("sqlx=warn".to_string()),
        }
    }
}

impl LogConfig {
    pub fn verbose(verbose: bool) -> Self {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        Self {
            level,
            ..Self::default()
        }
    }

    /// Apply `LOG_LEVEL` / `LOG_FORMAT` on top of `self`.
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level
                .parse()
                .map_err(|_| anyhow!("Invalid log level: {}", level))?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let mut directives = self.level.as_str().to_lowercase();
        if let Some(extra) = &self.filter_directives {
            directives.push(',');
            directives.push_str(extra);
        }
        Ok(EnvFilter::try_new(directives)?)
    }
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter()?)
        .with_target(false);

    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn verbose_raises_level() {
        assert_eq!(LogConfig::verbose(true).level, Level::DEBUG);
        assert_eq!(LogConfig::verbose(false).level, Level::INFO);
    }
}
