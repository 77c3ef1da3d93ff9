//! Structured logging setup

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log directive: {0}")]
    Directive(String),

    #[error("Global subscriber already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Let reqwest/hyper logs through at the configured level
    #[serde(default)]
    pub log_http: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_http: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Map a configured level name onto a tracing level; unknown names mean INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the env filter for a logging config
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::new(parse_level(&config.level).to_string());

    if !config.log_http {
        for directive in ["reqwest=warn", "hyper=warn", "hyper_util=warn"] {
            let directive = directive
                .parse()
                .map_err(|e| LoggingError::Directive(format!("{}: {}", directive, e)))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
