//! Client configuration

use fleetdesk_api::HttpClientConfig;
use fleetdesk_observability::LoggingConfig;
use fleetdesk_query::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Seconds a fetched entry counts as fresh
    #[serde(default)]
    pub stale_time_secs: u64,

    /// Seconds before an entry is evicted
    #[serde(default = "default_gc_time_secs")]
    pub gc_time_secs: u64,

    /// Retries for failed queries; mutations never retry
    #[serde(default = "default_retry")]
    pub retry: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_state_path")]
    pub path: String,

    /// Keep state in memory only (nothing survives a restart)
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle(),
            user_agent: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time_secs: 0,
            gc_time_secs: default_gc_time_secs(),
            retry: default_retry(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            in_memory: false,
        }
    }
}

impl ApiSettings {
    pub fn http_config(&self) -> HttpClientConfig {
        let defaults = HttpClientConfig::default();
        HttpClientConfig {
            timeout_secs: self.timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            stale_time: Duration::from_secs(self.stale_time_secs),
            gc_time: Duration::from_secs(self.gc_time_secs),
            retry: self.retry,
        }
    }
}

impl StorageSettings {
    /// State file path with `~` expanded
    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

impl ClientConfig {
    /// Load from a `.toml` file, or YAML for any other extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults;
    /// environment overrides applied and the result validated
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(shellexpand::tilde(&path.to_string_lossy()).into_owned())?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `FLEETDESK_*` environment overrides
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("FLEETDESK_API_URL") {
            self.api.base_url = val;
        }

        if let Ok(val) = std::env::var("FLEETDESK_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("FLEETDESK_STATE_PATH") {
            self.storage.path = val;
        }

        if let Ok(val) = std::env::var("FLEETDESK_CACHE_RETRY") {
            match val.parse::<u32>() {
                Ok(retry) => self.cache.retry = retry,
                Err(_) => warn!("Ignoring invalid FLEETDESK_CACHE_RETRY '{}'", val),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.api.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config dir>/fleetdesk/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fleetdesk").join("config.yaml"))
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_max_idle() -> usize {
    8
}

fn default_gc_time_secs() -> u64 {
    300
}

fn default_retry() -> u32 {
    1
}

fn default_state_path() -> String {
    "~/.fleetdesk/state.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn temp_config(suffix: &str) -> NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    fn clear_env() {
        for var in [
            "FLEETDESK_API_URL",
            "FLEETDESK_LOG_LEVEL",
            "FLEETDESK_STATE_PATH",
            "FLEETDESK_CACHE_RETRY",
        ] {
            // SAFETY: env tests are serialized
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.cache.stale_time_secs, 0);
        assert_eq!(config.cache.gc_time_secs, 300);
        assert_eq!(config.cache.retry, 1);
        assert!(!config.storage.in_memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_sections() {
        let mut file = temp_config(".yaml");
        writeln!(
            file,
            "api:\n  base_url: https://fleet.example.com\ncache:\n  stale_time_secs: 30\nlogging:\n  format: json"
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://fleet.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.cache_config().stale_time, Duration::from_secs(30));
        assert_eq!(config.cache.retry, 1);
        assert_eq!(config.logging.format, fleetdesk_observability::LogFormat::Json);
    }

    #[test]
    fn test_toml_by_extension() {
        let mut file = temp_config(".toml");
        writeln!(
            file,
            "[storage]\npath = \"/tmp/fd.json\"\nin_memory = true\n\n[cache]\nretry = 3"
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert!(config.storage.in_memory);
        assert_eq!(config.storage.state_path(), PathBuf::from("/tmp/fd.json"));
        assert_eq!(config.cache.retry, 3);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let mut file = temp_config(".toml");
        writeln!(file, "[cache\nretry = ").unwrap();
        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig::default();
        config.api.base_url = "fleet.example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ClientConfig::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let settings = StorageSettings::default();
        let path = settings.state_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with(".fleetdesk/state.json"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: env tests are serialized
        unsafe {
            std::env::set_var("FLEETDESK_API_URL", "https://staging.fleet.test");
            std::env::set_var("FLEETDESK_LOG_LEVEL", "debug");
            std::env::set_var("FLEETDESK_CACHE_RETRY", "4");
        }

        let mut config = ClientConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.api.base_url, "https://staging.fleet.test");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cache.retry, 4);
    }

    #[test]
    #[serial]
    fn test_invalid_env_retry_is_ignored() {
        clear_env();
        // SAFETY: env tests are serialized
        unsafe { std::env::set_var("FLEETDESK_CACHE_RETRY", "lots") };

        let mut config = ClientConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.cache.retry, 1);
    }

    #[test]
    #[serial]
    fn test_load_rejects_bad_env_url() {
        clear_env();
        // SAFETY: env tests are serialized
        unsafe { std::env::set_var("FLEETDESK_API_URL", "ftp://nope") };

        let mut file = temp_config(".yaml");
        writeln!(file, "logging:\n  level: info").unwrap();
        let result = ClientConfig::load(Some(file.path()));
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
