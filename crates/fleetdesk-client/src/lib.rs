//! Fleetdesk Client
//!
//! Composition root: loads `ClientConfig` and wires storage, the REST
//! client, the query cache and the app contexts into an [`App`].

pub mod app;
pub mod config;

pub use app::{App, AppError};
pub use config::{ApiSettings, CacheSettings, ClientConfig, ConfigError, StorageSettings, default_config_path};
