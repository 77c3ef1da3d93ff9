//! Fleetdesk Observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus) for API calls and the query cache
//! - Structured logging setup

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use metrics::Metrics;
