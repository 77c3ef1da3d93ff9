//! Error types for Fleetdesk Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Multi-tenancy errors
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("Tenant required: {0}")]
    TenantRequired(String),
}

pub type Result<T> = std::result::Result<T, Error>;
