//! Fleetdesk REST Client
//!
//! This crate is the client side of the dashboard backend's REST API:
//! - Shared HTTP client construction and retry policy
//! - Bearer-token authenticated JSON requests under `/api`
//! - Account endpoints (login, current user)
//! - Resource endpoint families (`/api/<entity>`, `/api/<entity>/:id`, `/api/<entity>/:id/<sub>`)

pub mod auth;
pub mod client;
pub mod error;
pub mod params;
pub mod resource;

pub use auth::{AuthApi, Credentials, LoginResponse};
pub use client::{ApiClient, HttpClientConfig, create_client, with_retry};
pub use error::{ApiError, FALLBACK_MESSAGE, Result};
pub use params::ListParams;
pub use resource::ResourceApi;
