//! Fleetdesk Core Types
//!
//! This crate provides the fundamental types shared by every Fleetdesk crate:
//! - Typed capability keys (`Resource`, `Action`) and the fail-closed `PermissionMap`
//! - Session and user types
//! - Tenant identity and branding
//! - Schemaless domain records and the subtrip status timeline
//! - Core error types

pub mod error;
pub mod permission;
pub mod record;
pub mod resource;
pub mod session;
pub mod subtrip;
pub mod tenant;

pub use error::{Error, Result};
pub use permission::PermissionMap;
pub use record::{Entity, Record};
pub use resource::{Action, Resource};
pub use session::{AuthState, Session, User};
pub use tenant::{Branding, Tenant, TenantId};
