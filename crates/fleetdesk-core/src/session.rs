//! Session and user types
//!
//! A `Session` is the in-memory view of who is signed in. It is owned by the
//! session context; everything else reads snapshots of it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::permission::PermissionMap;
use crate::record::preferred_id;
use crate::resource::{Action, Resource};
use crate::tenant::{Tenant, TenantId};
use crate::{Error, Result};

/// Signed-in user profile as returned by the account endpoint.
///
/// The id is read from `_id`, then `id`; both may be present. A blank
/// `tenantId` means no tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UserWire")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub permissions: PermissionMap,
    pub tenant_id: Option<TenantId>,

    /// Embedded tenant, when the backend populates it
    pub tenant: Option<Tenant>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserWire {
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    permissions: PermissionMap,
    #[serde(default, alias = "tenant_id")]
    tenant_id: Option<String>,
    #[serde(default)]
    tenant: Option<Tenant>,
}

impl TryFrom<UserWire> for User {
    type Error = Error;

    fn try_from(wire: UserWire) -> Result<Self> {
        let id = preferred_id(wire.mongo_id.as_ref(), wire.id.as_ref())
            .ok_or_else(|| Error::InvalidRecord("user has no id".to_string()))?;
        let tenant_id = match wire.tenant_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(TenantId::from_string(raw)?),
            _ => None,
        };
        Ok(Self {
            id,
            name: wire.name,
            email: wire.email,
            role: wire.role,
            permissions: wire.permissions,
            tenant_id,
            tenant: wire.tenant,
        })
    }
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            role: None,
            permissions: PermissionMap::default(),
            tenant_id: None,
            tenant: None,
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionMap) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenant_id = Some(tenant.id.clone());
        self.tenant = Some(tenant);
        self
    }

    /// Tenant ID from the embedded tenant, falling back to the bare reference
    pub fn effective_tenant_id(&self) -> Option<&TenantId> {
        self.tenant
            .as_ref()
            .map(|t| &t.id)
            .or(self.tenant_id.as_ref())
    }
}

/// Authentication lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Loading,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub state: AuthState,
}

impl Session {
    pub fn loading() -> Self {
        Self {
            user: None,
            state: AuthState::Loading,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            state: AuthState::Authenticated,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            user: None,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated && self.user.is_some()
    }

    /// Fail-closed permission check; no user means no permissions
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.permissions.allows(resource, action))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}
