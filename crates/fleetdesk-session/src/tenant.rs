//! Tenant derived from the signed-in user

use fleetdesk_core::{Branding, Error, Result, Session, Tenant, TenantId};

/// Read-only view of the tenant the current user belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantContext {
    tenant: Option<Tenant>,
    tenant_id: Option<TenantId>,
}

impl TenantContext {
    pub fn from_session(session: &Session) -> Self {
        let Some(user) = session.user.as_ref().filter(|_| session.is_authenticated()) else {
            return Self::default();
        };
        Self {
            tenant: user.tenant.clone(),
            tenant_id: user.effective_tenant_id().cloned(),
        }
    }

    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    /// Known even when only a bare reference came with the user
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn branding(&self) -> Option<&Branding> {
        self.tenant.as_ref().map(|t| &t.branding)
    }

    /// Disabled when there is no tenant
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.tenant
            .as_ref()
            .is_some_and(|t| t.feature_enabled(feature))
    }

    /// The tenant, for operations that can't run without one
    pub fn require_tenant(&self) -> Result<&Tenant> {
        self.tenant.as_ref().ok_or_else(|| match &self.tenant_id {
            Some(id) => Error::TenantRequired(format!("tenant {} is not loaded", id)),
            None => Error::TenantRequired("user has no tenant".to_string()),
        })
    }
}
