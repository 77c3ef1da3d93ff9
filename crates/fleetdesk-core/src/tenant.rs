//! Tenant types for multi-tenant deployments
//!
//! Every signed-in user belongs to exactly one tenant, the customer
//! organization whose branding and feature flags customize the console.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::record::preferred_id;
use crate::{Error, Result};

/// Unique identifier for a tenant.
///
/// The backend issues opaque string identifiers; the only constraint enforced
/// here is that an identifier is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidTenant(
                "Tenant ID must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_string(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Branding shown in the console shell and on generated documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Branding {
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A customer organization; the id is read from `_id`, then `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TenantWire")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub branding: Branding,

    /// Feature flags; absent flags are disabled
    pub features: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
struct TenantWire {
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    branding: Branding,
    #[serde(default)]
    features: BTreeMap<String, bool>,
}

impl TryFrom<TenantWire> for Tenant {
    type Error = Error;

    fn try_from(wire: TenantWire) -> Result<Self> {
        let id = preferred_id(wire.mongo_id.as_ref(), wire.id.as_ref())
            .ok_or_else(|| Error::InvalidTenant("Tenant ID must not be empty".to_string()))?;
        Ok(Self {
            id: TenantId::from_string(&id)?,
            name: wire.name,
            branding: wire.branding,
            features: wire.features,
        })
    }
}

impl Tenant {
    /// Check a feature flag (fail-closed)
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }

    /// Name to display, preferring the branded company name
    pub fn display_name(&self) -> &str {
        self.branding
            .company_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}
