//! Cache keys

use fleetdesk_core::Resource;
use std::fmt;

/// What part of a resource family a cache entry holds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    /// A collection, keyed by its canonical query string
    List(String),
    /// A single record
    Detail(String),
    /// A sub-resource of one record, e.g. a vehicle's documents
    Sub {
        id: String,
        name: String,
        params: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn list(resource: Resource, params: impl Into<String>) -> Self {
        Self {
            resource,
            scope: QueryScope::List(params.into()),
        }
    }

    pub fn detail(resource: Resource, id: impl Into<String>) -> Self {
        Self {
            resource,
            scope: QueryScope::Detail(id.into()),
        }
    }

    pub fn sub(
        resource: Resource,
        id: impl Into<String>,
        name: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            scope: QueryScope::Sub {
                id: id.into(),
                name: name.into(),
                params: params.into(),
            },
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.scope, QueryScope::List(_))
    }

    pub fn is_sub(&self) -> bool {
        matches!(self.scope, QueryScope::Sub { .. })
    }

    /// The record this key is about, for detail and sub-resource keys
    pub fn record_id(&self) -> Option<&str> {
        match &self.scope {
            QueryScope::List(_) => None,
            QueryScope::Detail(id) | QueryScope::Sub { id, .. } => Some(id),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            QueryScope::List(params) if params.is_empty() => write!(f, "{}:list", self.resource),
            QueryScope::List(params) => write!(f, "{}:list?{}", self.resource, params),
            QueryScope::Detail(id) => write!(f, "{}:{}", self.resource, id),
            QueryScope::Sub { id, name, params } if params.is_empty() => {
                write!(f, "{}:{}/{}", self.resource, id, name)
            }
            QueryScope::Sub { id, name, params } => {
                write!(f, "{}:{}/{}?{}", self.resource, id, name, params)
            }
        }
    }
}
