//! List query parameters

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ApiError, Result};

/// Query parameters for a collection request.
///
/// Parameters are kept sorted so that two logically identical queries
/// serialize to the same string, which is also their cache identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `key=value` pairs (CLI style)
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut params = Self::new();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ApiError::Config(format!("Expected key=value, got '{}'", pair)))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ApiError::Config(format!("Empty parameter name in '{}'", pair)));
            }
            params.insert(key, value.trim());
        }
        Ok(params)
    }

    /// URL-encoded query string, keys in sorted order
    pub fn to_query_string(&self) -> Result<String> {
        serde_urlencoded::to_string(&self.0)
            .map_err(|e| ApiError::Config(format!("Failed to encode query parameters: {}", e)))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for ListParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
