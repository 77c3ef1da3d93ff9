//! Schemaless domain records
//!
//! Record shapes belong to the backend. The client only relies on the
//! identifier, read from `_id` or `id`; every other field passes through
//! untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A value the query layer can cache and address by identifier
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier used for the entity's detail cache slot
    fn entity_id(&self) -> Option<String>;
}

/// A JSON object returned by a resource endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidRecord(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Record identifier; numeric ids are rendered as strings
    pub fn id(&self) -> Option<String> {
        preferred_id(self.0.get("_id"), self.0.get("id"))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Entity for Record {
    fn entity_id(&self) -> Option<String> {
        self.id()
    }
}

impl Entity for Value {
    fn entity_id(&self) -> Option<String> {
        Record::from_value(self.clone()).ok().and_then(|r| r.id())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identifier from `_id`, falling back to `id`. Blank strings don't count.
pub(crate) fn preferred_id(mongo_id: Option<&Value>, id: Option<&Value>) -> Option<String> {
    [mongo_id, id].into_iter().flatten().find_map(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
