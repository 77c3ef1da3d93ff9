//! Fail-closed permission map
//!
//! The backend sends permissions as `{ "<resource>": { "<action>": <value> } }`.
//! Keys are parsed into typed [`Resource`]/[`Action`] values; keys that do not
//! parse are dropped, since they can never be asked about. Values follow
//! truthiness: `true`, non-zero numbers, non-empty strings, arrays and objects
//! grant; `false`, `0`, `""` and `null` deny.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::resource::{Action, Resource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionMap {
    grants: BTreeMap<Resource, BTreeSet<Action>>,
}

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an action on a resource
    pub fn grant(&mut self, resource: Resource, action: Action) {
        self.grants.entry(resource).or_default().insert(action);
    }

    /// Builder-style grant
    pub fn with(mut self, resource: Resource, action: Action) -> Self {
        self.grant(resource, action);
        self
    }

    /// Revoke an action; the resource entry is dropped once empty
    pub fn revoke(&mut self, resource: Resource, action: Action) {
        if let Some(actions) = self.grants.get_mut(&resource) {
            actions.remove(&action);
            if actions.is_empty() {
                self.grants.remove(&resource);
            }
        }
    }

    /// Returns true only when the action was explicitly granted on the resource
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.grants
            .get(&resource)
            .is_some_and(|actions| actions.contains(&action))
    }

    /// String-keyed lookup; unknown names are denied
    pub fn allows_str(&self, resource: &str, action: &str) -> bool {
        match (resource.parse::<Resource>(), action.parse::<Action>()) {
            (Ok(resource), Ok(action)) => self.allows(resource, action),
            _ => false,
        }
    }

    /// Actions granted on a resource
    pub fn actions(&self, resource: Resource) -> impl Iterator<Item = Action> + '_ {
        self.grants.get(&resource).into_iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// JavaScript-style truthiness of a permission value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl Serialize for PermissionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.grants.len()))?;
        for (resource, actions) in &self.grants {
            let inner: BTreeMap<&str, bool> = actions.iter().map(|a| (a.as_str(), true)).collect();
            map.serialize_entry(resource.as_str(), &inner)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PermissionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PermissionVisitor;

        impl<'de> Visitor<'de> for PermissionVisitor {
            type Value = PermissionMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of resource names to action maps")
            }

            fn visit_unit<E>(self) -> Result<PermissionMap, E> {
                Ok(PermissionMap::default())
            }

            fn visit_none<E>(self) -> Result<PermissionMap, E> {
                Ok(PermissionMap::default())
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<PermissionMap, M::Error> {
                let mut permissions = PermissionMap::default();

                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    let Ok(resource) = key.parse::<Resource>() else {
                        debug!("Ignoring permissions for unknown resource '{}'", key);
                        continue;
                    };
                    let Value::Object(actions) = value else {
                        continue;
                    };
                    for (action_key, granted) in actions {
                        match action_key.parse::<Action>() {
                            Ok(action) if is_truthy(&granted) => permissions.grant(resource, action),
                            Ok(_) => {}
                            Err(_) => {
                                debug!("Ignoring unknown action '{}' on '{}'", action_key, key)
                            }
                        }
                    }
                }

                Ok(permissions)
            }
        }

        deserializer.deserialize_any(PermissionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> PermissionMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_explicit_grant_only() {
        let perms = parse(json!({"invoice": {"edit": true}}));
        assert!(perms.allows(Resource::Invoice, Action::Edit));
        assert!(!perms.allows(Resource::Invoice, Action::Delete));
        assert!(!perms.allows(Resource::Bank, Action::Edit));
    }

    #[test]
    fn test_falsy_values_deny() {
        let perms = parse(json!({
            "trip": {"view": false, "create": 0, "edit": "", "delete": null}
        }));
        for action in Action::ALL {
            assert!(!perms.allows(Resource::Trip, action), "{action} should be denied");
        }
        assert!(perms.is_empty());
    }

    #[test]
    fn test_truthy_values_grant() {
        let perms = parse(json!({"vehicle": {"view": 1, "create": "yes", "edit": {}}}));
        assert!(perms.allows(Resource::Vehicle, Action::View));
        assert!(perms.allows(Resource::Vehicle, Action::Create));
        assert!(perms.allows(Resource::Vehicle, Action::Edit));
        assert!(!perms.allows(Resource::Vehicle, Action::Delete));
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let perms = parse(json!({
            "spaceship": {"view": true},
            "driver": {"launch": true, "view": true},
            "tyre": true
        }));
        assert!(perms.allows(Resource::Driver, Action::View));
        assert_eq!(perms.actions(Resource::Driver).count(), 1);
        assert!(!perms.allows(Resource::Tyre, Action::View));
    }

    #[test]
    fn test_null_permissions_is_empty() {
        let perms = parse(Value::Null);
        assert!(perms.is_empty());
    }

    #[test]
    fn test_string_lookup() {
        let perms = PermissionMap::new().with(Resource::WorkOrder, Action::Create);
        assert!(perms.allows_str("workOrder", "create"));
        assert!(!perms.allows_str("workOrder", "approve"));
        assert!(!perms.allows_str("hangar", "create"));
    }

    #[test]
    fn test_revoke_removes_empty_resource() {
        let mut perms = PermissionMap::new().with(Resource::Part, Action::View);
        perms.revoke(Resource::Part, Action::View);
        assert!(perms.is_empty());
    }

    #[test]
    fn test_serialize_grants_only() {
        let perms = PermissionMap::new()
            .with(Resource::Invoice, Action::Edit)
            .with(Resource::Invoice, Action::View);
        let value = serde_json::to_value(&perms).unwrap();
        assert_eq!(value, json!({"invoice": {"view": true, "edit": true}}));
        assert_eq!(parse(value), perms);
    }
}
