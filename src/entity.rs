use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

/// Name used whenever a team/player/position reference cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Raw entity reference as it arrives from the provider: either an `{id, name}`
/// object or a bare string.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    Named { id: Option<u64>, name: String },
    Raw(String),
}

impl EntityRef {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let name = map.get("name").and_then(scalar_text)?;
                let id = map.get("id").and_then(as_u64_any);
                Some(EntityRef::Named { id, name })
            }
            other => scalar_text(other).map(EntityRef::Raw),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityRef::Named { name, .. } => name,
            EntityRef::Raw(name) => name,
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            EntityRef::Named { id, .. } => *id,
            EntityRef::Raw(_) => None,
        }
    }
}

/// A resolved team, player, or position. Equality and hashing only look at the
/// name, so `{"id": 7, "name": "Spain"}` and `"Spain"` are the same entity.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub name: String,
    pub id: Option<u64>,
}

impl Entity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn unknown() -> Self {
        Self::named(UNKNOWN)
    }

    /// Resolve any raw value. Total: missing or unparseable input becomes
    /// `"Unknown"`.
    pub fn resolve(value: Option<&Value>) -> Self {
        match value.and_then(EntityRef::from_value) {
            Some(r) => Self {
                id: r.id(),
                name: r.name().to_string(),
            },
            None => Self::unknown(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Entity {
    fn from(name: &str) -> Self {
        Entity::named(name)
    }
}

/// Canonical name for a raw entity value.
pub fn resolve_entity_name(value: Option<&Value>) -> String {
    Entity::resolve(value).name
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || is_null_marker(trimmed) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => {
            if n.as_f64().is_some_and(|v| !v.is_finite()) {
                None
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

// Dataframe round-trips leave these behind for missing cells.
fn is_null_marker(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "nan" | "none" | "null" | "<na>"
    )
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_and_flat_resolve_to_same_entity() {
        let structured = Entity::resolve(Some(&json!({"id": 772, "name": "Spain"})));
        let flat = Entity::resolve(Some(&json!("Spain")));
        assert_eq!(structured, flat);
        assert_eq!(structured.id, Some(772));
        assert_eq!(flat.id, None);
    }

    #[test]
    fn missing_and_unparseable_resolve_to_unknown() {
        assert!(Entity::resolve(None).is_unknown());
        assert!(Entity::resolve(Some(&Value::Null)).is_unknown());
        assert!(Entity::resolve(Some(&json!("NaN"))).is_unknown());
        assert!(Entity::resolve(Some(&json!("   "))).is_unknown());
        assert!(Entity::resolve(Some(&json!({"id": 3}))).is_unknown());
        assert!(Entity::resolve(Some(&json!([1, 2]))).is_unknown());
        assert!(Entity::resolve(Some(&json!(true))).is_unknown());
    }

    #[test]
    fn numeric_values_fall_back_to_their_text() {
        assert_eq!(resolve_entity_name(Some(&json!(10))), "10");
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(
            resolve_entity_name(Some(&json!({"name": "  Rodri "}))),
            "Rodri"
        );
    }
}
