// ── Core identity type ──
//
// The backend mostly uses auto-increment integers, but a few endpoints
// (account-link roles, some pivots) key records by text. EntityId
// unifies both behind one hashable, displayable type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical identifier for any back-office record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(u64),
    Text(String),
}

impl EntityId {
    /// Read an id out of a JSON value. Numeric strings become numbers,
    /// blank strings and non-scalars yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(Self::Number)
                .or_else(|| Some(Self::Text(n.to_string()))),
            Value::String(s) if !s.trim().is_empty() => Some(Self::from(s.as_str())),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// JSON form used in request bodies.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(trimmed.to_owned()),
        }
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_strings_collapse_to_numbers() {
        assert_eq!(EntityId::from("42"), EntityId::Number(42));
        assert_eq!(EntityId::from_value(&json!("42")), Some(EntityId::Number(42)));
        assert_eq!(EntityId::from_value(&json!(42)), Some(EntityId::Number(42)));
    }

    #[test]
    fn text_ids_are_kept() {
        let id: EntityId = "default_sales".parse().unwrap();
        assert_eq!(id, EntityId::Text("default_sales".into()));
        assert_eq!(id.to_string(), "default_sales");
    }

    #[test]
    fn blank_and_null_are_not_ids() {
        assert!(EntityId::from_value(&json!("  ")).is_none());
        assert!(EntityId::from_value(&Value::Null).is_none());
        assert!(EntityId::from_value(&json!({"id": 1})).is_none());
    }

    #[test]
    fn round_trips_through_json() {
        assert_eq!(EntityId::Number(7).to_value(), json!(7));
        let parsed: EntityId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(parsed, EntityId::Text("abc".into()));
    }
}
