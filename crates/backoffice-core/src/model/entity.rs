// ── Opaque server record ──
//
// Entities are defined by the server and passed through unchanged.
// `Entity` only adds the handful of probes every screen needs.

use backoffice_api::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityId;

/// A single server record (one row of a list, or a detail payload).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Value);

impl Entity {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<EntityId> {
        self.0.get("id").and_then(EntityId::from_value)
    }

    /// Raw field lookup. Dotted paths walk nested objects (`currency.code`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |value, key| value.get(key))
            .filter(|v| !v.is_null())
    }

    /// Field rendered as display text: strings as-is, numbers and bools
    /// formatted, nested objects by their own display name.
    pub fn text(&self, path: &str) -> Option<String> {
        match self.field(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_owned()),
            nested @ Value::Object(_) => Some(Entity(nested.clone()).display_name(Language::En)),
            Value::Array(items) => Some(format!("{} items", items.len())),
            Value::Null => None,
        }
    }

    /// Human label: the localized name first, then the other language,
    /// then `title`, `code`, `number` and finally `#id`.
    pub fn display_name(&self, language: Language) -> String {
        let order: [&str; 2] = match language {
            Language::Ar => ["name_ar", "name"],
            Language::En => ["name", "name_ar"],
        };
        order
            .iter()
            .chain(["name_en", "title", "full_name", "code", "number"].iter())
            .find_map(|key| self.non_blank(key))
            .or_else(|| self.id().map(|id| format!("#{id}")))
            .unwrap_or_default()
    }

    /// Active flag, probing `is_active`, `active` and `status`.
    pub fn is_active(&self) -> Option<bool> {
        ["is_active", "active", "status"]
            .iter()
            .find_map(|key| self.field(key).and_then(truthy))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn non_blank(&self, key: &str) -> Option<String> {
        self.field(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

impl From<Value> for Entity {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Interpret the assorted ways the backend spells a boolean.
pub(crate) fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "active" | "yes" => Some(true),
            "0" | "false" | "inactive" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
