// ── Account links ──
//
// Logical roles ("default sales account", "cash on hand", ...) mapped to
// concrete ledger accounts. The form never lets one account serve two
// roles and submits only the roles the user actually changed.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use super::EntityId;
use crate::error::CoreError;

/// One role row as loaded from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRole {
    pub key: String,
    pub label: String,
    /// Account linked server-side when the form was loaded.
    pub original: Option<EntityId>,
}

impl LinkRole {
    pub fn from_value(value: &Value) -> Option<Self> {
        let key = value
            .get("key")
            .or_else(|| value.get("role"))
            .and_then(Value::as_str)?
            .to_owned();
        let label = ["label", "name", "description"]
            .iter()
            .find_map(|k| value.get(k).and_then(Value::as_str))
            .map_or_else(|| key.replace('_', " "), String::from);
        let original = value
            .get("account_id")
            .and_then(EntityId::from_value)
            .or_else(|| {
                value
                    .get("account")
                    .and_then(|a| a.get("id"))
                    .and_then(EntityId::from_value)
            });
        Some(Self {
            key,
            label,
            original,
        })
    }
}

/// A role whose selection differs from the server-side link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkChange {
    pub key: String,
    pub account_id: Option<EntityId>,
}

impl LinkChange {
    pub fn to_value(&self) -> Value {
        json!({
            "key": self.key,
            "account_id": self.account_id.as_ref().map(EntityId::to_value),
        })
    }
}

/// Serialize a batch for `POST /account-links`.
pub fn changes_to_value(changes: &[LinkChange]) -> Value {
    Value::Array(changes.iter().map(LinkChange::to_value).collect())
}

#[derive(Debug, Clone, Default)]
pub struct AccountLinkForm {
    roles: Vec<LinkRole>,
    selected: IndexMap<String, Option<EntityId>>,
}

impl AccountLinkForm {
    pub fn new(roles: Vec<LinkRole>) -> Self {
        let selected = roles
            .iter()
            .map(|r| (r.key.clone(), r.original.clone()))
            .collect();
        Self { roles, selected }
    }

    pub fn from_values(values: &[Value]) -> Self {
        Self::new(values.iter().filter_map(LinkRole::from_value).collect())
    }

    pub fn roles(&self) -> &[LinkRole] {
        &self.roles
    }

    pub fn selection(&self, key: &str) -> Option<&EntityId> {
        self.selected.get(key).and_then(Option::as_ref)
    }

    /// An account is unavailable for `key` when another role currently
    /// selects it or is linked to it server-side.
    pub fn is_disabled(&self, key: &str, account: &EntityId) -> bool {
        self.roles.iter().filter(|r| r.key != key).any(|r| {
            r.original.as_ref() == Some(account)
                || self.selected.get(&r.key).and_then(Option::as_ref) == Some(account)
        })
    }

    /// Choose (or clear, with `None`) the account for a role.
    pub fn select(&mut self, key: &str, account: Option<EntityId>) -> Result<(), CoreError> {
        if !self.selected.contains_key(key) {
            return Err(CoreError::InvalidInput {
                message: format!("unknown account-link role: {key}"),
            });
        }
        if let Some(account) = &account {
            if self.is_disabled(key, account) {
                return Err(CoreError::InvalidInput {
                    message: format!("account {account} is already linked to another role"),
                });
            }
        }
        self.selected.insert(key.to_owned(), account);
        Ok(())
    }

    /// Restore a role to its server-side link.
    pub fn reset(&mut self, key: &str) {
        if let Some(role) = self.roles.iter().find(|r| r.key == key) {
            self.selected.insert(role.key.clone(), role.original.clone());
        }
    }

    /// Only roles whose selection differs from the original link.
    pub fn changes(&self) -> Vec<LinkChange> {
        self.roles
            .iter()
            .filter_map(|role| {
                let current = self.selected.get(&role.key).cloned().flatten();
                (current != role.original).then(|| LinkChange {
                    key: role.key.clone(),
                    account_id: current,
                })
            })
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn form() -> AccountLinkForm {
        AccountLinkForm::from_values(&[
            json!({"key": "sales", "label": "Default sales account", "account_id": 40}),
            json!({"key": "cash", "name": "Cash on hand", "account": {"id": 11}}),
            json!({"key": "receivables", "account_id": null}),
        ])
    }

    fn id(n: u64) -> EntityId {
        EntityId::Number(n)
    }

    #[test]
    fn loads_roles_from_assorted_shapes() {
        let f = form();
        assert_eq!(f.roles().len(), 3);
        assert_eq!(f.selection("cash"), Some(&id(11)));
        assert_eq!(f.roles()[2].label, "receivables");
        assert!(f.changes().is_empty());
    }

    #[test]
    fn accounts_of_other_roles_are_disabled() {
        let mut f = form();
        assert!(f.is_disabled("receivables", &id(40)));
        assert!(f.is_disabled("receivables", &id(11)));
        assert!(!f.is_disabled("sales", &id(40)));

        f.select("receivables", Some(id(77))).unwrap();
        assert!(f.is_disabled("sales", &id(77)));
        assert!(f.select("sales", Some(id(77))).is_err());
    }

    #[test]
    fn server_side_link_stays_disabled_after_reassignment() {
        let mut f = form();
        f.select("sales", Some(id(41))).unwrap();
        // 40 is still linked to "sales" on the server until this batch lands.
        assert!(f.is_disabled("cash", &id(40)));
    }

    #[test]
    fn submit_contains_only_touched_roles() {
        let mut f = form();
        f.select("receivables", Some(id(12))).unwrap();
        f.select("cash", Some(id(13))).unwrap();
        f.select("cash", Some(id(11))).unwrap(); // back to original
        let changes = f.changes();
        assert_eq!(
            changes,
            vec![LinkChange {
                key: "receivables".into(),
                account_id: Some(id(12)),
            }]
        );
        assert_eq!(
            changes_to_value(&changes),
            json!([{"key": "receivables", "account_id": 12}])
        );
    }

    #[test]
    fn reset_and_unknown_roles() {
        let mut f = form();
        f.select("sales", None).unwrap();
        assert!(f.is_dirty());
        f.reset("sales");
        assert!(!f.is_dirty());
        assert!(f.select("payables", Some(id(1))).is_err());
    }
}
