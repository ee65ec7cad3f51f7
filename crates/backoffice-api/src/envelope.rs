// Response envelope normalization.
//
// List endpoints answer with `{data: [...], meta}`, `{data: {data: [...], meta}}`,
// a Laravel paginator (`{data: {data, current_page, last_page, ...}}`) or a
// bare array depending on the controller that produced them. Everything is
// folded into `Page` here, so nothing downstream probes shapes again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Types ────────────────────────────────────────────────────────────

/// Server pagination descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// `None` for unpaginated endpoints.
    pub meta: Option<PageMeta>,
}

/// Result of a write: the entity the server echoed back (if any) and
/// its success message (if any).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    pub entity: Option<Value>,
    pub message: Option<String>,
}

// ── Normalizers ──────────────────────────────────────────────────────

/// Fold any known list shape into a `Page`.
pub fn page_from_value(value: Value) -> Result<Page, Error> {
    match value {
        Value::Array(items) => Ok(Page { items, meta: None }),
        Value::Object(mut outer) => match outer.remove("data") {
            Some(Value::Array(items)) => {
                let meta = meta_from(&outer);
                Ok(Page { items, meta })
            }
            Some(Value::Object(mut inner)) => match inner.remove("data") {
                Some(Value::Array(items)) => {
                    let meta = meta_from(&inner).or_else(|| meta_from(&outer));
                    Ok(Page { items, meta })
                }
                other => Err(shape_error(
                    "nested list envelope without a data array",
                    other.unwrap_or(Value::Null),
                )),
            },
            Some(Value::Null) | None => Ok(Page::default()),
            Some(other) => Err(shape_error("list envelope with a non-list data field", other)),
        },
        Value::Null => Ok(Page::default()),
        other => Err(shape_error("unexpected list response", other)),
    }
}

/// Unwrap `{data: {...}}` to its inner object; anything else passes through.
pub fn unwrap_single(value: Value) -> Value {
    match value {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Extract the echoed entity and the success message from a write response.
pub fn mutation_from_value(value: Value) -> Mutation {
    let message = message_of(&value);
    let entity = match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => Some(data),
            Some(_) => None,
            None if map.contains_key("id") => Some(Value::Object(map)),
            None => None,
        },
        _ => None,
    };
    Mutation { entity, message }
}

/// The `message` field of a response body, if it is a non-empty string.
pub fn message_of(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(String::from)
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Locate pagination either under `meta` or flattened into the object.
fn meta_from(map: &Map<String, Value>) -> Option<PageMeta> {
    map.get("meta")
        .and_then(Value::as_object)
        .and_then(parse_meta)
        .or_else(|| parse_meta(map))
}

fn parse_meta(map: &Map<String, Value>) -> Option<PageMeta> {
    let current_page = number(map.get("current_page")?)?;
    let per_page = map.get("per_page").and_then(number).unwrap_or(0);
    let total = map.get("total").and_then(number).unwrap_or(0);
    let last_page = map.get("last_page").and_then(number).unwrap_or_else(|| {
        if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        }
    });

    Some(PageMeta {
        current_page: u32::try_from(current_page).unwrap_or(u32::MAX),
        last_page: u32::try_from(last_page.max(1)).unwrap_or(u32::MAX),
        per_page: u32::try_from(per_page).unwrap_or(u32::MAX),
        total,
    })
}

/// Accept numbers and numeric strings alike.
fn number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn shape_error(what: &str, value: Value) -> Error {
    let body = value.to_string();
    let preview: String = body.chars().take(200).collect();
    Error::Deserialization {
        message: format!("{what} (body preview: {preview:?})"),
        body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn meta(current_page: u32, last_page: u32, per_page: u32, total: u64) -> Option<PageMeta> {
        Some(PageMeta {
            current_page,
            last_page,
            per_page,
            total,
        })
    }

    #[test]
    fn data_with_sibling_meta() {
        let page = page_from_value(json!({
            "data": [{"id": 1}, {"id": 2}],
            "meta": {"current_page": 2, "last_page": 5, "per_page": 2, "total": 10}
        }))
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.meta, meta(2, 5, 2, 10));
    }

    #[test]
    fn nested_data_with_meta() {
        let page = page_from_value(json!({
            "data": {
                "data": [{"id": 7}],
                "meta": {"current_page": "1", "last_page": "1", "per_page": "10", "total": "1"}
            }
        }))
        .unwrap();
        assert_eq!(page.items, vec![json!({"id": 7})]);
        assert_eq!(page.meta, meta(1, 1, 10, 1));
    }

    #[test]
    fn laravel_paginator_inside_data() {
        let page = page_from_value(json!({
            "status": true,
            "data": {
                "current_page": 3,
                "data": [{"id": 21}],
                "last_page": 3,
                "per_page": 10,
                "total": 21
            }
        }))
        .unwrap();
        assert_eq!(page.meta, meta(3, 3, 10, 21));
    }

    #[test]
    fn missing_last_page_is_derived_from_total() {
        let page = page_from_value(json!({
            "data": [],
            "meta": {"current_page": 1, "per_page": 10, "total": 31}
        }))
        .unwrap();
        assert_eq!(page.meta, meta(1, 4, 10, 31));
    }

    #[test]
    fn bare_array_is_unpaginated() {
        let page = page_from_value(json!([{"id": 1}])).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.meta.is_none());
    }

    #[test]
    fn scalar_data_is_rejected() {
        let err = page_from_value(json!({"data": "nope"})).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn single_record_unwraps_data() {
        assert_eq!(unwrap_single(json!({"data": {"id": 4}})), json!({"id": 4}));
        assert_eq!(unwrap_single(json!({"id": 4})), json!({"id": 4}));
    }

    #[test]
    fn mutation_keeps_entity_and_message() {
        let m = mutation_from_value(json!({"message": "Created", "data": {"id": 9}}));
        assert_eq!(m.entity, Some(json!({"id": 9})));
        assert_eq!(m.message.as_deref(), Some("Created"));

        let bare = mutation_from_value(json!({"id": 9, "name": "x"}));
        assert_eq!(bare.entity, Some(json!({"id": 9, "name": "x"})));
        assert!(bare.message.is_none());

        let empty = mutation_from_value(Value::Null);
        assert_eq!(empty, Mutation::default());
    }
}
