// ── API → model conversions ──
//
// The wire crate hands back loose JSON already folded into `Page` and
// `Mutation`. These impls lift them into the core model.

use backoffice_api::{Mutation, Page, PageMeta};

use crate::model::{Entity, Pagination};

impl From<PageMeta> for Pagination {
    fn from(meta: PageMeta) -> Self {
        Self {
            current_page: meta.current_page.max(1),
            last_page: meta.last_page.max(1),
            per_page: meta.per_page,
            total: meta.total,
        }
    }
}

/// Split a page into entities and its pagination descriptor.
pub(crate) fn page_into_model(page: Page) -> (Vec<Entity>, Option<Pagination>) {
    let items = page.items.into_iter().map(Entity::new).collect();
    (items, page.meta.map(Pagination::from))
}

/// The echoed entity of a write, when it carries an id.
pub(crate) fn mutation_entity(mutation: &Mutation) -> Option<Entity> {
    mutation
        .entity
        .clone()
        .map(Entity::new)
        .filter(|e| e.id().is_some())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_meta_is_clamped_to_one() {
        let p = Pagination::from(PageMeta {
            current_page: 0,
            last_page: 0,
            per_page: 10,
            total: 0,
        });
        assert_eq!((p.current_page, p.last_page), (1, 1));
    }

    #[test]
    fn mutation_without_id_has_no_entity() {
        let m = Mutation {
            entity: Some(json!({"message": "done"})),
            message: None,
        };
        assert!(mutation_entity(&m).is_none());
        let m = Mutation {
            entity: Some(json!({"id": 4, "name": "Acme"})),
            message: None,
        };
        assert_eq!(mutation_entity(&m).unwrap().id(), Some(4.into()));
    }
}
