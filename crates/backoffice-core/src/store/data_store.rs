// ── Central reactive data store ──
//
// One slot per resource holding the page on screen, the open detail
// record and (for hierarchical resources) the tree. Every mutation is
// broadcast to subscribers via `watch` channels.

use std::sync::Arc;

use backoffice_api::ListQuery;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Entity, EntityId, Pagination, Resource, TreeNode};
use crate::stream::SlotStream;

/// Client-side state of one resource module.
#[derive(Debug, Clone, Default)]
pub struct ResourceSlot {
    pub items: Vec<Entity>,
    pub pagination: Option<Pagination>,
    /// Query that produced `items`; refetches reuse it.
    pub query: ListQuery,
    pub details: Option<Entity>,
    pub tree: Vec<TreeNode>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ResourceSlot {
    pub fn find(&self, id: &EntityId) -> Option<&Entity> {
        self.items.iter().find(|e| e.id().as_ref() == Some(id))
    }

    pub fn current_page(&self) -> u32 {
        self.pagination
            .map(|p| p.current_page)
            .or(self.query.page)
            .unwrap_or(1)
    }
}

/// Issued/applied counters for list requests of one resource.
#[derive(Debug, Clone, Copy, Default)]
struct Sequence {
    issued: u64,
    applied: u64,
    in_flight: u32,
}

/// Reactive store for all resource slots.
///
/// Writes merge the entity the server echoes back into the slot in
/// place. List responses are applied newest-request-wins: a response
/// whose ticket is older than one already applied is dropped.
pub struct DataStore {
    slots: DashMap<Resource, watch::Sender<Arc<ResourceSlot>>>,
    sequences: DashMap<Resource, Sequence>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            sequences: DashMap::new(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn slot(&self, resource: Resource) -> Arc<ResourceSlot> {
        self.with_sender(resource, |tx| tx.borrow().clone())
    }

    pub fn subscribe(&self, resource: Resource) -> SlotStream {
        SlotStream::new(self.with_sender(resource, watch::Sender::subscribe))
    }

    // ── List sequencing ──────────────────────────────────────────────

    /// Reserve the next list ticket for `resource`.
    pub fn issue_ticket(&self, resource: Resource) -> u64 {
        let mut seq = self.sequences.entry(resource).or_default();
        seq.issued += 1;
        seq.in_flight += 1;
        seq.issued
    }

    /// Settle a ticket whose request failed.
    pub fn abandon_ticket(&self, resource: Resource) {
        let mut seq = self.sequences.entry(resource).or_default();
        seq.in_flight = seq.in_flight.saturating_sub(1);
    }

    /// A list request for `resource` is still on its way.
    pub fn has_pending_page(&self, resource: Resource) -> bool {
        self.sequences
            .get(&resource)
            .is_some_and(|seq| seq.in_flight > 0)
    }

    /// Apply a fetched page unless a newer one has already landed.
    /// Returns `false` when the response was stale and discarded.
    pub fn apply_page(
        &self,
        resource: Resource,
        ticket: u64,
        items: Vec<Entity>,
        pagination: Option<Pagination>,
        query: ListQuery,
    ) -> bool {
        {
            let mut seq = self.sequences.entry(resource).or_default();
            seq.in_flight = seq.in_flight.saturating_sub(1);
            if ticket < seq.applied {
                tracing::debug!(%resource, ticket, applied = seq.applied, "stale page dropped");
                return false;
            }
            seq.applied = ticket;
        }
        self.modify(resource, |slot| {
            slot.items = items;
            slot.pagination = pagination;
            slot.query = query;
            slot.fetched_at = Some(Utc::now());
        });
        true
    }

    // ── Write merges ─────────────────────────────────────────────────

    /// A created entity appears at the top of page one; on other pages
    /// only the total moves.
    pub fn merge_created(&self, resource: Resource, entity: Entity) {
        self.modify(resource, |slot| {
            let on_first_page = slot.pagination.is_none_or(|p| p.current_page <= 1);
            let existing = entity
                .id()
                .and_then(|id| slot.items.iter().position(|e| e.id().as_ref() == Some(&id)));
            if let Some(row) = existing.and_then(|idx| slot.items.get_mut(idx)) {
                *row = entity;
                return;
            }
            if on_first_page {
                slot.items.insert(0, entity);
                if let Some(per_page) = slot.pagination.map(|p| p.per_page).filter(|n| *n > 0) {
                    let per_page = usize::try_from(per_page).unwrap_or(usize::MAX);
                    slot.items.truncate(per_page);
                }
            }
            if let Some(p) = slot.pagination.as_mut() {
                p.adjust_total(1);
            }
        });
    }

    /// Replace an entity in place (list row and open details).
    /// Returns `true` if it was on screen.
    pub fn merge_updated(&self, resource: Resource, entity: Entity) -> bool {
        let Some(id) = entity.id() else {
            return false;
        };
        let mut found = false;
        self.modify(resource, |slot| {
            if let Some(existing) = slot.items.iter_mut().find(|e| e.id().as_ref() == Some(&id)) {
                *existing = entity.clone();
                found = true;
            }
            if slot
                .details
                .as_ref()
                .is_some_and(|d| d.id().as_ref() == Some(&id))
            {
                slot.details = Some(entity);
                found = true;
            }
        });
        found
    }

    /// Drop a deleted entity. Returns the adjusted pagination.
    pub fn remove_entity(&self, resource: Resource, id: &EntityId) -> Option<Pagination> {
        let mut pagination = None;
        self.modify(resource, |slot| {
            let before = slot.items.len();
            slot.items.retain(|e| e.id().as_ref() != Some(id));
            if slot.items.len() < before {
                if let Some(p) = slot.pagination.as_mut() {
                    p.adjust_total(-1);
                }
            }
            if slot
                .details
                .as_ref()
                .is_some_and(|d| d.id().as_ref() == Some(id))
            {
                slot.details = None;
            }
            pagination = slot.pagination;
        });
        pagination
    }

    // ── Details & trees ──────────────────────────────────────────────

    pub fn set_details(&self, resource: Resource, entity: Entity) {
        self.modify(resource, |slot| slot.details = Some(entity));
    }

    pub fn clear_details(&self, resource: Resource) {
        self.modify(resource, |slot| slot.details = None);
    }

    pub fn set_tree(&self, resource: Resource, tree: Vec<TreeNode>) {
        self.modify(resource, |slot| {
            slot.tree = tree;
            slot.fetched_at = Some(Utc::now());
        });
    }

    /// Forget everything (sign-out). In-flight list responses are
    /// discarded when they land.
    pub fn clear_all(&self) {
        for mut seq in self.sequences.iter_mut() {
            seq.issued += 1;
            seq.applied = seq.issued;
        }
        for entry in &self.slots {
            entry
                .value()
                .send_modify(|slot| *slot = Arc::new(ResourceSlot::default()));
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn with_sender<R>(
        &self,
        resource: Resource,
        f: impl FnOnce(&watch::Sender<Arc<ResourceSlot>>) -> R,
    ) -> R {
        let tx = self
            .slots
            .entry(resource)
            .or_insert_with(|| watch::channel(Arc::new(ResourceSlot::default())).0);
        f(tx.value())
    }

    fn modify(&self, resource: Resource, f: impl FnOnce(&mut ResourceSlot)) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.with_sender(resource, |tx| {
            tx.send_modify(|slot| f(Arc::make_mut(slot)));
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn vendor(id: u64, name: &str) -> Entity {
        Entity::new(json!({"id": id, "name": name}))
    }

    fn page(current: u32, total: u64) -> Option<Pagination> {
        Some(Pagination {
            current_page: current,
            last_page: u32::try_from(total.div_ceil(10).max(1)).unwrap(),
            per_page: 10,
            total,
        })
    }

    fn names(store: &DataStore) -> Vec<String> {
        store
            .slot(Resource::Vendors)
            .items
            .iter()
            .map(|e| e.display_name(backoffice_api::Language::En))
            .collect()
    }

    #[test]
    fn stale_page_is_discarded() {
        let store = DataStore::new();
        let older = store.issue_ticket(Resource::Vendors);
        let newer = store.issue_ticket(Resource::Vendors);

        assert!(store.apply_page(
            Resource::Vendors,
            newer,
            vec![vendor(11, "Page two")],
            page(2, 25),
            ListQuery::page(2),
        ));
        assert!(!store.apply_page(
            Resource::Vendors,
            older,
            vec![vendor(1, "Page one")],
            page(1, 25),
            ListQuery::page(1),
        ));
        assert_eq!(names(&store), vec!["Page two"]);
        assert_eq!(store.slot(Resource::Vendors).current_page(), 2);
    }

    #[test]
    fn in_order_pages_both_apply() {
        let store = DataStore::new();
        let a = store.issue_ticket(Resource::Vendors);
        let b = store.issue_ticket(Resource::Vendors);
        assert!(store.has_pending_page(Resource::Vendors));
        assert!(store.apply_page(Resource::Vendors, a, vec![], None, ListQuery::default()));
        assert!(store.apply_page(Resource::Vendors, b, vec![], None, ListQuery::default()));
        assert!(!store.has_pending_page(Resource::Vendors));
    }

    #[test]
    fn failed_request_settles_its_ticket() {
        let store = DataStore::new();
        store.issue_ticket(Resource::Safes);
        store.abandon_ticket(Resource::Safes);
        assert!(!store.has_pending_page(Resource::Safes));
    }

    #[test]
    fn created_entity_is_prepended_on_first_page() {
        let store = DataStore::new();
        let t = store.issue_ticket(Resource::Vendors);
        store.apply_page(
            Resource::Vendors,
            t,
            vec![vendor(1, "Acme")],
            page(1, 1),
            ListQuery::page(1),
        );
        store.merge_created(Resource::Vendors, vendor(2, "Globex"));
        assert_eq!(names(&store), vec!["Globex", "Acme"]);
        assert_eq!(store.slot(Resource::Vendors).pagination.unwrap().total, 2);
    }

    #[test]
    fn created_entity_off_first_page_only_moves_total() {
        let store = DataStore::new();
        let t = store.issue_ticket(Resource::Vendors);
        store.apply_page(
            Resource::Vendors,
            t,
            vec![vendor(11, "Initech")],
            page(2, 11),
            ListQuery::page(2),
        );
        store.merge_created(Resource::Vendors, vendor(12, "Hooli"));
        assert_eq!(names(&store), vec!["Initech"]);
        assert_eq!(store.slot(Resource::Vendors).pagination.unwrap().total, 12);
    }

    #[test]
    fn update_replaces_row_and_details() {
        let store = DataStore::new();
        let t = store.issue_ticket(Resource::Vendors);
        store.apply_page(Resource::Vendors, t, vec![vendor(1, "Acme")], None, ListQuery::default());
        store.set_details(Resource::Vendors, vendor(1, "Acme"));

        assert!(store.merge_updated(Resource::Vendors, vendor(1, "Acme Ltd")));
        let slot = store.slot(Resource::Vendors);
        assert_eq!(names(&store), vec!["Acme Ltd"]);
        assert_eq!(
            slot.details.as_ref().unwrap().text("name").as_deref(),
            Some("Acme Ltd")
        );
        assert!(!store.merge_updated(Resource::Vendors, vendor(9, "Elsewhere")));
    }

    #[test]
    fn removing_last_row_of_last_page_clamps() {
        let store = DataStore::new();
        let t = store.issue_ticket(Resource::Vendors);
        store.apply_page(
            Resource::Vendors,
            t,
            vec![vendor(21, "Lonely")],
            page(3, 21),
            ListQuery::page(3),
        );
        let p = store
            .remove_entity(Resource::Vendors, &EntityId::Number(21))
            .unwrap();
        assert_eq!(p.total, 20);
        assert_eq!(p.page_after_delete(0), 2);
        assert!(store.slot(Resource::Vendors).items.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_changes_and_clear_all() {
        let store = DataStore::new();
        let mut stream = store.subscribe(Resource::Banks);
        store.set_details(Resource::Banks, Entity::new(json!({"id": 1})));
        let snap = stream.changed().await.unwrap();
        assert!(snap.details.is_some());

        let ticket = store.issue_ticket(Resource::Banks);
        store.clear_all();
        assert!(store.slot(Resource::Banks).details.is_none());
        assert!(!store.apply_page(Resource::Banks, ticket, vec![], None, ListQuery::default()));
    }
}
