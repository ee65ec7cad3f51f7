// ── Account / cost-center hierarchy ──
//
// The tree endpoints return nested nodes. `TreeView` holds the live
// open/selected state; every refetch goes through `replace_roots`,
// which captures that state, swaps the data and restores it (parents
// reopened before children, selection last, vanished ids dropped).

use std::collections::HashMap;

use backoffice_api::Language;
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;

use super::EntityId;
use super::entity::truthy;

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: EntityId,
    pub parent_id: Option<EntityId>,
    pub name: String,
    pub name_ar: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub can_have_children: bool,
    pub is_active: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Parse one node and its descendants. Nodes without an id are
    /// skipped along with their subtree.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(EntityId::from_value)?;
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let children: Vec<TreeNode> = value
            .get("children")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(TreeNode::from_value).collect())
            .unwrap_or_default();

        Some(Self {
            parent_id: value.get("parent_id").and_then(EntityId::from_value),
            name: text("name").unwrap_or_else(|| format!("#{id}")),
            name_ar: text("name_ar"),
            code: text("code"),
            category: text("category").or_else(|| text("type")),
            can_have_children: value
                .get("can_have_children")
                .and_then(truthy)
                .unwrap_or(!children.is_empty()),
            is_active: value.get("is_active").and_then(truthy).unwrap_or(true),
            children,
            id,
        })
    }

    /// `code name` in the requested language.
    pub fn label(&self, language: Language) -> String {
        let name = match language {
            Language::Ar => self.name_ar.as_deref().unwrap_or(&self.name),
            Language::En => &self.name,
        };
        match &self.code {
            Some(code) => format!("{code} {name}"),
            None => name.to_owned(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Parse a list of root nodes.
pub fn tree_from_values(values: &[Value]) -> Vec<TreeNode> {
    values.iter().filter_map(TreeNode::from_value).collect()
}

// ── Flattening ───────────────────────────────────────────────────────

/// One row of the parent-pointer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    pub id: EntityId,
    /// Parent in the fetched structure (not the possibly stale field).
    pub parent_id: Option<EntityId>,
    pub depth: usize,
    pub has_children: bool,
}

/// Pre-order flatten: every parent precedes its children.
pub fn flatten(roots: &[TreeNode]) -> Vec<FlatNode> {
    let mut out = Vec::new();
    walk(roots, None, 0, &mut |_: &TreeNode| true, &mut out);
    out
}

fn walk(
    nodes: &[TreeNode],
    parent: Option<&EntityId>,
    depth: usize,
    descend: &mut dyn FnMut(&TreeNode) -> bool,
    out: &mut Vec<FlatNode>,
) {
    for node in nodes {
        out.push(FlatNode {
            id: node.id.clone(),
            parent_id: parent.cloned(),
            depth,
            has_children: node.has_children(),
        });
        if descend(node) {
            walk(&node.children, Some(&node.id), depth + 1, descend, out);
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Open and selected ids captured before a refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Open ids in pre-order (parents first).
    pub open: Vec<EntityId>,
    pub selected: Option<EntityId>,
}

impl TreeSnapshot {
    pub fn capture(view: &TreeView) -> Self {
        let open = flatten(&view.roots)
            .into_iter()
            .map(|n| n.id)
            .filter(|id| view.open.contains(id))
            .collect();
        Self {
            open,
            selected: view.selected.clone(),
        }
    }

    /// Reapply onto `view` (whose roots have already been replaced).
    ///
    /// Returns the ids reopened, in the order they were opened.
    pub fn restore(&self, view: &mut TreeView) -> Vec<EntityId> {
        view.open.clear();
        let wanted: IndexSet<&EntityId> = self.open.iter().collect();
        let mut reopened = Vec::new();
        for node in flatten(&view.roots) {
            if wanted.contains(&node.id) {
                view.open.insert(node.id.clone());
                reopened.push(node.id);
            }
        }
        view.selected = self.selected.clone().filter(|id| view.parents.contains_key(id));
        reopened
    }
}

// ── Live view state ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TreeView {
    roots: Vec<TreeNode>,
    open: IndexSet<EntityId>,
    selected: Option<EntityId>,
    /// id -> parent id, rebuilt with the roots.
    parents: HashMap<EntityId, Option<EntityId>>,
}

impl TreeView {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        let mut view = Self::default();
        view.set_roots_raw(roots);
        view
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    /// Swap in freshly fetched roots, preserving open/selected state.
    pub fn replace_roots(&mut self, roots: Vec<TreeNode>) -> Vec<EntityId> {
        let snapshot = TreeSnapshot::capture(self);
        self.set_roots_raw(roots);
        snapshot.restore(self)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot::capture(self)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.parents.contains_key(id)
    }

    pub fn find(&self, id: &EntityId) -> Option<&TreeNode> {
        let path = self.path_to(id);
        let mut nodes = &self.roots;
        let mut found = None;
        for step in &path {
            let node = nodes.iter().find(|n| &n.id == step)?;
            nodes = &node.children;
            found = Some(node);
        }
        found
    }

    /// Ids from the root down to `id` (inclusive). Empty if unknown or
    /// if the parent chain loops (a self-parent or a repeated id).
    pub fn path_to(&self, id: &EntityId) -> Vec<EntityId> {
        let mut path = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let Some(parent) = self.parents.get(&current) else {
                return Vec::new();
            };
            if path.len() >= self.parents.len() {
                return Vec::new();
            }
            cursor = parent.clone();
            path.push(current);
        }
        path.reverse();
        path
    }

    // ── Open state ───────────────────────────────────────────────────

    pub fn is_open(&self, id: &EntityId) -> bool {
        self.open.contains(id)
    }

    pub fn open_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.open.iter()
    }

    pub fn open(&mut self, id: &EntityId) {
        if self.contains(id) {
            self.open.insert(id.clone());
        }
    }

    pub fn close(&mut self, id: &EntityId) {
        self.open.shift_remove(id);
    }

    pub fn toggle(&mut self, id: &EntityId) {
        if self.is_open(id) {
            self.close(id);
        } else {
            self.open(id);
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        self.selected.as_ref().and_then(|id| self.find(id))
    }

    pub fn select(&mut self, id: Option<EntityId>) {
        self.selected = id.filter(|id| self.contains(id));
    }

    /// Rows reachable through open ancestors, in display order.
    pub fn visible_rows(&self) -> Vec<FlatNode> {
        let mut out = Vec::new();
        let open = &self.open;
        walk(&self.roots, None, 0, &mut |n: &TreeNode| open.contains(&n.id), &mut out);
        out
    }

    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    pub fn select_prev(&mut self) {
        self.step_selection(-1);
    }

    /// Close the selected node, or move to its parent when already closed.
    pub fn collapse_or_parent(&mut self) {
        let Some(id) = self.selected.clone() else { return };
        if self.is_open(&id) {
            self.close(&id);
        } else if let Some(Some(parent)) = self.parents.get(&id) {
            self.selected = Some(parent.clone());
        }
    }

    fn step_selection(&mut self, delta: isize) {
        let rows = self.visible_rows();
        if rows.is_empty() {
            self.selected = None;
            return;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|id| rows.iter().position(|r| &r.id == id));
        let next = match current {
            None => 0,
            Some(i) => i.saturating_add_signed(delta).min(rows.len() - 1),
        };
        self.selected = rows.get(next).map(|r| r.id.clone());
    }

    fn set_roots_raw(&mut self, roots: Vec<TreeNode>) {
        self.parents = flatten(&roots)
            .into_iter()
            .map(|n| (n.id, n.parent_id))
            .collect();
        self.roots = roots;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn id(n: u64) -> EntityId {
        EntityId::Number(n)
    }

    fn sample() -> Vec<TreeNode> {
        tree_from_values(&[
            json!({"id": 1, "code": "1", "name": "Assets", "name_ar": "الأصول", "children": [
                {"id": 11, "parent_id": 1, "code": "11", "name": "Current assets", "children": [
                    {"id": 111, "parent_id": 11, "code": "111", "name": "Cash", "can_have_children": 0}
                ]},
                {"id": 12, "parent_id": 1, "code": "12", "name": "Fixed assets", "children": []}
            ]}),
            json!({"id": 2, "code": "2", "name": "Liabilities", "children": []}),
        ])
    }

    #[test]
    fn parses_nodes_leniently() {
        let roots = sample();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].can_have_children);
        assert!(!roots[1].can_have_children);
        assert_eq!(roots[0].label(Language::Ar), "1 الأصول");
        assert_eq!(roots[0].children[0].children[0].label(Language::En), "111 Cash");
    }

    #[test]
    fn flatten_is_preorder_with_parent_pointers() {
        let flat = flatten(&sample());
        let ids: Vec<_> = flat.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec![id(1), id(11), id(111), id(12), id(2)]);
        assert_eq!(flat[2].parent_id, Some(id(11)));
        assert_eq!(flat[2].depth, 2);
        assert!(flat[0].parent_id.is_none());
    }

    #[test]
    fn visible_rows_follow_open_state() {
        let mut view = TreeView::new(sample());
        assert_eq!(view.visible_rows().len(), 2);
        view.open(&id(1));
        assert_eq!(view.visible_rows().len(), 4);
        view.open(&id(11));
        assert_eq!(view.visible_rows().len(), 5);
    }

    #[test]
    fn refetch_restores_open_and_selected() {
        let mut view = TreeView::new(sample());
        view.open(&id(11));
        view.open(&id(1));
        view.select(Some(id(111)));
        let before: IndexSet<EntityId> = view.open_ids().cloned().collect();

        let reopened = view.replace_roots(sample());

        // Parent reopened before child regardless of the order they were opened in.
        assert_eq!(reopened, vec![id(1), id(11)]);
        let after: IndexSet<EntityId> = view.open_ids().cloned().collect();
        assert_eq!(before.len(), after.len());
        assert!(before.iter().all(|i| after.contains(i)));
        assert_eq!(view.selected(), Some(&id(111)));
        assert_eq!(view.selected_node().unwrap().name, "Cash");
    }

    #[test]
    fn vanished_nodes_are_dropped_on_restore() {
        let mut view = TreeView::new(sample());
        view.open(&id(1));
        view.open(&id(11));
        view.select(Some(id(111)));

        let pruned = tree_from_values(&[json!({"id": 1, "name": "Assets", "children": [
            {"id": 12, "name": "Fixed assets"}
        ]})]);
        let reopened = view.replace_roots(pruned);
        assert_eq!(reopened, vec![id(1)]);
        assert!(view.selected().is_none());
    }

    #[test]
    fn keyboard_navigation() {
        let mut view = TreeView::new(sample());
        view.select_next();
        assert_eq!(view.selected(), Some(&id(1)));
        view.toggle(&id(1));
        view.select_next();
        assert_eq!(view.selected(), Some(&id(11)));
        view.collapse_or_parent();
        assert_eq!(view.selected(), Some(&id(1)));
        view.collapse_or_parent();
        assert!(!view.is_open(&id(1)));
        view.select_prev();
        assert_eq!(view.selected(), Some(&id(1)));
    }

    #[test]
    fn path_to_walks_up_to_the_root() {
        let view = TreeView::new(sample());
        assert_eq!(view.path_to(&id(111)), vec![id(1), id(11), id(111)]);
        assert!(view.path_to(&id(999)).is_empty());
    }

    #[test]
    fn path_to_gives_up_on_a_parent_cycle() {
        // The repeated id makes 5 its own parent.
        let looped = tree_from_values(&[json!({"id": 5, "name": "Loop", "children": [
            {"id": 5, "parent_id": 5, "name": "Loop again"}
        ]})]);
        let view = TreeView::new(looped);
        assert!(view.path_to(&id(5)).is_empty());

        let mut view = TreeView::new(sample());
        view.parents.insert(id(1), Some(id(111)));
        assert!(view.path_to(&id(111)).is_empty());
    }
}
