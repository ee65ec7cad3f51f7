//! Account and cost-center hierarchies.
//!
//! Every refetch goes through `TreeView::replace_roots`, so expanded
//! branches and the selected node survive adds, edits and deletes. The
//! side panel shows the selected node's full record, fetched again after
//! every refetch, and lists the same actions as the node menu. The menu
//! closes on any key or click that is not aimed at it.

use std::cell::Cell;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use backoffice_core::{Command, Entity, EntityId, Language, Resource, TreeNode, TreeView};

use crate::action::{Action, ConfirmAction, Origin};
use crate::component::Component;
use crate::theme;
use crate::widgets::form::{FormEvent, RecordForm};
use crate::widgets::menu::{ContextMenu, MenuEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    AddChild,
    Edit,
    Toggle,
    Delete,
}

pub struct TreePane {
    resource: Resource,
    language: Language,
    action_tx: Option<UnboundedSender<Action>>,
    view: TreeView,
    loaded: bool,
    menu: Option<ContextMenu<NodeAction>>,
    form: Option<RecordForm>,
    /// Last record from the details slot.
    details: Option<Entity>,
    /// Node whose details were last requested.
    detail_for: Option<EntityId>,
    /// Set by writes; the next slot update refetches the details.
    details_stale: bool,
    rows_area: Cell<Rect>,
    offset: Cell<usize>,
}

/// Editable fields of a node, as a record.
fn node_entity(node: &TreeNode) -> Entity {
    let mut fields = Map::new();
    fields.insert("id".into(), node.id.to_value());
    fields.insert("name".into(), Value::String(node.name.clone()));
    for (key, value) in [
        ("name_ar", &node.name_ar),
        ("code", &node.code),
        ("category", &node.category),
    ] {
        if let Some(v) = value {
            fields.insert(key.into(), Value::String(v.clone()));
        }
    }
    Entity::new(Value::Object(fields))
}

impl TreePane {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            language: Language::En,
            action_tx: None,
            view: TreeView::new(Vec::new()),
            loaded: false,
            menu: None,
            form: None,
            details: None,
            detail_for: None,
            details_stale: false,
            rows_area: Cell::new(Rect::default()),
            offset: Cell::new(0),
        }
    }

    fn fetch(&mut self) -> Action {
        self.loaded = true;
        Action::Dispatch(Command::FetchTree {
            resource: self.resource,
        })
    }

    /// Actions offered for `node`, with their shortcut keys.
    fn node_actions(node: &TreeNode) -> Vec<(char, &'static str, NodeAction)> {
        let mut actions = Vec::with_capacity(4);
        if node.can_have_children {
            actions.push(('a', "Add child", NodeAction::AddChild));
        }
        actions.push(('e', "Edit", NodeAction::Edit));
        actions.push((
            't',
            if node.is_active { "Deactivate" } else { "Activate" },
            NodeAction::Toggle,
        ));
        actions.push(('d', "Delete", NodeAction::Delete));
        actions
    }

    fn node_menu(&self, node: &TreeNode) -> ContextMenu<NodeAction> {
        let items = Self::node_actions(node)
            .into_iter()
            .map(|(_, label, action)| (label.to_owned(), action))
            .collect();
        ContextMenu::new(node.label(self.language), items)
    }

    /// Request the selected node's record when the selection moved, or
    /// unconditionally when `force` is set.
    fn sync_details(&mut self, force: bool) -> Option<Action> {
        if !self.loaded {
            return None;
        }
        let selected = self.view.selected().cloned();
        if !force && selected == self.detail_for {
            return None;
        }
        self.detail_for.clone_from(&selected);
        selected.map(|id| {
            Action::Dispatch(Command::FetchDetails {
                resource: self.resource,
                id,
            })
        })
    }

    /// The fetched record of the selected node, once it has arrived.
    fn detail_entity(&self) -> Option<&Entity> {
        let id = self.detail_for.as_ref()?;
        self.details
            .as_ref()
            .filter(|d| d.id().as_ref() == Some(id))
    }

    fn open_menu(&mut self, at: Option<(u16, u16)>) {
        self.menu = self.view.selected_node().map(|node| {
            let menu = self.node_menu(node);
            match at {
                Some((column, row)) => menu.at(column, row),
                None => menu,
            }
        });
    }

    fn run(&mut self, action: NodeAction) -> Option<Action> {
        let node = self.view.selected_node()?;
        let id = node.id.clone();
        match action {
            NodeAction::AddChild => {
                if node.can_have_children {
                    self.form = Some(
                        RecordForm::create(self.resource).with_fixed("parent_id", id.to_value()),
                    );
                }
                None
            }
            NodeAction::Edit => {
                self.form = Some(RecordForm::edit(self.resource, &node_entity(node)));
                None
            }
            NodeAction::Toggle => Some(Action::Execute {
                origin: Origin::Tree(self.resource),
                command: Command::ToggleStatus {
                    resource: self.resource,
                    id,
                },
            }),
            NodeAction::Delete => Some(Action::ShowConfirm {
                confirm: ConfirmAction::Delete {
                    resource: self.resource,
                    id,
                    name: node.label(self.language),
                },
                origin: Some(Origin::Tree(self.resource)),
            }),
        }
    }

    fn menu_event(&mut self, event: MenuEvent<NodeAction>) -> Option<Action> {
        match event {
            MenuEvent::Pending => None,
            MenuEvent::Dismissed => {
                self.menu = None;
                None
            }
            MenuEvent::Chosen(action) => {
                self.menu = None;
                self.run(action)
            }
        }
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let node = self.view.selected_node();
        let fetched = self.detail_entity();
        let loading = if node.is_some() && fetched.is_none() {
            " · loading…"
        } else {
            ""
        };
        let block = Block::default()
            .title(format!(" Details{loading} "))
            .title_style(theme::title_style())
            .borders(Borders::LEFT)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(node) = node else {
            frame.render_widget(
                Paragraph::new(Span::styled("  No node selected", theme::key_hint())),
                inner,
            );
            return;
        };
        // Until the record arrives, show what the tree already knows.
        let entity = fetched.cloned().unwrap_or_else(|| node_entity(node));
        let mut lines = vec![Line::from(Span::styled(
            format!(" {}", entity.display_name(self.language)),
            theme::title_style(),
        ))];
        if let Some(fields) = entity.as_value().as_object() {
            let width = fields.keys().map(String::len).max().unwrap_or(0) + 1;
            lines.extend(
                fields
                    .keys()
                    .filter(|k| !matches!(k.as_str(), "children" | "attachments"))
                    .map(|key| {
                        Line::from(vec![
                            Span::styled(
                                format!(" {:<width$}", key.replace('_', " ")),
                                Style::default().fg(theme::DIM_WHITE),
                            ),
                            Span::styled(
                                entity.text(key).unwrap_or_else(|| "─".into()),
                                Style::default().fg(theme::NEON_CYAN),
                            ),
                        ])
                    }),
            );
        }
        lines.push(Line::default());
        for (key, label, _) in Self::node_actions(node) {
            lines.push(Line::from(vec![
                Span::styled(format!(" {key} "), theme::key_hint_key()),
                Span::styled(label, theme::key_hint()),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.rows_area.get();
        area.contains(Position::new(column, row))
            .then(|| self.offset.get() + usize::from(row - area.y))
    }
}

impl Component for TreePane {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn set_focused(&mut self, focused: bool) {
        if focused && !self.loaded {
            let action = self.fetch();
            if let Some(tx) = &self.action_tx {
                let _ = tx.send(action);
            }
        }
    }

    fn captures_input(&self) -> bool {
        self.form.is_some()
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if let Some(form) = self.form.as_mut() {
            return Ok(match form.handle_key(key) {
                FormEvent::Pending => None,
                FormEvent::Cancelled => {
                    self.form = None;
                    None
                }
                FormEvent::Submit(command) => Some(Action::Execute {
                    origin: Origin::Tree(self.resource),
                    command,
                }),
            });
        }
        if let Some(menu) = self.menu.as_mut() {
            let event = menu.handle_key(key);
            return Ok(self.menu_event(event));
        }

        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.view.select_next();
                self.sync_details(false)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.view.select_prev();
                self.sync_details(false)
            }
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.view.selected().cloned() {
                    self.view.toggle(&id);
                }
                None
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.view.collapse_or_parent();
                self.sync_details(false)
            }
            KeyCode::Char('c') => {
                self.form = Some(RecordForm::create(self.resource));
                None
            }
            KeyCode::Char('a') => self.run(NodeAction::AddChild),
            KeyCode::Char('e') => self.run(NodeAction::Edit),
            KeyCode::Char('t') => self.run(NodeAction::Toggle),
            KeyCode::Char('d') => self.run(NodeAction::Delete),
            KeyCode::Char('r') => Some(self.fetch()),
            KeyCode::Char('m') => {
                self.open_menu(None);
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.form.is_some() {
            return Ok(None);
        }
        if let Some(menu) = self.menu.as_mut() {
            let event = menu.handle_mouse(mouse);
            return Ok(self.menu_event(event));
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.view.select_next(),
            MouseEventKind::ScrollUp => self.view.select_prev(),
            MouseEventKind::Down(button) => {
                let rows = self.view.visible_rows();
                let Some(row) = self
                    .row_at(mouse.column, mouse.row)
                    .and_then(|idx| rows.get(idx))
                else {
                    return Ok(None);
                };
                let id = row.id.clone();
                if button == MouseButton::Right {
                    self.view.select(Some(id));
                    self.open_menu(Some((mouse.column, mouse.row)));
                } else if self.view.selected() == Some(&id) {
                    self.view.toggle(&id);
                } else {
                    self.view.select(Some(id));
                }
            }
            _ => {}
        }
        Ok(self.sync_details(false))
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SlotUpdated(resource, slot) if *resource == self.resource => {
                let refetched = slot.tree.as_slice() != self.view.roots();
                if refetched {
                    self.view.replace_roots(slot.tree.clone());
                }
                if self.view.selected().is_none() {
                    let first = self.view.roots().first().map(|n| n.id.clone());
                    self.view.select(first);
                }
                self.details.clone_from(&slot.details);
                let force = refetched || std::mem::take(&mut self.details_stale);
                return Ok(self.sync_details(force));
            }
            Action::Executed {
                origin: Origin::Tree(resource),
                result,
            } if *resource == self.resource => match result {
                Ok(_) => {
                    self.form = None;
                    self.details_stale = true;
                    return Ok(Some(self.fetch()));
                }
                Err(failure) => {
                    if let Some(form) = self.form.as_mut() {
                        form.fail(failure.clone());
                    }
                }
            },
            Action::LanguageChanged(language) => self.language = *language,
            Action::SignedOut => {
                self.view = TreeView::new(Vec::new());
                self.loaded = false;
                self.menu = None;
                self.form = None;
                self.details = None;
                self.detail_for = None;
                self.details_stale = false;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let open = self.view.open_ids().count();
        let block = Block::default()
            .title(format!(" {} · {open} open ", self.resource.label()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [body, hints] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
        let [rows_area, detail_area] =
            Layout::horizontal([Constraint::Min(20), Constraint::Percentage(40)]).areas(body);
        self.render_details(frame, detail_area);

        let rows = self.view.visible_rows();
        let selected = self.view.selected();
        let height = usize::from(rows_area.height).max(1);
        let selected_idx = rows
            .iter()
            .position(|r| Some(&r.id) == selected)
            .unwrap_or(0);
        let offset = (selected_idx + 1).saturating_sub(height);
        self.offset.set(offset);
        self.rows_area.set(rows_area);

        let lines: Vec<Line> = rows
            .iter()
            .skip(offset)
            .take(height)
            .filter_map(|row| {
                let node = self.view.find(&row.id)?;
                let marker = if !row.has_children {
                    "  "
                } else if self.view.is_open(&row.id) {
                    "▾ "
                } else {
                    "▸ "
                };
                let style = if Some(&row.id) == selected {
                    theme::table_selected()
                } else if node.is_active {
                    theme::table_row()
                } else {
                    theme::inactive_row()
                };
                let category = node
                    .category
                    .as_ref()
                    .map(|c| format!("  [{c}]"))
                    .unwrap_or_default();
                Some(Line::from(vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(marker, Style::default().fg(theme::ELECTRIC_PURPLE)),
                    Span::styled(node.label(self.language), style),
                    Span::styled(category, theme::key_hint()),
                ]))
            })
            .collect();

        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  Nothing here yet", theme::key_hint())),
                rows_area,
            );
        } else {
            frame.render_widget(Paragraph::new(lines), rows_area);
        }

        let hint = Line::from(vec![
            Span::styled(" ←/→ ", theme::key_hint_key()),
            Span::styled("collapse/expand  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("add child  ", theme::key_hint()),
            Span::styled("c ", theme::key_hint_key()),
            Span::styled("new root  ", theme::key_hint()),
            Span::styled("m ", theme::key_hint_key()),
            Span::styled("menu  ", theme::key_hint()),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hint), hints);

        if let Some(form) = &self.form {
            let width = area.width.saturating_sub(8).min(70);
            let height = area.height.saturating_sub(4).min(14);
            form.render(
                frame,
                Rect::new(
                    area.x + area.width.saturating_sub(width) / 2,
                    area.y + area.height.saturating_sub(height) / 2,
                    width,
                    height,
                ),
            );
        }
        if let Some(menu) = &self.menu {
            menu.render(frame, area);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use backoffice_core::model::tree_from_values;
    use backoffice_core::{EntityId, ResourceSlot};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn tree(extra_child: bool) -> Arc<ResourceSlot> {
        let mut children = vec![json!({"id": 2, "parent_id": 1, "code": "11", "name": "Cash"})];
        if extra_child {
            children.push(json!({"id": 3, "parent_id": 1, "code": "12", "name": "Bank"}));
        }
        Arc::new(ResourceSlot {
            tree: tree_from_values(&[json!({
                "id": 1, "code": "1", "name": "Assets", "can_have_children": true,
                "children": children
            })]),
            ..ResourceSlot::default()
        })
    }

    fn pane() -> TreePane {
        let mut pane = TreePane::new(Resource::Accounts);
        pane.update(&Action::SlotUpdated(Resource::Accounts, tree(false)))
            .unwrap();
        pane
    }

    #[test]
    fn open_and_selected_state_survive_a_refetch() {
        let mut p = pane();
        p.handle_key_event(key(KeyCode::Right)).unwrap();
        p.handle_key_event(key(KeyCode::Down)).unwrap();
        assert_eq!(p.view.selected(), Some(&EntityId::from(2)));

        p.update(&Action::SlotUpdated(Resource::Accounts, tree(true)))
            .unwrap();
        assert!(p.view.is_open(&EntityId::from(1)));
        assert_eq!(p.view.selected(), Some(&EntityId::from(2)));
        assert_eq!(p.view.visible_rows().len(), 3);
    }

    fn requested_details(action: Option<Action>) -> Option<EntityId> {
        match action {
            Some(Action::Dispatch(Command::FetchDetails { id, .. })) => Some(id),
            _ => None,
        }
    }

    #[test]
    fn details_panel_is_repopulated_after_a_refetch() {
        let mut p = TreePane::new(Resource::Accounts);
        p.set_focused(true);
        let first = p
            .update(&Action::SlotUpdated(Resource::Accounts, tree(false)))
            .unwrap();
        assert_eq!(requested_details(first), Some(EntityId::from(1)));

        p.handle_key_event(key(KeyCode::Right)).unwrap();
        let moved = p.handle_key_event(key(KeyCode::Down)).unwrap();
        assert_eq!(requested_details(moved), Some(EntityId::from(2)));

        let arrived = Arc::new(ResourceSlot {
            details: Some(Entity::new(
                json!({"id": 2, "name": "Cash", "opening_balance": "100.00"}),
            )),
            ..(*tree(false)).clone()
        });
        let settled = p
            .update(&Action::SlotUpdated(Resource::Accounts, arrived))
            .unwrap();
        assert!(settled.is_none());
        assert_eq!(
            p.detail_entity().and_then(|e| e.text("opening_balance")),
            Some("100.00".to_owned())
        );

        p.update(&Action::Executed {
            origin: Origin::Tree(Resource::Accounts),
            result: Ok(backoffice_core::CommandResult::Ok),
        })
        .unwrap();
        let refetched = p
            .update(&Action::SlotUpdated(Resource::Accounts, tree(true)))
            .unwrap();
        assert_eq!(p.view.selected(), Some(&EntityId::from(2)));
        assert_eq!(requested_details(refetched), Some(EntityId::from(2)));
        assert!(p.detail_entity().is_none());
    }

    #[test]
    fn menu_is_dismissed_by_an_unrelated_key() {
        let mut p = pane();
        p.handle_key_event(key(KeyCode::Char('m'))).unwrap();
        assert!(p.menu.is_some());
        // `d` would delete if it reached the tree.
        let action = p.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        assert!(action.is_none());
        assert!(p.menu.is_none());
    }

    #[test]
    fn add_child_prefills_the_parent() {
        let mut p = pane();
        p.handle_key_event(key(KeyCode::Char('m'))).unwrap();
        // First item is "Add child".
        p.handle_key_event(key(KeyCode::Enter)).unwrap();
        let form = p.form.as_ref().unwrap();
        assert_eq!(form.body()["parent_id"], json!(1));
        assert!(p.captures_input());
    }

    #[test]
    fn confirmed_delete_reports_back_to_the_tree() {
        let mut p = pane();
        let action = p.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        assert!(matches!(
            action,
            Some(Action::ShowConfirm {
                confirm: ConfirmAction::Delete { .. },
                origin: Some(Origin::Tree(Resource::Accounts)),
            })
        ));

        let refetch = p
            .update(&Action::Executed {
                origin: Origin::Tree(Resource::Accounts),
                result: Ok(backoffice_core::CommandResult::Ok),
            })
            .unwrap();
        assert!(matches!(
            refetch,
            Some(Action::Dispatch(Command::FetchTree { resource: Resource::Accounts }))
        ));
    }
}
