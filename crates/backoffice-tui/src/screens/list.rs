//! Paginated list of one resource, with its detail view and record form.
//!
//! The pane requests page 1 when first focused and the new page on every
//! page change. The detail record is fetched on open and cleared on close.

use std::cell::Cell;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell as TableCell, Paragraph, Row, Table, TableState};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use backoffice_core::{
    Command, DomainAction, Entity, EntityId, Language, ListQuery, Resource, ResourceSlot,
};

use crate::action::{Action, ConfirmAction, Origin};
use crate::component::Component;
use crate::screens::attachments::AttachmentPanel;
use crate::theme;
use crate::widgets::form::{FormEvent, RecordForm};
use crate::widgets::menu::{ContextMenu, MenuEvent};
use crate::widgets::pagination::render_page_bar;

/// Fields left out of the body sent with an attachment save.
const READ_ONLY: &[&str] = &["id", "attachments", "files", "created_at", "updated_at", "deleted_at"];

/// Writable scalar fields of `entity`.
pub fn scalar_body(entity: &Entity) -> Value {
    let body: Map<String, Value> = entity
        .as_value()
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, value)| {
            !READ_ONLY.contains(&key.as_str())
                && !(value.is_object() || value.is_array() || value.is_null())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Open,
    Edit,
    Toggle,
    Delete,
    Perform(DomainAction),
}

pub struct ListPane {
    resource: Resource,
    language: Language,
    action_tx: Option<UnboundedSender<Action>>,
    slot: Arc<ResourceSlot>,
    table_state: TableState,
    search: Option<String>,
    loaded: bool,
    /// Record shown in the detail view.
    detail: Option<EntityId>,
    attachments: Option<AttachmentPanel>,
    /// Body sent with attachment saves and kept under edit forms.
    body_of: fn(&Entity) -> Value,
    form: Option<RecordForm>,
    menu: Option<ContextMenu<RowAction>>,
    table_area: Cell<Rect>,
    table_offset: Cell<usize>,
}

impl ListPane {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            language: Language::En,
            action_tx: None,
            slot: Arc::new(ResourceSlot::default()),
            table_state: TableState::default().with_selected(Some(0)),
            search: None,
            loaded: false,
            detail: None,
            attachments: None,
            body_of: scalar_body,
            form: None,
            menu: None,
            table_area: Cell::new(Rect::default()),
            table_offset: Cell::new(0),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body_of: fn(&Entity) -> Value) -> Self {
        self.body_of = body_of;
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn slot(&self) -> &ResourceSlot {
        &self.slot
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail.is_some()
    }

    /// A form or menu is open above the pane.
    pub fn has_overlay(&self) -> bool {
        self.form.is_some() || self.menu.is_some()
    }

    /// Confirm a domain transition on the target record.
    pub fn perform(&mut self, action: DomainAction) -> Option<Action> {
        self.resource
            .supports_action(action)
            .then(|| self.run(RowAction::Perform(action)))
            .flatten()
    }

    pub fn attachments(&self) -> Option<&AttachmentPanel> {
        self.attachments.as_ref()
    }

    /// The open detail record: the fetched one once it has arrived,
    /// the list row until then.
    pub fn detail_entity(&self) -> Option<&Entity> {
        let id = self.detail.as_ref()?;
        self.slot
            .details
            .as_ref()
            .filter(|d| d.id().as_ref() == Some(id))
            .or_else(|| self.slot.find(id))
    }

    /// Whether the full record (not just its list row) is loaded.
    pub fn detail_loaded(&self) -> bool {
        let id = self.detail.as_ref();
        self.slot
            .details
            .as_ref()
            .is_some_and(|d| d.id().as_ref() == id)
    }

    fn selected_row(&self) -> Option<&Entity> {
        self.slot.items.get(self.table_state.selected()?)
    }

    /// Record the row actions apply to.
    fn target(&self) -> Option<&Entity> {
        if self.detail.is_some() {
            self.detail_entity()
        } else {
            self.selected_row()
        }
    }

    fn query(&self, page: u32) -> ListQuery {
        let query = ListQuery::page(page);
        match &self.search {
            Some(s) => query.search(s.clone()),
            None => query,
        }
    }

    fn fetch(&mut self, page: u32) -> Action {
        self.loaded = true;
        Action::Dispatch(Command::FetchPage {
            resource: self.resource,
            query: self.query(page),
        })
    }

    fn send(&self, action: Action) {
        if let Some(tx) = &self.action_tx {
            let _ = tx.send(action);
        }
    }

    fn select(&mut self, idx: usize) {
        let len = self.slot.items.len();
        self.table_state
            .select(Some(if len == 0 { 0 } else { idx.min(len - 1) }));
    }

    fn move_selection(&mut self, delta: isize) {
        let current = self.table_state.selected().unwrap_or(0);
        self.select(current.saturating_add_signed(delta));
    }

    fn open_detail(&mut self) -> Option<Action> {
        let id = self.selected_row()?.id()?;
        self.detail = Some(id.clone());
        if self.resource.accepts_attachments() {
            self.attachments = Some(AttachmentPanel::new(self.resource));
        }
        Some(Action::Dispatch(Command::FetchDetails {
            resource: self.resource,
            id,
        }))
    }

    /// Close the detail view; staged uploads are dropped with it.
    pub fn close_detail(&mut self) -> Action {
        self.detail = None;
        self.attachments = None;
        Action::CloseDetails(self.resource)
    }

    fn row_menu(&self, entity: &Entity) -> ContextMenu<RowAction> {
        let mut items = Vec::new();
        if self.detail.is_none() {
            items.push(("View".to_owned(), RowAction::Open));
        }
        items.push(("Edit".to_owned(), RowAction::Edit));
        if self.resource.supports_toggle() {
            let label = if entity.is_active() == Some(false) {
                "Activate"
            } else {
                "Deactivate"
            };
            items.push((label.to_owned(), RowAction::Toggle));
        }
        items.push(("Delete".to_owned(), RowAction::Delete));
        items.extend(
            self.resource
                .actions()
                .iter()
                .map(|a| (capitalize(a.as_path()), RowAction::Perform(*a))),
        );
        ContextMenu::new(entity.display_name(self.language), items)
    }

    fn run(&mut self, action: RowAction) -> Option<Action> {
        let entity = self.target()?.clone();
        let id = entity.id()?;
        let name = entity.display_name(self.language);
        match action {
            RowAction::Open => self.open_detail(),
            RowAction::Edit => {
                self.form = Some(
                    RecordForm::edit(self.resource, &entity).with_base((self.body_of)(&entity)),
                );
                None
            }
            RowAction::Toggle => self.resource.supports_toggle().then(|| {
                Action::Dispatch(Command::ToggleStatus {
                    resource: self.resource,
                    id,
                })
            }),
            RowAction::Delete => Some(Action::ShowConfirm {
                confirm: ConfirmAction::Delete {
                    resource: self.resource,
                    id,
                    name,
                },
                origin: None,
            }),
            RowAction::Perform(action) => Some(Action::ShowConfirm {
                confirm: ConfirmAction::Perform {
                    resource: self.resource,
                    id,
                    action,
                    name,
                },
                origin: None,
            }),
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Option<Action> {
        if let Some(panel) = self.attachments.as_mut() {
            let entity = self
                .detail
                .as_ref()
                .and_then(|id| {
                    self.slot
                        .details
                        .as_ref()
                        .filter(|d| d.id().as_ref() == Some(id))
                        .or_else(|| self.slot.find(id))
                });
            if let Some(action) = panel.handle_key(key, entity, self.body_of) {
                return action;
            }
        }
        match key.code {
            KeyCode::Esc => Some(self.close_detail()),
            KeyCode::Char('e') => self.run(RowAction::Edit),
            KeyCode::Char('t') => self.run(RowAction::Toggle),
            KeyCode::Char('d') => self.run(RowAction::Delete),
            KeyCode::Char('m') => {
                self.menu = self.detail_entity().map(|e| self.row_menu(e));
                None
            }
            _ => None,
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<Action> {
        let pagination = self.slot.pagination;
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('j') | KeyCode::Down) => {
                self.move_selection(1);
                None
            }
            (_, KeyCode::Char('k') | KeyCode::Up) => {
                self.move_selection(-1);
                None
            }
            (_, KeyCode::Char('g')) => {
                self.select(0);
                None
            }
            (_, KeyCode::Char('G')) => {
                self.select(usize::MAX);
                None
            }
            (_, KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown) => pagination
                .filter(|p| p.has_next())
                .map(|p| self.fetch(p.current_page + 1)),
            (_, KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp) => pagination
                .filter(|p| p.has_prev())
                .map(|p| self.fetch(p.current_page - 1)),
            (_, KeyCode::Char('r')) => {
                let page = self.slot.current_page();
                Some(self.fetch(page))
            }
            (_, KeyCode::Enter) => self.open_detail(),
            (_, KeyCode::Char('c')) => {
                self.form = Some(RecordForm::create(self.resource));
                None
            }
            (KeyModifiers::NONE, KeyCode::Char('e')) => self.run(RowAction::Edit),
            (_, KeyCode::Char('t')) => self.run(RowAction::Toggle),
            (_, KeyCode::Char('d')) => self.run(RowAction::Delete),
            (_, KeyCode::Char('m')) => {
                self.menu = self.selected_row().map(|e| self.row_menu(e));
                None
            }
            _ => None,
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " {}{}{} ",
            self.resource.label(),
            self.slot
                .pagination
                .map(|p| format!(" ({})", p.total))
                .unwrap_or_default(),
            self.search
                .as_ref()
                .map(|s| format!(" · /{s}"))
                .unwrap_or_default(),
        );
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let columns = self.resource.columns();
        let header = Row::new(
            std::iter::once("ID")
                .chain(columns.iter().map(|c| c.title))
                .map(TableCell::from),
        )
        .style(theme::table_header());

        let rows: Vec<Row> = self
            .slot
            .items
            .iter()
            .map(|entity| {
                let id = entity.id().map(|i| i.to_string()).unwrap_or_default();
                let cells = std::iter::once(id).chain(columns.iter().map(|c| {
                    if c.key == "name" {
                        entity.display_name(self.language)
                    } else {
                        entity.text(c.key).unwrap_or_else(|| "─".into())
                    }
                }));
                let style = if entity.is_active() == Some(false) {
                    theme::inactive_row()
                } else {
                    theme::table_row()
                };
                Row::new(cells.map(TableCell::from)).style(style)
            })
            .collect();

        let widths: Vec<Constraint> = std::iter::once(Constraint::Length(6))
            .chain(columns.iter().map(|_| Constraint::Fill(1)))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected());

        let mut state = self.table_state;
        frame.render_stateful_widget(table, area, &mut state);
        self.table_area.set(area);
        self.table_offset.set(state.offset());

        if self.slot.items.is_empty() {
            let text = if self.slot.fetched_at.is_none() {
                "  Loading…"
            } else {
                "  No records"
            };
            let inner = Rect::new(area.x + 1, area.y + 2, area.width.saturating_sub(2), 1);
            frame.render_widget(Paragraph::new(Span::styled(text, theme::key_hint())), inner);
        }
    }

    /// Detail body: every top-level field, nested records by name.
    pub fn render_fields(&self, frame: &mut Frame, area: Rect, entity: &Entity) {
        let Some(fields) = entity.as_value().as_object() else {
            return;
        };
        let width = fields.keys().map(String::len).max().unwrap_or(0) + 2;
        let lines: Vec<Line> = fields
            .keys()
            .filter(|k| !matches!(k.as_str(), "attachments" | "files" | "lines"))
            .map(|key| {
                let text = entity.text(key).unwrap_or_else(|| "─".into());
                Line::from(vec![
                    Span::styled(
                        format!("  {:<width$}", key.replace('_', " ")),
                        Style::default().fg(theme::DIM_WHITE),
                    ),
                    Span::styled(text, Style::default().fg(theme::NEON_CYAN)),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    pub fn detail_block(&self, entity: Option<&Entity>) -> Block<'static> {
        let name = entity.map_or_else(String::new, |e| e.display_name(self.language));
        let loading = if self.detail_loaded() { "" } else { "  · loading…" };
        Block::default()
            .title(format!(" {} · {name}{loading} ", self.resource.label()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
    }

    pub fn render_detail_hints(frame: &mut Frame, area: Rect, attachments: bool) {
        let mut spans = vec![
            Span::styled(" e ", theme::key_hint_key()),
            Span::styled("edit  ", theme::key_hint()),
            Span::styled("t ", theme::key_hint_key()),
            Span::styled("toggle  ", theme::key_hint()),
            Span::styled("d ", theme::key_hint_key()),
            Span::styled("delete  ", theme::key_hint()),
            Span::styled("m ", theme::key_hint_key()),
            Span::styled("actions  ", theme::key_hint()),
        ];
        if attachments {
            spans.extend([
                Span::styled("a ", theme::key_hint_key()),
                Span::styled("attach  ", theme::key_hint()),
                Span::styled("J/K ", theme::key_hint_key()),
                Span::styled("pick  ", theme::key_hint()),
                Span::styled("x ", theme::key_hint_key()),
                Span::styled("remove  ", theme::key_hint()),
                Span::styled("s ", theme::key_hint_key()),
                Span::styled("upload  ", theme::key_hint()),
            ]);
        }
        spans.extend([
            Span::styled("Esc ", theme::key_hint_key()),
            Span::styled("back", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let entity = self.detail_entity();
        let block = self.detail_block(entity);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [body, hints] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
        let body = if let Some(panel) = &self.attachments {
            let [fields, files] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(8)]).areas(body);
            panel.render(frame, files, entity);
            fields
        } else {
            body
        };
        if let Some(entity) = entity {
            self.render_fields(frame, body, entity);
        }
        Self::render_detail_hints(frame, hints, self.attachments.is_some());
    }

    /// Overlays drawn above either view.
    pub fn render_overlays(&self, frame: &mut Frame, area: Rect) {
        if let Some(form) = &self.form {
            let width = area.width.saturating_sub(8).min(70);
            let height = area.height.saturating_sub(4).min(20);
            let form_area = Rect::new(
                area.x + area.width.saturating_sub(width) / 2,
                area.y + area.height.saturating_sub(height) / 2,
                width,
                height,
            );
            form.render(frame, form_area);
        }
        if let Some(menu) = &self.menu {
            menu.render(frame, area);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

impl Component for ListPane {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn set_focused(&mut self, focused: bool) {
        if focused && !self.loaded {
            let action = self.fetch(1);
            self.send(action);
        }
    }

    fn captures_input(&self) -> bool {
        self.form.is_some() || self.attachments.as_ref().is_some_and(AttachmentPanel::captures_input)
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
                    origin: Origin::Form(self.resource),
                    command,
                }),
            });
        }
        if let Some(menu) = self.menu.as_mut() {
            return Ok(match menu.handle_key(key) {
                MenuEvent::Pending => None,
                MenuEvent::Dismissed => {
                    self.menu = None;
                    None
                }
                MenuEvent::Chosen(action) => {
                    self.menu = None;
                    self.run(action)
                }
            });
        }
        Ok(if self.detail.is_some() {
            self.handle_detail_key(key)
        } else {
            self.handle_list_key(key)
        })
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.form.is_some() {
            return Ok(None);
        }
        if let Some(menu) = self.menu.as_mut() {
            return Ok(match menu.handle_mouse(mouse) {
                MenuEvent::Pending => None,
                MenuEvent::Dismissed => {
                    self.menu = None;
                    None
                }
                MenuEvent::Chosen(action) => {
                    self.menu = None;
                    self.run(action)
                }
            });
        }
        if self.detail.is_some() {
            return Ok(None);
        }

        let area = self.table_area.get();
        let first_row = area.y + 2;
        let hit = area.contains(Position::new(mouse.column, mouse.row)) && mouse.row >= first_row;
        match mouse.kind {
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            MouseEventKind::Down(button) if hit => {
                let idx = self.table_offset.get() + usize::from(mouse.row - first_row);
                if idx < self.slot.items.len() {
                    self.select(idx);
                    if button == MouseButton::Right {
                        self.menu = self
                            .selected_row()
                            .map(|e| self.row_menu(e).at(mouse.column, mouse.row));
                    }
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SlotUpdated(resource, slot) if *resource == self.resource => {
                self.slot = Arc::clone(slot);
                let selected = self.table_state.selected().unwrap_or(0);
                self.select(selected);
                // The open record was deleted.
                if let Some(id) = &self.detail {
                    let gone = self.slot.find(id).is_none()
                        && self.slot.details.as_ref().and_then(Entity::id).as_ref() != Some(id);
                    if gone && self.slot.fetched_at.is_some() {
                        self.detail = None;
                        self.attachments = None;
                    }
                }
            }
            Action::Executed {
                origin: Origin::Form(resource),
                result,
            } if *resource == self.resource => match result {
                Ok(_) => self.form = None,
                Err(failure) => {
                    if let Some(form) = self.form.as_mut() {
                        form.fail(failure.clone());
                    }
                }
            },
            Action::Executed {
                origin: Origin::Attachments(resource),
                result,
            } if *resource == self.resource => {
                if let Some(panel) = self.attachments.as_mut() {
                    panel.on_saved(result.is_ok());
                }
            }
            Action::UploadStaged(result) => {
                if let Some(panel) = self.attachments.as_mut() {
                    return Ok(panel.on_staged(result));
                }
            }
            Action::SearchSubmit(query) => {
                let query = query.trim();
                self.search = (!query.is_empty()).then(|| query.to_owned());
                self.table_state.select(Some(0));
                return Ok(Some(self.fetch(1)));
            }
            Action::LanguageChanged(language) => self.language = *language,
            Action::SignedOut => {
                self.slot = Arc::new(ResourceSlot::default());
                self.loaded = false;
                self.detail = None;
                self.attachments = None;
                self.form = None;
                self.menu = None;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if self.detail.is_some() {
            self.render_detail(frame, area);
        } else {
            let [table, bar] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
            self.render_table(frame, table);
            frame.render_widget(
                Paragraph::new(render_page_bar(self.slot.pagination.as_ref())),
                bar,
            );
        }
        self.render_overlays(frame, area);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use backoffice_core::Pagination;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn slot(current_page: u32, last_page: u32) -> Arc<ResourceSlot> {
        Arc::new(ResourceSlot {
            items: vec![
                Entity::new(json!({"id": 1, "name": "Acme", "is_active": true})),
                Entity::new(json!({"id": 2, "name": "Globex", "is_active": false})),
            ],
            pagination: Some(Pagination {
                current_page,
                last_page,
                per_page: 2,
                total: u64::from(last_page) * 2,
            }),
            ..ResourceSlot::default()
        })
    }

    fn pane(current_page: u32, last_page: u32) -> ListPane {
        let mut pane = ListPane::new(Resource::Vendors);
        pane.update(&Action::SlotUpdated(Resource::Vendors, slot(current_page, last_page)))
            .unwrap();
        pane
    }

    fn requested_page(action: Option<Action>) -> Option<u32> {
        match action? {
            Action::Dispatch(Command::FetchPage { query, .. }) => query.page,
            _ => None,
        }
    }

    #[test]
    fn page_keys_request_the_neighbouring_page_within_bounds() {
        let mut first = pane(1, 3);
        assert_eq!(requested_page(first.handle_key_event(key(KeyCode::Char('p'))).unwrap()), None);
        assert_eq!(requested_page(first.handle_key_event(key(KeyCode::Char('n'))).unwrap()), Some(2));

        let mut last = pane(3, 3);
        assert_eq!(requested_page(last.handle_key_event(key(KeyCode::Right)).unwrap()), None);
        assert_eq!(requested_page(last.handle_key_event(key(KeyCode::Left)).unwrap()), Some(2));
    }

    #[test]
    fn search_restarts_at_page_one_with_the_query() {
        let mut p = pane(2, 3);
        let action = p.update(&Action::SearchSubmit("acme".into())).unwrap();
        match action {
            Some(Action::Dispatch(Command::FetchPage { query, .. })) => {
                assert_eq!(query.page, Some(1));
                assert_eq!(query.search.as_deref(), Some("acme"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn detail_fetches_on_open_and_clears_on_close() {
        let mut p = pane(1, 1);
        let open = p.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(matches!(
            open,
            Some(Action::Dispatch(Command::FetchDetails { resource: Resource::Vendors, .. }))
        ));
        assert!(p.is_detail_open());
        assert_eq!(p.detail_entity().and_then(Entity::id), Some(EntityId::from(1)));

        let close = p.handle_key_event(key(KeyCode::Esc)).unwrap();
        assert!(matches!(close, Some(Action::CloseDetails(Resource::Vendors))));
        assert!(!p.is_detail_open());
    }

    #[test]
    fn delete_asks_for_confirmation_first() {
        let mut p = pane(1, 1);
        p.handle_key_event(key(KeyCode::Down)).unwrap();
        let action = p.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        match action {
            Some(Action::ShowConfirm {
                confirm: ConfirmAction::Delete { id, name, .. },
                origin: None,
            }) => {
                assert_eq!(id, EntityId::from(2));
                assert_eq!(name, "Globex");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn row_menu_closes_on_any_other_key() {
        let mut p = pane(1, 1);
        p.handle_key_event(key(KeyCode::Char('m'))).unwrap();
        assert!(p.menu.is_some());
        // Swallowed: no page request even though `n` is a page key.
        let action = p.handle_key_event(key(KeyCode::Char('n'))).unwrap();
        assert!(action.is_none());
        assert!(p.menu.is_none());
    }

    #[test]
    fn form_stays_open_on_validation_failure() {
        let mut p = pane(1, 1);
        p.handle_key_event(key(KeyCode::Char('c'))).unwrap();
        let submit = p
            .handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(matches!(
            submit,
            Some(Action::Execute { origin: Origin::Form(Resource::Vendors), .. })
        ));

        p.update(&Action::Executed {
            origin: Origin::Form(Resource::Vendors),
            result: Err(crate::action::Failure {
                message: "Name is required".into(),
                fields: vec![],
            }),
        })
        .unwrap();
        assert!(p.form.is_some());

        p.update(&Action::Executed {
            origin: Origin::Form(Resource::Vendors),
            result: Ok(backoffice_core::CommandResult::Ok),
        })
        .unwrap();
        assert!(p.form.is_none());
    }

    #[test]
    fn attachment_body_drops_nested_and_read_only_fields() {
        let entity = Entity::new(json!({
            "id": 3, "reason": "Trip", "days": 2, "employee": {"id": 1},
            "attachments": [], "created_at": "x"
        }));
        assert_eq!(scalar_body(&entity), json!({"reason": "Trip", "days": 2}));
    }
}
