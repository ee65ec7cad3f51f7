//! Account links: logical roles mapped onto ledger accounts.
//!
//! Accounts already taken by another role are shown but cannot be picked,
//! and a save sends only the roles that changed.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;

use backoffice_core::{
    AccountLinkForm, Command, CommandResult, EntityId, Language, Resource, TreeNode,
};

use crate::action::{Action, Notification, Origin};
use crate::component::Component;
use crate::theme;

/// One pickable account, flattened from the chart of accounts.
#[derive(Debug, Clone)]
struct AccountRow {
    id: EntityId,
    depth: usize,
    label: String,
    is_active: bool,
}

fn account_rows(nodes: &[TreeNode], depth: usize, language: Language, out: &mut Vec<AccountRow>) {
    for node in nodes {
        out.push(AccountRow {
            id: node.id.clone(),
            depth,
            label: node.label(language),
            is_active: node.is_active,
        });
        account_rows(&node.children, depth + 1, language, out);
    }
}

pub struct LinksPane {
    language: Language,
    action_tx: Option<UnboundedSender<Action>>,
    form: Option<AccountLinkForm>,
    accounts_tree: Vec<TreeNode>,
    accounts: Vec<AccountRow>,
    role_cursor: usize,
    /// Open account picker for the role under the cursor.
    picker: Option<usize>,
    loaded: bool,
    saving: bool,
}

impl Default for LinksPane {
    fn default() -> Self {
        Self::new()
    }
}

impl LinksPane {
    pub fn new() -> Self {
        Self {
            language: Language::En,
            action_tx: None,
            form: None,
            accounts_tree: Vec::new(),
            accounts: Vec::new(),
            role_cursor: 0,
            picker: None,
            loaded: false,
            saving: false,
        }
    }

    fn load(&mut self) -> Action {
        self.loaded = true;
        Action::Execute {
            origin: Origin::Links,
            command: Command::FetchAccountLinks,
        }
    }

    fn rebuild_accounts(&mut self) {
        let mut rows = Vec::new();
        account_rows(&self.accounts_tree, 0, self.language, &mut rows);
        self.accounts = rows;
    }

    fn account_name(&self, id: &EntityId) -> String {
        self.accounts
            .iter()
            .find(|a| &a.id == id)
            .map_or_else(|| format!("#{id}"), |a| a.label.clone())
    }

    fn current_role(&self) -> Option<String> {
        let form = self.form.as_ref()?;
        form.roles().get(self.role_cursor).map(|r| r.key.clone())
    }

    fn is_unavailable(&self, role: &str, account: &AccountRow) -> bool {
        !account.is_active
            || self
                .form
                .as_ref()
                .is_some_and(|f| f.is_disabled(role, &account.id))
    }

    fn open_picker(&mut self) {
        let Some(role) = self.current_role() else { return };
        let current = self.form.as_ref().and_then(|f| f.selection(&role));
        let start = current
            .and_then(|id| self.accounts.iter().position(|a| &a.id == id))
            .unwrap_or(0);
        self.picker = Some(start);
    }

    fn pick(&mut self, cursor: usize) -> Option<Action> {
        let role = self.current_role()?;
        let account = self.accounts.get(cursor)?.clone();
        if self.is_unavailable(&role, &account) {
            return Some(Action::Notify(Notification::info(format!(
                "{} is linked to another role",
                account.label
            ))));
        }
        let form = self.form.as_mut()?;
        match form.select(&role, Some(account.id)) {
            Ok(()) => {
                self.picker = None;
                None
            }
            Err(e) => Some(Action::Notify(Notification::error(e.user_message()))),
        }
    }

    fn save(&mut self) -> Option<Action> {
        if self.saving {
            return None;
        }
        let changes = self.form.as_ref()?.changes();
        if changes.is_empty() {
            return Some(Action::Notify(Notification::info("No changes to save")));
        }
        self.saving = true;
        Some(Action::Execute {
            origin: Origin::Links,
            command: Command::SaveAccountLinks { changes },
        })
    }

    fn handle_picker_key(&mut self, cursor: usize, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.picker = None;
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.picker = Some((cursor + 1).min(self.accounts.len().saturating_sub(1)));
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.picker = Some(cursor.saturating_sub(1));
                None
            }
            KeyCode::Enter => self.pick(cursor),
            _ => None,
        }
    }

    fn render_roles(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Roles ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.picker.is_none() {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(form) = &self.form else {
            frame.render_widget(
                Paragraph::new(Span::styled("  Loading…", theme::key_hint())),
                inner,
            );
            return;
        };
        let label_width = form
            .roles()
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = form
            .roles()
            .iter()
            .enumerate()
            .map(|(i, role)| {
                let current = form.selection(&role.key);
                let changed = current != role.original.as_ref();
                let account = current.map_or_else(|| "─".to_owned(), |id| self.account_name(id));
                let style = if i == self.role_cursor {
                    theme::table_selected()
                } else {
                    theme::table_row()
                };
                Line::from(vec![
                    Span::styled(format!(" {:<label_width$}  ", role.label), style),
                    Span::styled(account, Style::default().fg(theme::NEON_CYAN)),
                    Span::styled(
                        if changed { "  •" } else { "" },
                        Style::default().fg(theme::ELECTRIC_YELLOW),
                    ),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect, cursor: usize) {
        let block = Block::default()
            .title(" Account ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let role = self.current_role().unwrap_or_default();
        let height = usize::from(inner.height).max(1);
        let offset = (cursor + 1).saturating_sub(height);
        let lines: Vec<Line> = self
            .accounts
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, account)| {
                let style = if i == cursor {
                    theme::table_selected()
                } else if self.is_unavailable(&role, account) {
                    theme::disabled()
                } else {
                    theme::table_row()
                };
                Line::from(Span::styled(
                    format!(" {}{}", "  ".repeat(account.depth), account.label),
                    style,
                ))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for LinksPane {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn set_focused(&mut self, focused: bool) {
        if focused && !self.loaded {
            let load = self.load();
            if let Some(tx) = &self.action_tx {
                let _ = tx.send(load);
                let _ = tx.send(Action::Dispatch(Command::FetchTree {
                    resource: Resource::Accounts,
                }));
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if let Some(cursor) = self.picker {
            return Ok(self.handle_picker_key(cursor, key));
        }
        let roles = self.form.as_ref().map_or(0, |f| f.roles().len());
        let action = match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => self.save(),
            (_, KeyCode::Char('j') | KeyCode::Down) => {
                self.role_cursor = (self.role_cursor + 1).min(roles.saturating_sub(1));
                None
            }
            (_, KeyCode::Char('k') | KeyCode::Up) => {
                self.role_cursor = self.role_cursor.saturating_sub(1);
                None
            }
            (_, KeyCode::Enter) => {
                self.open_picker();
                None
            }
            (_, KeyCode::Char('x') | KeyCode::Backspace) => {
                let role = self.current_role();
                if let (Some(role), Some(form)) = (role, self.form.as_mut()) {
                    let _ = form.select(&role, None);
                }
                None
            }
            (_, KeyCode::Char('u')) => {
                let role = self.current_role();
                if let (Some(role), Some(form)) = (role, self.form.as_mut()) {
                    form.reset(&role);
                }
                None
            }
            (_, KeyCode::Char('r')) => Some(self.load()),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SlotUpdated(Resource::Accounts, slot) => {
                self.accounts_tree.clone_from(&slot.tree);
                self.rebuild_accounts();
            }
            Action::Executed {
                origin: Origin::Links,
                result,
            } => match result {
                Ok(CommandResult::AccountLinks(values)) => {
                    self.form = Some(AccountLinkForm::from_values(values));
                    self.role_cursor = self.role_cursor.min(values.len().saturating_sub(1));
                    self.picker = None;
                }
                Ok(_) => {
                    self.saving = false;
                    return Ok(Some(self.load()));
                }
                Err(_) => self.saving = false,
            },
            Action::LanguageChanged(language) => {
                self.language = *language;
                self.rebuild_accounts();
            }
            Action::SignedOut => *self = Self {
                action_tx: self.action_tx.take(),
                ..Self::new()
            },
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [body, hints] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
        if let Some(cursor) = self.picker {
            let [roles, picker] =
                Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .areas(body);
            self.render_roles(frame, roles);
            self.render_picker(frame, picker, cursor);
        } else {
            self.render_roles(frame, body);
        }

        let dirty = self.form.as_ref().is_some_and(AccountLinkForm::is_dirty);
        let mut spans = vec![
            Span::styled(" Enter ", theme::key_hint_key()),
            Span::styled("choose  ", theme::key_hint()),
            Span::styled("x ", theme::key_hint_key()),
            Span::styled("clear  ", theme::key_hint()),
            Span::styled("u ", theme::key_hint_key()),
            Span::styled("undo  ", theme::key_hint()),
            Span::styled("Ctrl+S ", theme::key_hint_key()),
            Span::styled("save", theme::key_hint()),
        ];
        if self.saving {
            spans.push(Span::styled("  Saving…", Style::default().fg(theme::ELECTRIC_YELLOW)));
        } else if dirty {
            spans.push(Span::styled("  unsaved changes", Style::default().fg(theme::CORAL)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), hints);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use backoffice_core::ResourceSlot;
    use backoffice_core::model::tree_from_values;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_s() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)
    }

    fn loaded() -> LinksPane {
        let mut pane = LinksPane::new();
        let slot = Arc::new(ResourceSlot {
            tree: tree_from_values(&[
                json!({"id": 11, "name": "Cash"}),
                json!({"id": 12, "name": "Bank"}),
                json!({"id": 13, "name": "Sales"}),
            ]),
            ..ResourceSlot::default()
        });
        pane.update(&Action::SlotUpdated(Resource::Accounts, slot))
            .unwrap();
        pane.update(&Action::Executed {
            origin: Origin::Links,
            result: Ok(CommandResult::AccountLinks(vec![
                json!({"key": "cash", "label": "Cash on hand", "account_id": 11}),
                json!({"key": "sales", "label": "Sales", "account_id": null}),
            ])),
        })
        .unwrap();
        pane
    }

    #[test]
    fn saving_without_changes_only_informs() {
        let mut pane = loaded();
        let action = pane.handle_key_event(ctrl_s()).unwrap();
        assert!(matches!(action, Some(Action::Notify(n)) if n.message == "No changes to save"));
    }

    #[test]
    fn account_of_another_role_cannot_be_picked() {
        let mut pane = loaded();
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        pane.handle_key_event(key(KeyCode::Enter)).unwrap();
        // Cursor starts on Cash, which the cash role already holds.
        let action = pane.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(matches!(action, Some(Action::Notify(_))));
        assert!(pane.picker.is_some());
        assert!(!pane.form.as_ref().unwrap().is_dirty());
    }

    #[test]
    fn save_sends_only_the_changed_role() {
        let mut pane = loaded();
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        pane.handle_key_event(key(KeyCode::Enter)).unwrap();
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        pane.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(pane.picker.is_none());

        match pane.handle_key_event(ctrl_s()).unwrap() {
            Some(Action::Execute {
                origin: Origin::Links,
                command: Command::SaveAccountLinks { changes },
            }) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].key, "sales");
                assert_eq!(changes[0].account_id, Some(EntityId::from(13)));
            }
            other => panic!("unexpected {other:?}"),
        }
        // A second Ctrl+S while saving does nothing.
        assert!(pane.handle_key_event(ctrl_s()).unwrap().is_none());

        let reload = pane
            .update(&Action::Executed {
                origin: Origin::Links,
                result: Ok(CommandResult::Mutation {
                    entity: None,
                    message: "Saved".into(),
                }),
            })
            .unwrap();
        assert!(matches!(
            reload,
            Some(Action::Execute {
                command: Command::FetchAccountLinks,
                ..
            })
        ));
    }
}
