//! Attachment section of a detail view.
//!
//! Existing attachments come from the detail record; staged files live
//! in an [`AttachmentDraft`] until the next save. Deleting an existing
//! attachment is confirmed and sent straight away, independent of any
//! save. Staged previews are released when a file is unstaged, when a
//! save succeeds, or when the view closes.

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use serde_json::Value;

use backoffice_core::{
    Attachment, AttachmentDraft, AttachmentUpload, Command, Entity, EntityId, PreviewRegistry,
    Resource, attachments_of,
};

use crate::action::{Action, ConfirmAction, Notification, Origin};
use crate::theme;
use crate::widgets::text_field::TextField;

pub struct AttachmentPanel {
    resource: Resource,
    registry: Arc<PreviewRegistry>,
    draft: AttachmentDraft,
    /// Cursor over existing attachments followed by staged files.
    cursor: usize,
    path_input: Option<TextField>,
    saving: bool,
}

impl AttachmentPanel {
    pub fn new(resource: Resource) -> Self {
        let registry = PreviewRegistry::new();
        Self {
            resource,
            draft: AttachmentDraft::new(Arc::clone(&registry)),
            registry,
            cursor: 0,
            path_input: None,
            saving: false,
        }
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    pub fn staged(&self) -> usize {
        self.draft.len()
    }

    pub fn captures_input(&self) -> bool {
        self.path_input.is_some()
    }

    /// Drop every staged file, releasing its preview.
    pub fn discard(&mut self) {
        self.draft = AttachmentDraft::new(Arc::clone(&self.registry));
        self.cursor = 0;
        self.path_input = None;
        self.saving = false;
    }

    pub fn on_staged(&mut self, result: &Result<AttachmentUpload, String>) -> Option<Action> {
        match result {
            Ok(upload) => {
                self.draft.add(upload.clone());
                None
            }
            Err(message) => Some(Action::Notify(Notification::error(message.clone()))),
        }
    }

    /// The save finished. Success releases the staged previews; failure
    /// keeps them for another try.
    pub fn on_saved(&mut self, ok: bool) {
        self.saving = false;
        if ok {
            self.discard();
        }
    }

    /// Keys for the attachment section. `body` is the record body sent
    /// alongside the files on save. Returns `None` for keys it ignores.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        entity: Option<&Entity>,
        body: impl FnOnce(&Entity) -> Value,
    ) -> Option<Option<Action>> {
        if let Some(input) = self.path_input.as_mut() {
            return Some(match key.code {
                KeyCode::Esc => {
                    self.path_input = None;
                    None
                }
                KeyCode::Enter => {
                    let path = input.value().trim().to_owned();
                    self.path_input = None;
                    (!path.is_empty()).then(|| Action::StageUpload(PathBuf::from(path)))
                }
                _ => {
                    input.handle_key(key);
                    None
                }
            });
        }

        let existing = entity.map(|e| attachments_of(e.as_value())).unwrap_or_default();
        let total = existing.len() + self.draft.len();
        match key.code {
            KeyCode::Char('a') => {
                self.path_input = Some(TextField::new("File: "));
                Some(None)
            }
            KeyCode::Char('J') => {
                if self.cursor + 1 < total {
                    self.cursor += 1;
                }
                Some(None)
            }
            KeyCode::Char('K') => {
                self.cursor = self.cursor.saturating_sub(1);
                Some(None)
            }
            KeyCode::Char('x') => Some(self.remove_at_cursor(&existing, entity)),
            KeyCode::Char('s') => {
                let entity = entity?;
                if self.draft.is_empty() || self.saving {
                    return Some(Some(Action::Notify(Notification::info("No files staged"))));
                }
                let id = entity.id()?;
                self.saving = true;
                let files = self.draft.iter().map(|p| p.upload.clone()).collect();
                Some(Some(Action::Execute {
                    origin: Origin::Attachments(self.resource),
                    command: Command::UpdateWithAttachments {
                        resource: self.resource,
                        id,
                        body: body(entity),
                        files,
                    },
                }))
            }
            _ => None,
        }
    }

    fn remove_at_cursor(&mut self, existing: &[Attachment], entity: Option<&Entity>) -> Option<Action> {
        if let Some(attachment) = existing.get(self.cursor) {
            let id = entity.and_then(Entity::id)?;
            let attachment_id: EntityId = attachment.id.clone()?;
            return Some(Action::ShowConfirm {
                confirm: ConfirmAction::DeleteAttachment {
                    resource: self.resource,
                    id,
                    attachment_id,
                    name: attachment.name.clone(),
                },
                origin: None,
            });
        }
        let staged = self.cursor.checked_sub(existing.len())?;
        self.draft.remove(staged)?;
        let total = existing.len() + self.draft.len();
        self.cursor = self.cursor.min(total.saturating_sub(1));
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, entity: Option<&Entity>) {
        let title = format!(
            " Attachments · {} staged · {} previews open ",
            self.draft.len(),
            self.registry.live()
        );
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let existing = entity.map(|e| attachments_of(e.as_value())).unwrap_or_default();
        let marker = |i: usize| if i == self.cursor { "▸ " } else { "  " };
        let mut lines: Vec<Line> = existing
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let size = a.size.map(|s| format!("  {s} B")).unwrap_or_default();
                Line::from(vec![
                    Span::styled(marker(i), Style::default().fg(theme::ELECTRIC_PURPLE)),
                    Span::styled(a.name.clone(), Style::default().fg(theme::NEON_CYAN)),
                    Span::styled(size, theme::key_hint()),
                ])
            })
            .collect();
        lines.extend(self.draft.iter().enumerate().map(|(i, pending)| {
            Line::from(vec![
                Span::styled(marker(existing.len() + i), Style::default().fg(theme::ELECTRIC_PURPLE)),
                Span::styled("+ ", Style::default().fg(theme::SUCCESS_GREEN)),
                Span::styled(pending.preview_label(), Style::default().fg(theme::ELECTRIC_YELLOW)),
            ])
        }));
        if lines.is_empty() {
            lines.push(Line::from(Span::styled("  No attachments", theme::key_hint())));
        }

        if let Some(input) = &self.path_input {
            let rows = inner.height.saturating_sub(1);
            frame.render_widget(Paragraph::new(lines), Rect { height: rows, ..inner });
            let input_row = Rect::new(inner.x + 1, inner.y + rows, inner.width.saturating_sub(2), 1);
            input.render(frame, input_row, 6, true);
        } else {
            if self.saving {
                lines.push(Line::from(Span::styled(
                    "  Uploading…",
                    Style::default().fg(theme::ELECTRIC_YELLOW),
                )));
            }
            frame.render_widget(Paragraph::new(lines), inner);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn upload(name: &str) -> AttachmentUpload {
        AttachmentUpload::new(name, vec![1_u8, 2, 3])
    }

    fn entry() -> Entity {
        Entity::new(json!({
            "id": 7,
            "attachments": [{"id": 40, "file_name": "receipt.pdf"}]
        }))
    }

    #[test]
    fn unstaging_and_closing_release_each_preview_once() {
        let mut panel = AttachmentPanel::new(Resource::JournalEntries);
        panel.on_staged(&Ok(upload("a.pdf")));
        panel.on_staged(&Ok(upload("b.pdf")));
        assert_eq!(panel.registry().live(), 2);

        // Cursor on the first staged file, after the one existing attachment.
        let entity = entry();
        panel.handle_key(key(KeyCode::Char('J')), Some(&entity), |e| e.as_value().clone());
        let action = panel.handle_key(key(KeyCode::Char('x')), Some(&entity), |e| e.as_value().clone());
        assert!(matches!(action, Some(None)));
        assert_eq!(panel.staged(), 1);
        assert_eq!(panel.registry().live(), 1);

        panel.discard();
        let registry = panel.registry();
        assert_eq!(registry.live(), 0);
        assert_eq!(registry.acquired(), 2);
        assert_eq!(registry.released(), 2);
        assert_eq!(registry.double_releases(), 0);
    }

    #[test]
    fn removing_an_existing_attachment_asks_for_confirmation() {
        let mut panel = AttachmentPanel::new(Resource::JournalEntries);
        let entity = entry();
        let action = panel
            .handle_key(key(KeyCode::Char('x')), Some(&entity), |e| e.as_value().clone())
            .flatten();
        match action {
            Some(Action::ShowConfirm {
                confirm: ConfirmAction::DeleteAttachment { attachment_id, .. },
                origin: None,
            }) => assert_eq!(attachment_id, EntityId::from(40)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn save_keeps_staged_files_until_it_succeeds() {
        let mut panel = AttachmentPanel::new(Resource::JournalEntries);
        panel.on_staged(&Ok(upload("a.pdf")));
        let entity = entry();
        let action = panel
            .handle_key(key(KeyCode::Char('s')), Some(&entity), |_| json!({"date": "2024-05-01"}))
            .flatten();
        match action {
            Some(Action::Execute {
                origin: Origin::Attachments(Resource::JournalEntries),
                command: Command::UpdateWithAttachments { files, body, .. },
            }) => {
                assert_eq!(files.len(), 1);
                assert_eq!(body, json!({"date": "2024-05-01"}));
            }
            other => panic!("unexpected {other:?}"),
        }

        panel.on_saved(false);
        assert_eq!(panel.staged(), 1);
        panel.on_saved(true);
        assert_eq!(panel.staged(), 0);
        assert_eq!(panel.registry().released(), 1);
    }

    #[test]
    fn path_prompt_stages_the_typed_file() {
        let mut panel = AttachmentPanel::new(Resource::LeaveRequests);
        panel.handle_key(key(KeyCode::Char('a')), None, |_| Value::Null);
        assert!(panel.captures_input());
        for c in "/tmp/x.pdf".chars() {
            panel.handle_key(key(KeyCode::Char(c)), None, |_| Value::Null);
        }
        let action = panel
            .handle_key(key(KeyCode::Enter), None, |_| Value::Null)
            .flatten();
        assert!(matches!(action, Some(Action::StageUpload(p)) if p == PathBuf::from("/tmp/x.pdf")));
        assert!(!panel.captures_input());
    }
}
