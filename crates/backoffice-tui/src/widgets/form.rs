//! Generic create/edit form over a record's scalar fields.
//!
//! Edit forms list the record's writable scalar fields; create forms
//! list the resource's own list columns. Values go back typed like the
//! original field (numbers stay numbers, flags stay booleans).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use serde_json::{Map, Value};

use backoffice_core::{Command, Entity, EntityId, Resource};

use crate::action::Failure;
use crate::theme;
use crate::widgets::text_field::TextField;

/// Fields never offered for editing.
const READ_ONLY: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Number,
    Flag,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Flag,
            _ => Self::Text,
        }
    }

    fn parse(self, raw: &str) -> Value {
        let raw = raw.trim();
        match self {
            Self::Number => serde_json::from_str::<serde_json::Number>(raw)
                .map_or_else(|_| Value::String(raw.to_owned()), Value::Number),
            Self::Flag => match raw.to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Value::Bool(true),
                "no" | "false" | "0" => Value::Bool(false),
                _ => Value::String(raw.to_owned()),
            },
            Self::Text => Value::String(raw.to_owned()),
        }
    }
}

struct Field {
    key: String,
    kind: Kind,
    input: TextField,
}

/// What a key press did to the form.
#[derive(Debug)]
pub enum FormEvent {
    Pending,
    Submit(Command),
    Cancelled,
}

pub struct RecordForm {
    resource: Resource,
    /// `None` for a create form.
    id: Option<EntityId>,
    fields: Vec<Field>,
    /// Sent unchanged with every submit (e.g. `parent_id` of a new child).
    fixed: Map<String, Value>,
    focus: usize,
    failure: Option<Failure>,
    submitting: bool,
}

impl RecordForm {
    pub fn create(resource: Resource) -> Self {
        let fields = resource
            .columns()
            .iter()
            .filter(|c| !c.key.contains('.') && !READ_ONLY.contains(&c.key))
            .map(|c| Field {
                key: c.key.to_owned(),
                kind: if c.key.starts_with("is_") {
                    Kind::Flag
                } else {
                    Kind::Text
                },
                input: TextField::new(c.title),
            })
            .collect();
        Self::with_fields(resource, None, fields)
    }

    pub fn edit(resource: Resource, entity: &Entity) -> Self {
        let fields = entity
            .as_value()
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, value)| {
                !READ_ONLY.contains(&key.as_str())
                    && !(value.is_object() || value.is_array() || value.is_null())
            })
            .map(|(key, value)| Field {
                key: key.clone(),
                kind: Kind::of(value),
                input: TextField::new(key.replace('_', " ")).with_value(match value {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => if *b { "yes" } else { "no" }.to_owned(),
                    other => other.to_string(),
                }),
            })
            .collect();
        Self::with_fields(resource, entity.id(), fields)
    }

    fn with_fields(resource: Resource, id: Option<EntityId>, fields: Vec<Field>) -> Self {
        Self {
            resource,
            id,
            fields,
            fixed: Map::new(),
            focus: 0,
            failure: None,
            submitting: false,
        }
    }

    #[must_use]
    pub fn with_fixed(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fixed.insert(key.into(), value);
        self
    }

    /// Keep every field of `base` the form does not show, so an edit
    /// never drops data the form cannot express (journal lines).
    #[must_use]
    pub fn with_base(mut self, base: Value) -> Self {
        if let Value::Object(base) = base {
            for (key, value) in base {
                if !self.fields.iter().any(|f| f.key == key) {
                    self.fixed.entry(key).or_insert(value);
                }
            }
        }
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    /// Request body: fixed values, then every field. Blank fields are
    /// left out of create forms and sent as `null` from edit forms.
    pub fn body(&self) -> Value {
        let mut body = self.fixed.clone();
        for field in &self.fields {
            let raw = field.input.value();
            if raw.trim().is_empty() {
                if self.is_edit() {
                    body.insert(field.key.clone(), Value::Null);
                }
                continue;
            }
            body.insert(field.key.clone(), field.kind.parse(raw));
        }
        Value::Object(body)
    }

    pub fn command(&self) -> Command {
        let body = self.body();
        match &self.id {
            Some(id) => Command::Update {
                resource: self.resource,
                id: id.clone(),
                body,
            },
            None => Command::Create {
                resource: self.resource,
                body,
            },
        }
    }

    /// A rejected submit keeps the form open with the server's messages.
    pub fn fail(&mut self, failure: Failure) {
        self.submitting = false;
        self.failure = Some(failure);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        if self.submitting {
            return FormEvent::Pending;
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => {
                self.submitting = true;
                self.failure = None;
                FormEvent::Submit(self.command())
            }
            (_, KeyCode::Esc) => FormEvent::Cancelled,
            (_, KeyCode::Tab | KeyCode::Down | KeyCode::Enter) => {
                if !self.fields.is_empty() {
                    self.focus = (self.focus + 1) % self.fields.len();
                }
                FormEvent::Pending
            }
            (_, KeyCode::BackTab | KeyCode::Up) => {
                if !self.fields.is_empty() {
                    self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
                }
                FormEvent::Pending
            }
            _ => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.input.handle_key(key);
                }
                FormEvent::Pending
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let title = if self.is_edit() {
            format!(" Edit {} ", self.resource.label())
        } else {
            format!(" New {} ", self.resource.label())
        };
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [fields_area, message_area, hint_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        let label_width = self
            .fields
            .iter()
            .map(|f| f.input.label().chars().count())
            .max()
            .and_then(|w| u16::try_from(w + 3).ok())
            .unwrap_or(12);

        let mut y = fields_area.y;
        for (i, field) in self.fields.iter().enumerate() {
            if y >= fields_area.bottom() {
                break;
            }
            let row = Rect::new(fields_area.x + 1, y, fields_area.width.saturating_sub(2), 1);
            field.input.render(frame, row, label_width, i == self.focus);
            y += 1;
            if let Some(message) = self.failure.as_ref().and_then(|f| f.field(&field.key)) {
                if y < fields_area.bottom() {
                    let err = Rect::new(row.x + label_width, y, row.width.saturating_sub(label_width), 1);
                    frame.render_widget(
                        Paragraph::new(Span::styled(message.to_owned(), Style::default().fg(theme::ERROR_RED))),
                        err,
                    );
                    y += 1;
                }
            }
        }

        let status = if self.submitting {
            Line::from(Span::styled(" Saving…", Style::default().fg(theme::ELECTRIC_YELLOW)))
        } else if let Some(failure) = &self.failure {
            Line::from(Span::styled(
                format!(" {}", failure.message),
                Style::default().fg(theme::ERROR_RED),
            ))
        } else {
            Line::default()
        };
        frame.render_widget(Paragraph::new(status), message_area);

        let hints = Line::from(vec![
            Span::styled(" Tab ", theme::key_hint_key()),
            Span::styled("next field  ", theme::key_hint()),
            Span::styled("Ctrl+S ", theme::key_hint_key()),
            Span::styled("save  ", theme::key_hint()),
            Span::styled("Esc ", theme::key_hint_key()),
            Span::styled("cancel", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), hint_area);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut RecordForm, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn edit_form_keeps_field_types() {
        let entity = Entity::new(json!({
            "id": 9, "name": "Main", "sort_order": 3, "is_active": true,
            "bank": {"id": 1}, "created_at": "2024-01-01", "note": null
        }));
        let form = RecordForm::edit(Resource::Safes, &entity);
        assert!(form.is_edit());
        assert_eq!(
            form.body(),
            json!({"name": "Main", "sort_order": 3, "is_active": true})
        );
    }

    #[test]
    fn create_form_skips_blank_and_nested_columns() {
        let mut form = RecordForm::create(Resource::Vendors).with_fixed("parent_id", json!(4));
        type_text(&mut form, "Acme");
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut form, "no");
        assert_eq!(
            form.body(),
            json!({"parent_id": 4, "name": "Acme", "is_active": false})
        );
    }

    #[test]
    fn base_fields_the_form_cannot_show_are_kept() {
        let entity = Entity::new(json!({"id": 5, "date": "2024-05-01", "lines": [{"debit": 10}]}));
        let form = RecordForm::edit(Resource::JournalEntries, &entity)
            .with_base(json!({"date": "ignored", "lines": [{"debit": 10}]}));
        assert_eq!(
            form.body(),
            json!({"date": "2024-05-01", "lines": [{"debit": 10}]})
        );
    }

    #[test]
    fn ctrl_s_submits_once_until_the_result_arrives() {
        let mut form = RecordForm::create(Resource::Branches);
        type_text(&mut form, "HQ");
        let event = form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(matches!(
            event,
            FormEvent::Submit(Command::Create {
                resource: Resource::Branches,
                ..
            })
        ));
        assert!(matches!(
            form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            FormEvent::Pending
        ));

        form.fail(Failure {
            message: "Invalid".into(),
            fields: vec![("name".into(), "Taken".into())],
        });
        assert!(matches!(form.handle_key(key(KeyCode::Esc)), FormEvent::Cancelled));
    }
}
