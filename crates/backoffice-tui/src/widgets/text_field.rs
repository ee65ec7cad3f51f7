//! Single-line text input with a label, backed by `tui-input`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tui_input::{Input, InputRequest};

use crate::theme;

pub struct TextField {
    label: String,
    input: Input,
    masked: bool,
}

impl TextField {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            input: Input::default(),
            masked: false,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input = Input::default().with_value(value.into());
        self
    }

    /// Render bullets instead of the text.
    #[must_use]
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn clear(&mut self) {
        self.input.reset();
    }

    /// Apply an editing key. Returns `false` for keys the field does not
    /// use, so the caller can treat them as navigation.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let request = match key.code {
            KeyCode::Char('u') if ctrl => InputRequest::DeleteLine,
            KeyCode::Char('w') if ctrl => InputRequest::DeletePrevWord,
            KeyCode::Char(_) if ctrl => return false,
            KeyCode::Char(c) => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Delete => InputRequest::DeleteNextChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return false,
        };
        self.input.handle(request);
        true
    }

    /// One row: `label: value`. Places the cursor when focused.
    pub fn render(&self, frame: &mut Frame, area: Rect, label_width: u16, focused: bool) {
        let shown = if self.masked {
            "•".repeat(self.input.value().chars().count())
        } else {
            self.input.value().to_owned()
        };
        let label_style = if focused {
            Style::default().fg(theme::ELECTRIC_PURPLE)
        } else {
            Style::default().fg(theme::DIM_WHITE)
        };
        let width = usize::from(label_width);
        let line = Line::from(vec![
            Span::styled(format!("{:<width$}", self.label), label_style),
            Span::styled(shown, Style::default().fg(theme::NEON_CYAN)),
        ]);
        frame.render_widget(Paragraph::new(line), area);

        if focused {
            let cursor = u16::try_from(self.input.visual_cursor()).unwrap_or(u16::MAX);
            let x = area
                .x
                .saturating_add(label_width)
                .saturating_add(cursor)
                .min(area.right().saturating_sub(1));
            frame.set_cursor_position(Position::new(x, area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn press(field: &mut TextField, code: KeyCode) -> bool {
        field.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn edits_at_the_cursor() {
        let mut field = TextField::new("Name").with_value("Acme");
        press(&mut field, KeyCode::Left);
        assert!(press(&mut field, KeyCode::Char('X')));
        assert_eq!(field.value(), "AcmXe");
        press(&mut field, KeyCode::End);
        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value(), "AcmX");
    }

    #[test]
    fn navigation_keys_are_left_to_the_caller() {
        let mut field = TextField::new("Name");
        assert!(!press(&mut field, KeyCode::Tab));
        assert!(!press(&mut field, KeyCode::Enter));
        assert!(!field.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        assert_eq!(field.value(), "");
    }
}
