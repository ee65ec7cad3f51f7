//! Popup context menu.
//!
//! Opened by `m` or a right click. Any key other than navigation and
//! Enter closes it without acting, and so does a click outside it; the
//! dismissing key or click is swallowed.

use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use crate::theme;

/// Result of feeding one input event to an open menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent<T> {
    /// Still open.
    Pending,
    Chosen(T),
    Dismissed,
}

pub struct ContextMenu<T> {
    title: String,
    items: Vec<(String, T)>,
    selected: usize,
    /// Terminal cell the menu opens at; centered when `None`.
    anchor: Option<(u16, u16)>,
    area: Cell<Rect>,
}

impl<T: Clone> ContextMenu<T> {
    pub fn new(title: impl Into<String>, items: Vec<(String, T)>) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
            anchor: None,
            area: Cell::new(Rect::default()),
        }
    }

    #[must_use]
    pub fn at(mut self, column: u16, row: u16) -> Self {
        self.anchor = Some((column, row));
        self
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected).map(|(_, v)| v)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuEvent<T> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
                MenuEvent::Pending
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                MenuEvent::Pending
            }
            KeyCode::Enter => self
                .selected()
                .cloned()
                .map_or(MenuEvent::Dismissed, MenuEvent::Chosen),
            _ => MenuEvent::Dismissed,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> MenuEvent<T> {
        let area = self.area.get();
        let inside = area.contains(Position::new(mouse.column, mouse.row));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => {
                let row = mouse.row.saturating_sub(area.y + 1);
                self.items
                    .get(usize::from(row))
                    .map_or(MenuEvent::Pending, |(_, v)| MenuEvent::Chosen(v.clone()))
            }
            MouseEventKind::Down(_) if !inside => MenuEvent::Dismissed,
            _ => MenuEvent::Pending,
        }
    }

    pub fn render(&self, frame: &mut Frame, bounds: Rect) {
        let label_width = self
            .items
            .iter()
            .map(|(label, _)| label.chars().count())
            .chain(std::iter::once(self.title.chars().count()))
            .max()
            .unwrap_or(0);
        let width = u16::try_from(label_width + 6)
            .unwrap_or(u16::MAX)
            .min(bounds.width);
        let height = u16::try_from(self.items.len() + 2)
            .unwrap_or(u16::MAX)
            .min(bounds.height);

        let (x, y) = self.anchor.unwrap_or((
            bounds.x + bounds.width.saturating_sub(width) / 2,
            bounds.y + bounds.height.saturating_sub(height) / 2,
        ));
        let x = x.clamp(bounds.x, (bounds.x + bounds.width).saturating_sub(width));
        let y = y.clamp(bounds.y, (bounds.y + bounds.height).saturating_sub(height));
        let area = Rect::new(x, y, width, height);
        self.area.set(area);

        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, (label, _))| {
                let style = if i == self.selected {
                    theme::table_selected()
                } else {
                    theme::table_row()
                };
                Line::from(Span::styled(format!(" {label} "), style))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn menu() -> ContextMenu<&'static str> {
        ContextMenu::new(
            "Account",
            vec![("Add child".into(), "add"), ("Edit".into(), "edit")],
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn enter_chooses_the_highlighted_item() {
        let mut m = menu();
        assert_eq!(m.handle_key(key(KeyCode::Down)), MenuEvent::Pending);
        assert_eq!(m.handle_key(key(KeyCode::Enter)), MenuEvent::Chosen("edit"));
    }

    #[test]
    fn any_other_key_dismisses() {
        let mut m = menu();
        assert_eq!(m.handle_key(key(KeyCode::Char('x'))), MenuEvent::Dismissed);
        assert_eq!(m.handle_key(key(KeyCode::Esc)), MenuEvent::Dismissed);
    }

    #[test]
    fn clicks_hit_items_inside_and_dismiss_outside() {
        let mut m = menu().at(2, 2);
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal
            .draw(|frame| m.render(frame, frame.area()))
            .unwrap();

        // Border row is y=2, so the second item sits on y=4.
        assert_eq!(
            m.handle_mouse(click(MouseEventKind::Down(MouseButton::Left), 4, 4)),
            MenuEvent::Chosen("edit")
        );
        assert_eq!(
            m.handle_mouse(click(MouseEventKind::Down(MouseButton::Left), 39, 11)),
            MenuEvent::Dismissed
        );
        assert_eq!(
            m.handle_mouse(click(MouseEventKind::Moved, 39, 11)),
            MenuEvent::Pending
        );
    }
}
