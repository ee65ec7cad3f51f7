//! One tab: a resource navigator on the left, the selected resource's
//! pane on the right.

use std::cell::Cell;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use strum::IntoEnumIterator;
use tokio::sync::mpsc::UnboundedSender;

use backoffice_core::{Resource, ResourceGroup};

use crate::action::Action;
use crate::component::Component;
use crate::screens::journal::JournalPane;
use crate::screens::links::LinksPane;
use crate::screens::list::ListPane;
use crate::screens::tree::TreePane;
use crate::theme;

fn pane_for(resource: Resource) -> Box<dyn Component> {
    if resource.is_tree() {
        return Box::new(TreePane::new(resource));
    }
    match resource {
        Resource::JournalEntries => Box::new(JournalPane::new()),
        Resource::AccountLinks => Box::new(LinksPane::new()),
        _ => Box::new(ListPane::new(resource)),
    }
}

pub struct GroupScreen {
    group: ResourceGroup,
    panes: Vec<(Resource, Box<dyn Component>)>,
    active: usize,
    focused: bool,
    nav_area: Cell<Rect>,
}

impl GroupScreen {
    pub fn new(group: ResourceGroup) -> Self {
        let panes = Resource::iter()
            .filter(|r| r.group() == group)
            .map(|r| (r, pane_for(r)))
            .collect();
        Self {
            group,
            panes,
            active: 0,
            focused: false,
            nav_area: Cell::new(Rect::default()),
        }
    }

    pub fn active_resource(&self) -> Option<Resource> {
        self.panes.get(self.active).map(|(r, _)| *r)
    }

    fn activate(&mut self, index: usize) {
        if index == self.active || index >= self.panes.len() {
            return;
        }
        if let Some((_, pane)) = self.panes.get_mut(self.active) {
            pane.set_focused(false);
        }
        self.active = index;
        if self.focused {
            if let Some((_, pane)) = self.panes.get_mut(self.active) {
                pane.set_focused(true);
            }
        }
    }

    fn active_pane(&self) -> Option<&dyn Component> {
        self.panes.get(self.active).map(|(_, p)| p.as_ref())
    }

    fn active_pane_mut(&mut self) -> Option<&mut Box<dyn Component>> {
        self.panes.get_mut(self.active).map(|(_, p)| p)
    }
}

impl Component for GroupScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        for (_, pane) in &mut self.panes {
            pane.init(action_tx.clone())?;
        }
        Ok(())
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if let Some(pane) = self.active_pane_mut() {
            pane.set_focused(focused);
        }
    }

    fn captures_input(&self) -> bool {
        self.active_pane().is_some_and(Component::captures_input)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if !self.captures_input() {
            match key.code {
                KeyCode::Char(']') => {
                    self.activate((self.active + 1) % self.panes.len().max(1));
                    return Ok(None);
                }
                KeyCode::Char('[') => {
                    let len = self.panes.len().max(1);
                    self.activate((self.active + len - 1) % len);
                    return Ok(None);
                }
                _ => {}
            }
        }
        match self.active_pane_mut() {
            Some(pane) => pane.handle_key_event(key),
            None => Ok(None),
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let nav = self.nav_area.get();
        if nav.contains(Position::new(mouse.column, mouse.row)) {
            if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                // First row is the border.
                let row = usize::from(mouse.row.saturating_sub(nav.y + 1));
                self.activate(row);
            }
            return Ok(None);
        }
        match self.active_pane_mut() {
            Some(pane) => pane.handle_mouse_event(mouse),
            None => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::OpenResource(resource) = action {
            if let Some(index) = self.panes.iter().position(|(r, _)| r == resource) {
                self.activate(index);
            }
            return Ok(None);
        }
        if action.is_broadcast() {
            // Follow-ups from different panes cannot be merged; the first wins.
            let mut follow_up = None;
            for (_, pane) in &mut self.panes {
                if let Some(next) = pane.update(action)? {
                    follow_up.get_or_insert(next);
                }
            }
            return Ok(follow_up);
        }
        match self.active_pane_mut() {
            Some(pane) => pane.update(action),
            None => Ok(None),
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [nav, content] =
            Layout::horizontal([Constraint::Length(24), Constraint::Min(1)]).areas(area);
        self.nav_area.set(nav);

        let block = Block::default()
            .title(format!(" {} ", self.group))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let lines: Vec<Line> = self
            .panes
            .iter()
            .enumerate()
            .map(|(i, (resource, _))| {
                if i == self.active {
                    Line::from(Span::styled(format!("▸ {}", resource.label()), theme::tab_active()))
                } else {
                    Line::from(Span::styled(format!("  {}", resource.label()), theme::tab_inactive()))
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), nav);

        if let Some(pane) = self.active_pane() {
            pane.render(frame, content);
        }
    }
}
