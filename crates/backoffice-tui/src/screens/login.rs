//! Sign-in form shown until a session exists.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use secrecy::SecretString;

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::text_field::TextField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    Password,
}

pub struct LoginScreen {
    email: TextField,
    password: TextField,
    focus: Field,
    signing_in: bool,
    error: Option<String>,
    throbber_state: throbber_widgets_tui::ThrobberState,
}

impl LoginScreen {
    pub fn new(email: Option<String>) -> Self {
        let focus = if email.is_some() {
            Field::Password
        } else {
            Field::Email
        };
        Self {
            email: TextField::new("Email").with_value(email.unwrap_or_default()),
            password: TextField::new("Password").masked(),
            focus,
            signing_in: false,
            error: None,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
        }
    }

    fn submit(&mut self) -> Option<Action> {
        let email = self.email.value().trim().to_owned();
        if email.is_empty() {
            self.focus = Field::Email;
            self.error = Some("Email is required".into());
            return None;
        }
        if self.password.value().is_empty() {
            self.focus = Field::Password;
            self.error = Some("Password is required".into());
            return None;
        }
        self.signing_in = true;
        self.error = None;
        Some(Action::Login {
            email,
            password: SecretString::from(self.password.value().to_owned()),
        })
    }

    fn focused(&mut self) -> &mut TextField {
        match self.focus {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }
}

impl Component for LoginScreen {
    fn captures_input(&self) -> bool {
        true
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.signing_in {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    Field::Email => Field::Password,
                    Field::Password => Field::Email,
                };
                None
            }
            KeyCode::Enter => match self.focus {
                Field::Email => {
                    self.focus = Field::Password;
                    None
                }
                Field::Password => self.submit(),
            },
            KeyCode::Esc => Some(Action::Quit),
            _ => {
                self.focused().handle_key(key);
                None
            }
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Tick if self.signing_in => self.throbber_state.calc_next(),
            Action::LoginResult(result) => {
                self.signing_in = false;
                self.password.clear();
                self.error = result.as_ref().err().cloned();
            }
            Action::SignedOut => {
                self.signing_in = false;
                self.password.clear();
                self.focus = Field::Password;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.min(60);
        let height = area.height.min(11);
        let card = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, card);
        let block = Block::default()
            .title(" Sign in ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(card);
        frame.render_widget(block, card);

        let [_, email, password, _, status, _, hints] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

        let pad = |r: Rect| Rect::new(r.x + 2, r.y, r.width.saturating_sub(4), 1);
        self.email
            .render(frame, pad(email), 11, self.focus == Field::Email && !self.signing_in);
        self.password.render(
            frame,
            pad(password),
            11,
            self.focus == Field::Password && !self.signing_in,
        );

        if self.signing_in {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label("  Signing in...")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, status, &mut self.throbber_state.clone());
        } else if let Some(error) = &self.error {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  {error}"),
                    Style::default().fg(theme::ERROR_RED),
                )),
                status,
            );
        }

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" Tab ", theme::key_hint_key()),
                Span::styled("next  ", theme::key_hint()),
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("sign in  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("quit", theme::key_hint()),
            ])),
            hints,
        );
    }
}
