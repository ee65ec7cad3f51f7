//! Application core: event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use backoffice_core::{AttachmentUpload, BackOffice, Command, Language, RequestState};

use crate::action::{Action, ConfirmAction, Failure, Notification, NotificationLevel, Origin};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

/// Where an action goes after the app has handled it.
enum Route {
    Nowhere,
    Active,
    All,
}

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    help_visible: bool,
    search_active: bool,
    search_query: String,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    office: BackOffice,
    language: Language,
    /// Cancellation token for the data bridge task.
    data_cancel: CancellationToken,
    /// Pending confirmation dialog (blocks other input while active).
    pending_confirm: Option<(ConfirmAction, Option<Origin>)>,
    /// Active notification toast with display timestamp.
    notification: Option<(Notification, Instant)>,
}

impl App {
    /// `email` prefills the sign-in form.
    pub fn new(office: BackOffice, email: Option<String>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let screens = create_screens(email).into_iter().collect();
        let active_screen = if office.is_signed_in() {
            ScreenId::first_tab()
        } else {
            ScreenId::Login
        };
        let language = office.language();

        Self {
            active_screen,
            screens,
            running: true,
            help_visible: false,
            search_active: false,
            search_query: String::new(),
            action_tx,
            action_rx,
            office,
            language,
            data_cancel: CancellationToken::new(),
            pending_confirm: None,
            notification: None,
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        self.action_tx.send(Action::LanguageChanged(self.language))?;
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop until quit.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;

        let office = self.office.clone();
        let cancel = self.data_cancel.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            crate::data_bridge::spawn_data_bridge(office, tx, cancel).await;
        });

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                let render = matches!(action, Action::Render);
                self.process_action(action)?;
                if render {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// everything else goes to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        // Confirmation dialog captures all input
        if self.pending_confirm.is_some() {
            return Ok(match key.code {
                KeyCode::Char('y' | 'Y') => Some(Action::ConfirmYes),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Action::ConfirmNo),
                _ => None,
            });
        }

        if self.search_active {
            return Ok(match key.code {
                KeyCode::Esc => Some(Action::CloseSearch),
                KeyCode::Enter => Some(Action::SearchSubmit(self.search_query.trim().to_owned())),
                KeyCode::Backspace => {
                    self.search_query.pop();
                    None
                }
                KeyCode::Char(c) => {
                    self.search_query.push(c);
                    None
                }
                _ => None,
            });
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        let capturing = self
            .screens
            .get(&self.active_screen)
            .is_some_and(|s| s.captures_input());

        if !capturing {
            match (key.modifiers, key.code) {
                (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
                (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
                (KeyModifiers::NONE, KeyCode::Char('/')) => return Ok(Some(Action::OpenSearch)),
                (_, KeyCode::Char('L')) => return Ok(Some(Action::ToggleLanguage)),
                (_, KeyCode::Char('O')) => return Ok(Some(Action::Logout)),
                (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='9')) => {
                    let n = c.to_digit(10).and_then(|d| u8::try_from(d).ok());
                    if let Some(screen) = n.and_then(ScreenId::from_number) {
                        return Ok(Some(Action::SwitchScreen(screen)));
                    }
                }
                (KeyModifiers::NONE, KeyCode::Tab) => {
                    return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
                }
                (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                    return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
                }
                _ => {}
            }
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.pending_confirm.is_some() || self.help_visible {
            return Ok(None);
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_mouse_event(mouse);
        }
        Ok(None)
    }

    fn switch_to(&mut self, target: ScreenId) {
        if target == self.active_screen {
            return;
        }
        debug!("switching screen: {} → {}", self.active_screen, target);
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(false);
        }
        self.active_screen = target;
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notification = Some((notification, Instant::now()));
    }

    /// Update app state, then hand the action to the screens it concerns.
    fn process_action(&mut self, action: Action) -> Result<()> {
        let route = match &action {
            Action::Quit => {
                self.running = false;
                Route::Nowhere
            }
            Action::Render | Action::Resize(..) => Route::Nowhere,
            Action::Tick => {
                // Auto-dismiss notifications after 3 seconds
                if let Some((_, created)) = &self.notification {
                    if created.elapsed() > Duration::from_secs(3) {
                        self.notification = None;
                    }
                }
                Route::Active
            }

            Action::SwitchScreen(target) => {
                if *target == ScreenId::Login || self.office.is_signed_in() {
                    self.switch_to(*target);
                }
                Route::Nowhere
            }
            Action::OpenResource(resource) => {
                self.switch_to(ScreenId::of(*resource));
                Route::Active
            }
            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
                Route::Nowhere
            }
            Action::OpenSearch => {
                self.search_active = true;
                self.search_query.clear();
                Route::Nowhere
            }
            Action::CloseSearch => {
                self.search_active = false;
                self.search_query.clear();
                Route::Nowhere
            }
            Action::SearchSubmit(_) => {
                self.search_active = false;
                Route::Active
            }

            Action::ToggleLanguage => {
                self.language = match self.language {
                    Language::Ar => Language::En,
                    Language::En => Language::Ar,
                };
                self.office.set_language(self.language);
                self.action_tx.send(Action::LanguageChanged(self.language))?;
                Route::Nowhere
            }
            Action::LanguageChanged(_) | Action::SlotUpdated(..) | Action::Executed { .. } => {
                Route::All
            }

            Action::Login { email, password } => {
                let office = self.office.clone();
                let tx = self.action_tx.clone();
                let (email, password) = (email.clone(), password.clone());
                tokio::spawn(async move {
                    let result = office
                        .login(&email, &password)
                        .await
                        .map(|session| session.user_name().unwrap_or(email))
                        .map_err(|e| e.user_message());
                    let _ = tx.send(Action::LoginResult(result));
                });
                Route::Nowhere
            }
            Action::LoginResult(result) => {
                if let Ok(name) = result {
                    self.notify(Notification::success(format!("Signed in as {name}")));
                    self.switch_to(ScreenId::first_tab());
                }
                if let Some(screen) = self.screens.get_mut(&ScreenId::Login) {
                    screen.update(&action)?;
                }
                Route::Nowhere
            }
            Action::Logout => {
                let office = self.office.clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = office.logout().await {
                        warn!(error = %e, "sign out failed");
                    }
                    let _ = tx.send(Action::SignedOut);
                });
                Route::Nowhere
            }
            Action::SignedOut => {
                self.pending_confirm = None;
                self.switch_to(ScreenId::Login);
                Route::All
            }

            Action::RequestFinished(outcome) => {
                if let Some(toast) = Notification::from_outcome(outcome) {
                    self.notify(toast);
                }
                if let RequestState::Failed {
                    auth_expired: true, ..
                } = outcome.state
                {
                    info!("session expired; returning to sign in");
                    self.action_tx.send(Action::SignedOut)?;
                }
                Route::Nowhere
            }
            Action::CloseDetails(resource) => {
                self.office.store().clear_details(*resource);
                Route::Nowhere
            }

            Action::Dispatch(command) => {
                self.dispatch(command.clone());
                Route::Nowhere
            }
            Action::Execute { origin, command } => {
                self.execute(*origin, command.clone());
                Route::Nowhere
            }

            Action::StageUpload(path) => {
                let tx = self.action_tx.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    let staged = AttachmentUpload::from_path(&path)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(Action::UploadStaged(staged));
                });
                Route::Nowhere
            }
            Action::UploadStaged(_) => Route::Active,

            Action::ShowConfirm { confirm, origin } => {
                self.pending_confirm = Some((confirm.clone(), *origin));
                Route::Nowhere
            }
            Action::ConfirmYes => {
                if let Some((confirm, origin)) = self.pending_confirm.take() {
                    let command = confirm.into_command();
                    match origin {
                        Some(origin) => self.execute(origin, command),
                        None => self.dispatch(command),
                    }
                }
                Route::Nowhere
            }
            Action::ConfirmNo => {
                self.pending_confirm = None;
                Route::Nowhere
            }

            Action::Notify(notification) => {
                self.notify(notification.clone());
                Route::Nowhere
            }
            Action::DismissNotification => {
                self.notification = None;
                Route::Nowhere
            }
        };

        match route {
            Route::Nowhere => {}
            Route::Active => {
                if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    if let Some(follow_up) = screen.update(&action)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
            Route::All => {
                for screen in self.screens.values_mut() {
                    if let Some(follow_up) = screen.update(&action)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Fire a command; its outcome comes back through the data bridge.
    fn dispatch(&self, command: Command) {
        let office = self.office.clone();
        tokio::spawn(async move {
            if let Err(e) = office.dispatch(command).await {
                warn!(error = %e, "dispatch failed");
            }
        });
    }

    /// Run a command and report the result to the view that asked.
    fn execute(&self, origin: Origin, command: Command) {
        let office = self.office.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = office
                .execute(command)
                .await
                .map_err(|e| Failure::from_error(&e));
            let _ = tx.send(Action::Executed { origin, result });
        });
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // The sign-in form gets the full frame
        if self.active_screen == ScreenId::Login {
            if let Some(screen) = self.screens.get(&ScreenId::Login) {
                screen.render(frame, area);
            }
            if let Some((notif, _)) = &self.notification {
                Self::render_notification(frame, area, notif);
            }
            return;
        }

        let [content_area, tab_area, status_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, content_area);
        }
        self.render_tab_bar(frame, tab_area);
        self.render_status_bar(frame, status_area);

        // Overlays, last = topmost
        if let Some((notif, _)) = &self.notification {
            Self::render_notification(frame, area, notif);
        }
        if let Some((confirm, _)) = &self.pending_confirm {
            Self::render_confirm_dialog(frame, area, confirm);
        }
        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let tabs = ScreenId::tabs();
        let titles: Vec<Line> = tabs
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                let number = id.number().map(|n| n.to_string()).unwrap_or_default();
                Line::from(Span::styled(format!(" {number} {} ", id.label()), style))
            })
            .collect();

        let bar = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(tabs.iter().position(|&s| s == self.active_screen).unwrap_or(0));
        frame.render_widget(bar, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if self.search_active {
            let line = Line::from(vec![
                Span::styled(" / ", Style::default().fg(theme::ELECTRIC_PURPLE)),
                Span::styled(&self.search_query, Style::default().fg(theme::NEON_CYAN)),
                Span::styled("█", Style::default().fg(theme::NEON_CYAN)),
                Span::styled("  Esc cancel  Enter search", theme::key_hint()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            return;
        }

        let pending = self.office.status().pending_count();
        let activity = if pending > 0 {
            Span::styled(
                format!("◐ working ({pending})"),
                Style::default().fg(theme::ELECTRIC_YELLOW),
            )
        } else {
            Span::styled("● ready", Style::default().fg(theme::SUCCESS_GREEN))
        };
        let user = self
            .office
            .session()
            .and_then(|s| s.user_name())
            .unwrap_or_else(|| "signed out".into());
        let language = match self.language {
            Language::Ar => "AR",
            Language::En => "EN",
        };

        let line = Line::from(vec![
            Span::raw(" "),
            activity,
            Span::styled(format!(" │ {user} │ {language}"), Style::default().fg(theme::DIM_WHITE)),
            Span::styled(
                " │ ? help  / search  L language  O sign out  q quit",
                theme::key_hint(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let help_width = 60u16.min(area.width.saturating_sub(4));
        let help_height = 24u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let row = |key: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(what, theme::key_hint()),
            ])
        };
        let heading = |title: &'static str| {
            Line::from(Span::styled(format!("  {title}"), Style::default().fg(theme::NEON_CYAN)))
        };

        let help_text = vec![
            Line::from(""),
            heading("Navigation"),
            row("1-5 Tab", "Switch tab"),
            row("[ ]", "Previous / next resource"),
            row("j/k g/G", "Move, top, bottom"),
            row("n/p", "Next / previous page"),
            row("Enter", "Open record / expand node"),
            row("Esc", "Close"),
            Line::from(""),
            heading("Records"),
            row("c e", "Create, edit"),
            row("t d", "Toggle status, delete"),
            row("m", "Row menu (or right click)"),
            row("a x s", "Attach, remove, upload files"),
            row("Ctrl+S", "Save form"),
            Line::from(""),
            heading("Global"),
            row("/", "Search this list"),
            row("L", "Switch language"),
            row("O", "Sign out"),
            row("q", "Quit"),
            Line::from(""),
            Line::from(Span::styled(
                "                         Esc or ? to close",
                theme::key_hint(),
            )),
        ];
        frame.render_widget(Paragraph::new(help_text), inner);
    }

    fn render_confirm_dialog(frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
        let width = 50u16.min(area.width.saturating_sub(4));
        let height = 5u16;

        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let dialog_area = Rect::new(area.x + x, area.y + y, width, height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            dialog_area,
        );

        let block = Block::default()
            .title(" Confirm ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::ELECTRIC_YELLOW));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let text = vec![
            Line::from(Span::styled(
                format!("  {confirm}"),
                Style::default().fg(theme::DIM_WHITE),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("  y ", theme::key_hint_key()),
                Span::styled("confirm    ", theme::key_hint()),
                Span::styled("n ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ]),
        ];
        frame.render_widget(Paragraph::new(text), inner);
    }

    /// Toast in the bottom-right corner, above the status bar.
    fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
        let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
        let width = msg_len.saturating_add(6).clamp(20, 60).min(area.width);
        let height = 3u16;

        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2);
        let toast_area = Rect::new(area.x + x, area.y + y, width, height);

        let (border_color, icon) = match notif.level {
            NotificationLevel::Success => (theme::SUCCESS_GREEN, "✓"),
            NotificationLevel::Error => (theme::ERROR_RED, "✗"),
            NotificationLevel::Info => (theme::NEON_CYAN, "·"),
        };

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            toast_area,
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(&notif.message, Style::default().fg(theme::DIM_WHITE)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
