//! Journal entries: the generic list, with a detail view showing the
//! entry's lines, running totals and attachments.
//!
//! `l` opens a line editor over the detail view: debit and credit per
//! line, with the totals recomputed on every keystroke.
//!
//! The difference between debit and credit is coloured by balance but
//! never blocks a save or a transition; the server decides.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use backoffice_core::{
    Balance, Command, DomainAction, Entity, EntityId, JournalLine, JournalTotals, Resource,
    edit_body, format_amount, lines_of, parse_amount,
};

use crate::action::{Action, Failure, Origin};
use crate::component::Component;
use crate::screens::list::ListPane;
use crate::theme;
use crate::widgets::text_field::TextField;

const AMOUNT_WIDTH: u16 = 24;

/// One editable row: the account shown read-only, amounts as inputs.
struct EditedLine {
    account: String,
    debit: TextField,
    credit: TextField,
}

enum EditorEvent {
    Pending,
    Submit(Command),
    Cancelled,
}

/// Debit/credit editing for every line of one entry.
struct LineEditor {
    id: EntityId,
    base: Value,
    lines: Vec<EditedLine>,
    /// Two inputs per line: `2 * line` is the debit, `2 * line + 1` the credit.
    focus: usize,
    failure: Option<Failure>,
}

impl LineEditor {
    fn open(entity: &Entity) -> Option<Self> {
        let id = entity.id()?;
        let parsed = lines_of(entity.as_value());
        let raw = raw_lines(entity.as_value());
        let lines = parsed
            .iter()
            .zip(raw.iter())
            .map(|(line, raw)| EditedLine {
                account: raw
                    .text("account.name")
                    .or_else(|| line.account_id.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| "─".into()),
                debit: TextField::new("Debit ").with_value(format_amount(line.debit)),
                credit: TextField::new("Credit ").with_value(format_amount(line.credit)),
            })
            .collect();
        Some(Self {
            id,
            base: edit_body(entity.as_value()),
            lines,
            focus: 0,
            failure: None,
        })
    }

    fn inputs(&self) -> usize {
        self.lines.len() * 2
    }

    fn focused_field(&mut self) -> Option<&mut TextField> {
        let line = self.lines.get_mut(self.focus / 2)?;
        Some(if self.focus % 2 == 0 {
            &mut line.debit
        } else {
            &mut line.credit
        })
    }

    /// Amounts as typed, parsed the same way server values are.
    fn amounts(&self) -> Vec<JournalLine> {
        let amount = |field: &TextField| parse_amount(&Value::String(field.value().to_owned()));
        self.lines
            .iter()
            .map(|line| JournalLine {
                debit: amount(&line.debit),
                credit: amount(&line.credit),
                ..JournalLine::default()
            })
            .collect()
    }

    fn totals(&self) -> JournalTotals {
        JournalTotals::from_lines(&self.amounts())
    }

    /// The entry's edit body with each line's amounts replaced.
    fn body(&self) -> Value {
        let mut body = self.base.clone();
        if let Some(lines) = body.get_mut("lines").and_then(Value::as_array_mut) {
            for (line, edited) in lines.iter_mut().zip(self.amounts()) {
                if let Some(fields) = line.as_object_mut() {
                    fields.insert("debit".into(), Value::String(format_amount(edited.debit)));
                    fields.insert("credit".into(), Value::String(format_amount(edited.credit)));
                }
            }
        }
        body
    }

    fn fail(&mut self, failure: Failure) {
        self.failure = Some(failure);
    }

    fn handle_key(&mut self, key: KeyEvent) -> EditorEvent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let count = self.inputs();
        match key.code {
            KeyCode::Esc => return EditorEvent::Cancelled,
            KeyCode::Char('s') if ctrl => {
                return EditorEvent::Submit(Command::Update {
                    resource: Resource::JournalEntries,
                    id: self.id.clone(),
                    body: self.body(),
                });
            }
            KeyCode::Tab | KeyCode::Enter if count > 0 => self.focus = (self.focus + 1) % count,
            KeyCode::BackTab if count > 0 => self.focus = (self.focus + count - 1) % count,
            KeyCode::Down if self.focus + 2 < count => self.focus += 2,
            KeyCode::Up if self.focus >= 2 => self.focus -= 2,
            _ => {
                if let Some(field) = self.focused_field() {
                    field.handle_key(key);
                }
            }
        }
        EditorEvent::Pending
    }

    fn render(&self, frame: &mut Frame, lines_area: Rect, totals_area: Rect, hints_area: Rect) {
        let block = Block::default()
            .title(" Edit lines ")
            .title_style(theme::title_style())
            .borders(Borders::TOP)
            .border_style(theme::border_focused());
        let inner = block.inner(lines_area);
        frame.render_widget(block, lines_area);

        for (i, line) in self.lines.iter().enumerate() {
            let Ok(offset) = u16::try_from(i) else { break };
            if offset >= inner.height {
                break;
            }
            let row = Rect::new(inner.x, inner.y + offset, inner.width, 1);
            let [account, debit, credit] = Layout::horizontal([
                Constraint::Min(8),
                Constraint::Length(AMOUNT_WIDTH),
                Constraint::Length(AMOUNT_WIDTH),
            ])
            .areas(row);
            frame.render_widget(
                Paragraph::new(format!("  {}", line.account)).style(theme::table_row()),
                account,
            );
            line.debit.render(frame, debit, 7, self.focus == i * 2);
            line.credit.render(frame, credit, 8, self.focus == i * 2 + 1);
        }

        frame.render_widget(Paragraph::new(totals_line(&self.totals())), totals_area);

        let hint = match &self.failure {
            Some(failure) => Line::from(Span::styled(
                format!("  {}", failure.message),
                theme::unbalanced(),
            )),
            None => Line::from(vec![
                Span::styled("Tab ", theme::key_hint_key()),
                Span::styled("next  ", theme::key_hint()),
                Span::styled("Ctrl+S ", theme::key_hint_key()),
                Span::styled("save  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ]),
        };
        frame.render_widget(Paragraph::new(hint), hints_area);
    }
}

pub struct JournalPane {
    list: ListPane,
    editor: Option<LineEditor>,
}

impl JournalPane {
    pub fn new() -> Self {
        Self {
            list: ListPane::new(Resource::JournalEntries).with_body(|e| edit_body(e.as_value())),
            editor: None,
        }
    }

    fn open_editor(&mut self) -> Option<Action> {
        self.editor = self.list.detail_entity().and_then(LineEditor::open);
        None
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let entity = self.list.detail_entity();
        let block = self.list.detail_block(entity);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [header, lines, totals, files, hints] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Length(1),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .areas(inner);

        if let Some(entity) = entity {
            frame.render_widget(Paragraph::new(header_lines(entity)), header);
        }
        if let Some(panel) = self.list.attachments() {
            panel.render(frame, files, entity);
        }
        if let Some(editor) = &self.editor {
            editor.render(frame, lines, totals, hints);
            return;
        }
        if let Some(entity) = entity {
            render_lines(frame, lines, entity);
            let totals_value = JournalTotals::from_lines(&lines_of(entity.as_value()));
            frame.render_widget(Paragraph::new(totals_line(&totals_value)), totals);
        }

        let [generic, transitions] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(30)]).areas(hints);
        ListPane::render_detail_hints(frame, generic, true);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("l ", theme::key_hint_key()),
                Span::styled("lines  ", theme::key_hint()),
                Span::styled("A ", theme::key_hint_key()),
                Span::styled("accept  ", theme::key_hint()),
                Span::styled("P ", theme::key_hint_key()),
                Span::styled("post", theme::key_hint()),
            ])),
            transitions,
        );
    }
}

fn header_lines(entity: &Entity) -> Vec<Line<'static>> {
    let field = |label: &'static str, key: &str| {
        [
            Span::styled(format!("  {label} "), Style::default().fg(theme::DIM_WHITE)),
            Span::styled(
                entity.text(key).unwrap_or_else(|| "─".into()),
                Style::default().fg(theme::NEON_CYAN),
            ),
        ]
    };
    vec![
        Line::from(
            [field("Number", "number"), field("  Date", "date"), field("  Status", "status")]
                .concat(),
        ),
        Line::from(field("Description", "description").to_vec()),
    ]
}

/// Raw line records, for the nested account and cost-center names.
fn raw_lines(entry: &Value) -> Vec<Entity> {
    ["lines", "details", "items"]
        .iter()
        .find_map(|k| entry.get(k).and_then(Value::as_array))
        .map(|items| items.iter().cloned().map(Entity::new).collect())
        .unwrap_or_default()
}

fn render_lines(frame: &mut Frame, area: Rect, entity: &Entity) {
    let parsed = lines_of(entity.as_value());
    let raw = raw_lines(entity.as_value());
    let rows: Vec<Row> = parsed
        .iter()
        .zip(raw.iter())
        .map(|(line, raw)| {
            let name = |nested: &str, id: Option<&EntityId>| {
                raw.text(nested)
                    .or_else(|| id.map(ToString::to_string))
                    .unwrap_or_else(|| "─".into())
            };
            Row::new([
                Cell::from(name("account.name", line.account_id.as_ref())),
                Cell::from(name("cost_center.name", line.cost_center_id.as_ref())),
                Cell::from(line.description.clone().unwrap_or_default()),
                Cell::from(Line::from(format_amount(line.debit)).right_aligned()),
                Cell::from(Line::from(format_amount(line.credit)).right_aligned()),
            ])
            .style(theme::table_row())
        })
        .collect();

    let header = Row::new(["Account", "Cost center", "Description", "Debit", "Credit"])
        .style(theme::table_header());
    let table = Table::new(
        rows,
        [
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Fill(2),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(theme::border_default()),
    );
    frame.render_widget(table, area);
}

/// `Debit 500.00  Credit 480.50  Difference 19.50`, the difference in
/// the balanced or the error colour.
pub fn totals_line(totals: &JournalTotals) -> Line<'static> {
    let difference_style = match totals.balance() {
        Balance::Balanced => theme::balanced(),
        Balance::Unbalanced { .. } => theme::unbalanced(),
    };
    Line::from(vec![
        Span::styled("  Debit ", Style::default().fg(theme::DIM_WHITE)),
        Span::styled(format_amount(totals.debit), Style::default().fg(theme::CORAL)),
        Span::styled("   Credit ", Style::default().fg(theme::DIM_WHITE)),
        Span::styled(format_amount(totals.credit), Style::default().fg(theme::CORAL)),
        Span::styled("   Difference ", Style::default().fg(theme::DIM_WHITE)),
        Span::styled(totals.difference_text(), difference_style),
    ])
}

impl Component for JournalPane {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.list.init(action_tx)
    }

    fn set_focused(&mut self, focused: bool) {
        self.list.set_focused(focused);
    }

    fn captures_input(&self) -> bool {
        self.editor.is_some() || self.list.captures_input()
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if let Some(editor) = self.editor.as_mut() {
            return Ok(match editor.handle_key(key) {
                EditorEvent::Pending => None,
                EditorEvent::Cancelled => {
                    self.editor = None;
                    None
                }
                EditorEvent::Submit(command) => Some(Action::Execute {
                    origin: Origin::Form(Resource::JournalEntries),
                    command,
                }),
            });
        }
        if self.list.is_detail_open() && !self.list.has_overlay() && !self.list.captures_input() {
            match key.code {
                KeyCode::Char('P') => return Ok(self.list.perform(DomainAction::Post)),
                KeyCode::Char('A') => return Ok(self.list.perform(DomainAction::Accept)),
                KeyCode::Char('l') => return Ok(self.open_editor()),
                _ => {}
            }
        }
        self.list.handle_key_event(key)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        self.list.handle_mouse_event(mouse)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Executed {
                origin: Origin::Form(Resource::JournalEntries),
                result,
            } => match result {
                Ok(_) => self.editor = None,
                Err(failure) => {
                    if let Some(editor) = self.editor.as_mut() {
                        editor.fail(failure.clone());
                    }
                }
            },
            Action::SignedOut => self.editor = None,
            _ => {}
        }
        let follow_up = self.list.update(action)?;
        if !self.list.is_detail_open() {
            self.editor = None;
        }
        Ok(follow_up)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if self.list.is_detail_open() {
            self.render_detail(frame, area);
            self.list.render_overlays(frame, area);
        } else {
            self.list.render(frame, area);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;

    use backoffice_core::{Command, ResourceSlot};

    use super::*;
    use crate::action::ConfirmAction;

    fn totals(lines: Value) -> JournalTotals {
        JournalTotals::from_lines(&lines_of(&json!({ "lines": lines })))
    }

    fn entry() -> Entity {
        Entity::new(json!({
            "id": 7, "number": "JE-0007", "date": "2024-05-01", "status": "draft",
            "lines": [
                {"account_id": 11, "account": {"name": "Cash"}, "debit": "500", "credit": 0},
                {"account_id": 12, "debit": 0, "credit": "480.5"}
            ],
            "attachments": [{"id": 40, "file_name": "receipt.pdf"}]
        }))
    }

    #[test]
    fn difference_uses_the_balanced_colour_only_at_zero() {
        let even = totals_line(&totals(json!([{"debit": "10"}, {"credit": "10.00"}])));
        assert_eq!(even.spans[5].content, "0.00");
        assert_eq!(even.spans[5].style, theme::balanced());

        let off = totals_line(&totals(json!([{"debit": "500"}, {"credit": "480.5"}])));
        assert_eq!(off.spans[5].content, "19.50");
        assert_eq!(off.spans[5].style, theme::unbalanced());
    }

    fn opened() -> JournalPane {
        let mut pane = JournalPane::new();
        let slot = Arc::new(ResourceSlot {
            items: vec![entry()],
            details: Some(entry()),
            ..ResourceSlot::default()
        });
        pane.update(&Action::SlotUpdated(Resource::JournalEntries, slot))
            .unwrap();
        pane.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();
        pane
    }

    #[test]
    fn post_is_confirmed_from_the_detail_view() {
        let mut pane = opened();
        let action = pane
            .handle_key_event(KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT))
            .unwrap();
        match action {
            Some(Action::ShowConfirm {
                confirm: confirm @ ConfirmAction::Perform { .. },
                ..
            }) => assert_eq!(confirm.to_string(), "Post JE-0007?"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unbalanced_entry_can_still_be_saved() {
        let mut pane = opened();
        pane.update(&Action::UploadStaged(Ok(backoffice_core::AttachmentUpload::new(
            "scan.png",
            vec![0_u8; 4],
        ))))
        .unwrap();
        let action = pane
            .handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE))
            .unwrap();
        match action {
            Some(Action::Execute {
                command: Command::UpdateWithAttachments { body, files, .. },
                ..
            }) => {
                assert_eq!(files.len(), 1);
                assert_eq!(body["lines"].as_array().map(Vec::len), Some(2));
                assert_eq!(body["number"], "JE-0007");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn press(pane: &mut JournalPane, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        pane.handle_key_event(KeyEvent::new(code, modifiers)).unwrap()
    }

    fn type_text(pane: &mut JournalPane, text: &str) {
        for c in text.chars() {
            press(pane, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn line_editor_recomputes_totals_as_amounts_change() {
        let mut pane = opened();
        assert!(press(&mut pane, KeyCode::Char('l'), KeyModifiers::NONE).is_none());
        assert!(pane.captures_input());

        // Second line's credit: 480.50 -> 500.
        press(&mut pane, KeyCode::Down, KeyModifiers::NONE);
        press(&mut pane, KeyCode::Tab, KeyModifiers::NONE);
        press(&mut pane, KeyCode::Char('u'), KeyModifiers::CONTROL);
        type_text(&mut pane, "500");

        let totals = pane.editor.as_ref().unwrap().totals();
        let line = totals_line(&totals);
        assert_eq!(line.spans[1].content, "500.00");
        assert_eq!(line.spans[3].content, "500.00");
        assert_eq!(line.spans[5].content, "0.00");
        assert_eq!(line.spans[5].style, theme::balanced());

        let mut terminal = Terminal::new(TestBackend::new(110, 30)).unwrap();
        terminal
            .draw(|frame| pane.render(frame, frame.area()))
            .unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Difference 0.00"));
        assert!(screen.contains("Edit lines"));

        match press(&mut pane, KeyCode::Char('s'), KeyModifiers::CONTROL) {
            Some(Action::Execute {
                origin: Origin::Form(Resource::JournalEntries),
                command: Command::Update { id, body, .. },
            }) => {
                assert_eq!(id, EntityId::from(7_u64));
                assert_eq!(body["lines"][0]["account_id"], 11);
                assert_eq!(body["lines"][0]["debit"], "500.00");
                assert_eq!(body["lines"][1]["credit"], "500.00");
                assert_eq!(body["number"], "JE-0007");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn line_editor_stays_open_on_rejection_and_closes_on_success() {
        let mut pane = opened();
        press(&mut pane, KeyCode::Char('l'), KeyModifiers::NONE);
        pane.update(&Action::Executed {
            origin: Origin::Form(Resource::JournalEntries),
            result: Err(Failure {
                message: "Entry is not balanced".into(),
                fields: vec![],
            }),
        })
        .unwrap();
        assert!(pane.editor.as_ref().unwrap().failure.is_some());

        pane.update(&Action::Executed {
            origin: Origin::Form(Resource::JournalEntries),
            result: Ok(backoffice_core::CommandResult::Ok),
        })
        .unwrap();
        assert!(pane.editor.is_none());
        assert!(!pane.captures_input());
    }

    #[test]
    fn escape_discards_line_edits() {
        let mut pane = opened();
        press(&mut pane, KeyCode::Char('l'), KeyModifiers::NONE);
        type_text(&mut pane, "9");
        press(&mut pane, KeyCode::Esc, KeyModifiers::NONE);
        assert!(pane.editor.is_none());
        assert!(pane.list.is_detail_open());
    }

    #[test]
    fn detail_renders_lines_and_totals() {
        let pane = opened();
        let mut terminal = Terminal::new(TestBackend::new(110, 30)).unwrap();
        terminal
            .draw(|frame| pane.render(frame, frame.area()))
            .unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Cash"));
        assert!(screen.contains("Difference 19.50"));
        assert!(screen.contains("receipt.pdf"));
    }
}
