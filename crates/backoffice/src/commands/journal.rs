//! Journal entry handlers: lines and totals, attachments, post/accept.

use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tabled::builder::Builder;
use tabled::settings::Style;

use backoffice_core::{
    Attachment, AttachmentDraft, BackOffice, Balance, Command as CoreCommand, CommandResult,
    DomainAction, Entity, EntityId, JournalLine, JournalTotals, Language, PreviewRegistry,
    Resource, attachments_of, edit_body, format_amount, lines_of,
};

use crate::cli::{GlobalOpts, JournalArgs, JournalCommand, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::{records, util};

const RESOURCE: Resource = Resource::JournalEntries;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntryView<'a> {
    entry: &'a Entity,
    lines: Vec<JournalLine>,
    totals: JournalTotals,
    balanced: bool,
    difference: String,
    attachments: Vec<Attachment>,
}

impl<'a> EntryView<'a> {
    fn new(entry: &'a Entity) -> Self {
        let lines = lines_of(entry.as_value());
        let totals = JournalTotals::from_lines(&lines);
        Self {
            entry,
            balanced: totals.is_balanced(),
            difference: totals.difference_text(),
            attachments: attachments_of(entry.as_value()),
            lines,
            totals,
        }
    }
}

#[derive(Tabled)]
struct AttachmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "File")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&Attachment> for AttachmentRow {
    fn from(a: &Attachment) -> Self {
        Self {
            id: a.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            name: a.name.clone(),
            size: a.size.map(|s| format!("{s} B")).unwrap_or_default(),
        }
    }
}

/// Raw line records, for labels the typed line does not keep.
fn raw_lines(entry: &Entity) -> Vec<Entity> {
    ["lines", "details", "items"]
        .iter()
        .find_map(|k| entry.field(k).and_then(Value::as_array))
        .map(|items| items.iter().cloned().map(Entity::new).collect())
        .unwrap_or_default()
}

fn ref_label(line: &Entity, object: &str, id: Option<&EntityId>, language: Language) -> String {
    match line.field(object) {
        Some(nested @ Value::Object(_)) => Entity::new(nested.clone()).display_name(language),
        _ => id.map(|id| format!("#{id}")).unwrap_or_default(),
    }
}

/// Header fields, lines with totals, the difference and attachments.
fn render_entry(view: &EntryView<'_>, language: Language, palette: Palette) -> String {
    let mut out = String::new();
    let entry = view.entry;

    let number = entry
        .text("entry_number")
        .or_else(|| entry.text("number"))
        .or_else(|| entry.id().map(|id| format!("#{id}")))
        .unwrap_or_default();
    let _ = writeln!(out, "{}", palette.accent(&format!("Journal entry {number}")));
    for (key, title) in [("date", "Date"), ("status", "Status"), ("description", "Description")] {
        if let Some(text) = entry.text(key) {
            let _ = writeln!(out, "{title}: {text}");
        }
    }
    let _ = writeln!(out);

    let mut table = Builder::default();
    table.push_record(["Account", "Cost center", "Description", "Debit", "Credit"]);
    for (line, raw) in view.lines.iter().zip(raw_lines(entry)) {
        table.push_record([
            ref_label(&raw, "account", line.account_id.as_ref(), language),
            ref_label(&raw, "cost_center", line.cost_center_id.as_ref(), language),
            line.description.clone().unwrap_or_default(),
            format_amount(line.debit),
            format_amount(line.credit),
        ]);
    }
    table.push_record([
        "Total".to_owned(),
        String::new(),
        String::new(),
        format_amount(view.totals.debit),
        format_amount(view.totals.credit),
    ]);
    let _ = writeln!(out, "{}", table.build().with(Style::rounded()));

    // The difference is informational; submission is never blocked on it.
    let difference = match view.totals.balance() {
        Balance::Balanced => palette.ok(&format!("Difference: {} (balanced)", view.difference)),
        Balance::Unbalanced { .. } => palette.error(&format!("Difference: {}", view.difference)),
    };
    let _ = writeln!(out, "{difference}");

    if !view.attachments.is_empty() {
        let rows: Vec<AttachmentRow> = view.attachments.iter().map(AttachmentRow::from).collect();
        let _ = writeln!(out, "\nAttachments");
        let _ = writeln!(out, "{}", tabled::Table::new(rows).with(Style::rounded()));
    }
    out.trim_end().to_owned()
}

async fn fetch_entry(office: &BackOffice, id: &EntityId) -> Result<Entity, CliError> {
    match office
        .execute(CoreCommand::FetchDetails {
            resource: RESOURCE,
            id: id.clone(),
        })
        .await?
    {
        CommandResult::Entity(entity) => Ok(entity),
        _ => Err(CliError::NotFound {
            resource_type: "journal entry".into(),
            identifier: id.to_string(),
            list_command: "list journal-entries".into(),
        }),
    }
}

fn print_entry(entry: &Entity, office: &BackOffice, global: &GlobalOpts) -> Result<(), CliError> {
    let view = EntryView::new(entry);
    let language = office.language();
    let palette = Palette::new(global.color);
    let out = output::render_single(
        global.output,
        &view,
        |v| render_entry(v, language, palette),
        |v| v.entry.id().map(|id| id.to_string()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    office: &BackOffice,
    args: JournalArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        JournalCommand::Show { id } => {
            let entry = fetch_entry(office, &EntityId::from(id)).await?;
            print_entry(&entry, office, global)
        }

        JournalCommand::Attach { id, files } => {
            let id = EntityId::from(id);
            let entry = fetch_entry(office, &id).await?;

            let registry = PreviewRegistry::new();
            let mut draft = AttachmentDraft::new(registry.clone());
            for upload in util::read_uploads(&files).await? {
                draft.add(upload);
            }
            if global.verbose > 0 {
                for pending in draft.iter() {
                    output::notice(&format!("staged {}", pending.preview_label()), global.quiet);
                }
            }

            let result = office
                .execute(CoreCommand::UpdateWithAttachments {
                    resource: RESOURCE,
                    id: id.clone(),
                    body: edit_body(entry.as_value()),
                    files: draft.into_uploads(),
                })
                .await?;
            tracing::debug!(live = registry.live(), "previews after submit");
            output::notice(&util::result_message(&result, "Attachments uploaded"), global.quiet);

            if let CommandResult::Mutation {
                entity: Some(updated),
                ..
            } = &result
            {
                print_entry(updated, office, global)?;
            }
            Ok(())
        }

        JournalCommand::Detach { id, attachment_id } => {
            let id = EntityId::from(id);
            let attachment_id = EntityId::from(attachment_id);
            if !util::confirm(
                &format!("Delete attachment {attachment_id} of journal entry #{id}?"),
                global.yes,
            )? {
                return Ok(());
            }
            let result = office
                .execute(CoreCommand::DeleteAttachment {
                    resource: RESOURCE,
                    id,
                    attachment_id,
                })
                .await?;
            output::notice(&util::result_message(&result, "Attachment deleted"), global.quiet);

            // The record is reloaded after the delete; show what remains.
            if let Some(entry) = office.slot(RESOURCE).details.clone() {
                if global.output == OutputFormat::Table {
                    let left = attachments_of(entry.as_value()).len();
                    output::notice(&format!("{left} attachment(s) remain"), global.quiet);
                } else {
                    print_entry(&entry, office, global)?;
                }
            }
            Ok(())
        }

        JournalCommand::Post { id } => transition(office, id, DomainAction::Post, global).await,
        JournalCommand::Accept { id } => transition(office, id, DomainAction::Accept, global).await,
    }
}

async fn transition(
    office: &BackOffice,
    id: String,
    action: DomainAction,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = office
        .perform(RESOURCE, EntityId::from(id), action)
        .await?;
    output::notice(&util::result_message(&result, action.done_label()), global.quiet);
    if let CommandResult::Mutation {
        entity: Some(entity),
        ..
    } = &result
    {
        if global.output != OutputFormat::Table {
            records::print_entity(office, entity, global)?;
        }
    }
    Ok(())
}
