//! Generic record handlers shared by every resource module.

use backoffice_core::{
    BackOffice, Command as CoreCommand, CommandResult, DomainAction, Entity, EntityId, ListQuery,
    Resource,
};

use crate::cli::{
    ActionArgs, CreateArgs, DeleteArgs, GlobalOpts, ListArgs, OutputFormat, RecordArgs,
    UpdateArgs,
};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_filter(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(CliError::Validation {
            field: "filter".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

fn parse_action(resource: Resource, raw: &str) -> Result<DomainAction, CliError> {
    let allowed = || {
        let names: Vec<String> = resource.actions().iter().map(ToString::to_string).collect();
        if names.is_empty() {
            format!("{resource} has no actions")
        } else {
            format!("{resource} supports: {}", names.join(", "))
        }
    };
    match raw.parse::<DomainAction>() {
        Ok(action) if resource.supports_action(action) => Ok(action),
        _ => Err(CliError::Validation {
            field: "action".into(),
            reason: format!("'{raw}' is not available; {}", allowed()),
        }),
    }
}

/// Print the record a write echoed back, or just its id.
fn print_mutation(
    office: &BackOffice,
    result: &CommandResult,
    fallback: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    output::notice(&util::result_message(result, fallback), global.quiet);
    if let CommandResult::Mutation {
        entity: Some(entity),
        ..
    } = result
    {
        print_entity(office, entity, global)?;
    }
    Ok(())
}

pub(super) fn print_entity(
    office: &BackOffice,
    entity: &Entity,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let language = office.language();
    let out = output::render_single(
        global.output,
        entity,
        |e| output::entity_detail(e, language),
        |e| e.id().map(|id| id.to_string()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Render the resource's current list slot with its page footer.
fn print_slot(office: &BackOffice, resource: Resource, global: &GlobalOpts) -> Result<(), CliError> {
    let slot = office.slot(resource);
    let out = output::render_entities(global.output, resource, &slot.items, office.language())?;
    output::print_output(&out, global.quiet);
    if global.output == OutputFormat::Table {
        if let Some(pagination) = &slot.pagination {
            let footer = output::page_footer(pagination, Palette::new(global.color));
            output::print_output(&footer, global.quiet);
        }
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(office: &BackOffice, args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let mut query = ListQuery::page(args.page.max(1));
    query.per_page = args.per_page;
    query.search = args.search.filter(|s| !s.trim().is_empty());
    for raw in &args.filter {
        let (key, value) = parse_filter(raw)?;
        query = query.filter(key, value);
    }

    office.fetch_page(resource, query).await?;
    print_slot(office, resource, global)
}

pub async fn get(office: &BackOffice, args: RecordArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let result = office
        .execute(CoreCommand::FetchDetails {
            resource,
            id: EntityId::from(args.id),
        })
        .await?;
    if let CommandResult::Entity(entity) = result {
        print_entity(office, &entity, global)?;
    }
    Ok(())
}

pub async fn create(
    office: &BackOffice,
    args: CreateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let body = util::read_json_file(&args.from_file)?;
    let cmd = if args.attach.is_empty() {
        CoreCommand::Create { resource, body }
    } else {
        CoreCommand::CreateWithAttachments {
            resource,
            body,
            files: util::read_uploads(&args.attach).await?,
        }
    };
    let result = office.execute(cmd).await?;
    print_mutation(office, &result, "Created", global)
}

pub async fn update(
    office: &BackOffice,
    args: UpdateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let id = EntityId::from(args.id);
    let body = util::read_json_file(&args.from_file)?;
    let cmd = if args.attach.is_empty() {
        CoreCommand::Update { resource, id, body }
    } else {
        CoreCommand::UpdateWithAttachments {
            resource,
            id,
            body,
            files: util::read_uploads(&args.attach).await?,
        }
    };
    let result = office.execute(cmd).await?;
    print_mutation(office, &result, "Updated", global)
}

pub async fn delete(
    office: &BackOffice,
    args: DeleteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let id = EntityId::from(args.id);
    if !util::confirm(&format!("Delete {} #{id}?", resource.label()), global.yes)? {
        return Ok(());
    }

    // Loading the page first lets the delete clamp to the last non-empty page.
    if let Some(page) = args.page {
        office.fetch_page(resource, ListQuery::page(page.max(1))).await?;
    }

    let result = office.execute(CoreCommand::Delete { resource, id }).await?;
    if let CommandResult::Deleted { next_page, message } = &result {
        output::notice(&format!("{message} (showing page {next_page})"), global.quiet);
        if args.page.is_some() {
            print_slot(office, resource, global)?;
        }
    }
    Ok(())
}

pub async fn toggle(
    office: &BackOffice,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let result = office
        .execute(CoreCommand::ToggleStatus {
            resource,
            id: EntityId::from(args.id),
        })
        .await?;
    print_mutation(office, &result, "Status updated", global)
}

pub async fn action(
    office: &BackOffice,
    args: ActionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = util::parse_resource(&args.resource)?;
    let action = parse_action(resource, &args.action)?;
    let body = args
        .from_file
        .as_deref()
        .map(util::read_json_file)
        .transpose()?;
    let result = office
        .execute(CoreCommand::Perform {
            resource,
            id: EntityId::from(args.id),
            action,
            body,
        })
        .await?;
    print_mutation(office, &result, action.done_label(), global)
}
