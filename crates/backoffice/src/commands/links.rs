//! Account links: default ledger accounts per role.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use backoffice_core::{
    AccountLinkForm, BackOffice, Command as CoreCommand, CommandResult, Entity, EntityId,
    Language,
};

use crate::cli::{GlobalOpts, LinksArgs, LinksCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Clone, Serialize, Tabled)]
struct LinkRow {
    #[tabled(rename = "Role")]
    key: String,
    #[tabled(rename = "Description")]
    label: String,
    #[tabled(rename = "Account")]
    account: String,
}

fn link_rows(values: &[Value], language: Language) -> Vec<LinkRow> {
    let form = AccountLinkForm::from_values(values);
    form.roles()
        .iter()
        .map(|role| {
            let nested = values
                .iter()
                .find(|v| {
                    ["key", "role"]
                        .iter()
                        .any(|k| v.get(k).and_then(Value::as_str) == Some(role.key.as_str()))
                })
                .and_then(|v| v.get("account"))
                .filter(|a| a.is_object());
            let account = match (nested, &role.original) {
                (Some(account), Some(id)) => {
                    format!("{} (#{id})", Entity::new(account.clone()).display_name(language))
                }
                (None, Some(id)) => format!("#{id}"),
                _ => String::new(),
            };
            LinkRow {
                key: role.key.clone(),
                label: role.label.clone(),
                account,
            }
        })
        .collect()
}

/// `ROLE=ACCOUNT_ID`, or `ROLE=none` to unlink.
fn parse_assignment(raw: &str) -> Result<(String, Option<EntityId>), CliError> {
    let invalid = || CliError::Validation {
        field: "assignment".into(),
        reason: format!("expected ROLE=ACCOUNT_ID or ROLE=none, got '{raw}'"),
    };
    let (key, account) = raw.split_once('=').ok_or_else(invalid)?;
    let (key, account) = (key.trim(), account.trim());
    if key.is_empty() || account.is_empty() {
        return Err(invalid());
    }
    let account = if account.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(EntityId::from(account))
    };
    Ok((key.to_owned(), account))
}

async fn fetch_links(office: &BackOffice) -> Result<Vec<Value>, CliError> {
    match office.execute(CoreCommand::FetchAccountLinks).await? {
        CommandResult::AccountLinks(values) => Ok(values),
        _ => Ok(Vec::new()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(office: &BackOffice, args: LinksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        LinksCommand::List => {
            let values = fetch_links(office).await?;
            let rows = link_rows(&values, office.language());
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => output::render_list(
                    global.output,
                    &rows,
                    Clone::clone,
                    |r| format!("{}={}", r.key, r.account),
                )?,
                // Structured output keeps the server payload as-is.
                structured => {
                    output::render_single(structured, &values, |_| String::new(), |_| String::new())?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LinksCommand::Set { assignments } => {
            let assignments = assignments
                .iter()
                .map(|raw| parse_assignment(raw))
                .collect::<Result<Vec<_>, _>>()?;

            let mut form = AccountLinkForm::from_values(&fetch_links(office).await?);
            for (key, account) in assignments {
                form.select(&key, account)?;
            }

            let changes = form.changes();
            if changes.is_empty() {
                output::notice("No changes to save", global.quiet);
                return Ok(());
            }
            for change in &changes {
                let target = change
                    .account_id
                    .as_ref()
                    .map_or_else(|| "none".to_owned(), |id| format!("#{id}"));
                tracing::info!(role = %change.key, %target, "link changed");
            }
            let count = changes.len();
            let result = office
                .execute(CoreCommand::SaveAccountLinks { changes })
                .await?;
            output::notice(
                &format!("{} ({count} role(s))", util::result_message(&result, "Account links saved")),
                global.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn assignments_parse_ids_and_unlink() {
        assert_eq!(
            parse_assignment("sales = 401").unwrap(),
            ("sales".to_owned(), Some(EntityId::Number(401)))
        );
        assert_eq!(parse_assignment("cash=NONE").unwrap(), ("cash".to_owned(), None));
        assert!(parse_assignment("cash").is_err());
        assert!(parse_assignment("=4").is_err());
    }

    #[test]
    fn rows_show_linked_account_names() {
        let values = vec![
            json!({"key": "sales", "label": "Sales", "account_id": 401, "account": {"id": 401, "name": "Revenue"}}),
            json!({"key": "cash", "label": "Cash on hand", "account_id": null}),
        ];
        let rows = link_rows(&values, Language::En);
        assert_eq!(rows[0].account, "Revenue (#401)");
        assert_eq!(rows[1].account, "");
    }
}
