//! Exchange-rate lookups.

use chrono::NaiveDate;

use backoffice_core::{BackOffice, Command as CoreCommand, CommandResult, Entity, EntityId};

use crate::cli::{GlobalOpts, RatesArgs, RatesCommand};
use crate::error::CliError;
use crate::output;

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| CliError::Validation {
        field: "date".into(),
        reason: format!("expected YYYY-MM-DD, got '{raw}': {e}"),
    })
}

pub async fn handle(office: &BackOffice, args: RatesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        RatesCommand::Effective { currency_id, date } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let result = office
                .execute(CoreCommand::EffectiveRate {
                    currency_id: EntityId::from(currency_id),
                    date,
                })
                .await?;
            let CommandResult::Rate(rate) = result else {
                return Ok(());
            };
            let rate = Entity::new(rate);
            let language = office.language();
            let out = output::render_single(
                global.output,
                &rate,
                |r| output::entity_detail(r, language),
                |r| r.text("rate").unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
