//! `backoffice resources`: the resource catalog.

use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;

use backoffice_core::Resource;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Clone, Serialize, Tabled)]
struct CatalogRow {
    #[tabled(rename = "Resource")]
    name: String,
    #[tabled(rename = "Title")]
    label: &'static str,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Toggle")]
    toggle: &'static str,
    #[tabled(rename = "Actions")]
    actions: String,
    #[tabled(rename = "Extras")]
    extras: String,
}

impl From<Resource> for CatalogRow {
    fn from(r: Resource) -> Self {
        let extras: Vec<&str> = [
            (r.is_tree(), "tree"),
            (r.accepts_attachments(), "attachments"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        Self {
            name: r.to_string(),
            label: r.label(),
            group: r.group().to_string(),
            toggle: if r.supports_toggle() { "yes" } else { "" },
            actions: r
                .actions()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            extras: extras.join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<CatalogRow> = Resource::iter().map(CatalogRow::from).collect();
    let out = output::render_list(global.output, &rows, Clone::clone, |r| r.name.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
