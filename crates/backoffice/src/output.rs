//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Typed rows use the
//! `Tabled` derive; server records are schema-less, so their tables are
//! built column by column from the resource catalog.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use backoffice_core::{Entity, Language, PageSlot, Pagination, Resource};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Semantic text styles, or plain text when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            color: should_color(mode),
        }
    }

    pub fn ok(self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn error(self, text: &str) -> String {
        if self.color {
            text.red().bold().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn dim(self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn accent(self, text: &str) -> String {
        if self.color {
            text.cyan().bold().to_string()
        } else {
            text.to_owned()
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are laid
/// out by hand.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Plain => Ok(id_fn(data)),
        structured => render_structured(structured, data),
    }
}

/// One page of server records, with the resource's catalog columns.
pub fn render_entities(
    format: OutputFormat,
    resource: Resource,
    items: &[Entity],
    language: Language,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let columns = resource.columns();
            let mut builder = Builder::default();
            builder.push_record(std::iter::once("ID").chain(columns.iter().map(|c| c.title)));
            for entity in items {
                let id = entity.id().map(|id| id.to_string()).unwrap_or_default();
                let cells = columns.iter().map(|c| cell_text(entity, c.key, language));
                builder.push_record(std::iter::once(id).chain(cells));
            }
            Ok(builder.build().with(Style::rounded()).to_string())
        }
        OutputFormat::Plain => Ok(items
            .iter()
            .filter_map(|e| e.id().map(|id| id.to_string()))
            .collect::<Vec<_>>()
            .join("\n")),
        structured => render_structured(structured, items),
    }
}

/// Key/value table of one record's top-level fields.
pub fn entity_detail(entity: &Entity, language: Language) -> String {
    let Some(fields) = entity.as_value().as_object() else {
        return entity.as_value().to_string();
    };
    let mut builder = Builder::default();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let text = match value {
            Value::Array(_) | Value::Object(_) => cell_text(entity, key, language),
            _ => entity.text(key).unwrap_or_default(),
        };
        builder.push_record([key.clone(), text]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn cell_text(entity: &Entity, key: &str, language: Language) -> String {
    if key == "name" {
        return entity.display_name(language);
    }
    match entity.field(key) {
        Some(nested @ Value::Object(_)) => Entity::new(nested.clone()).display_name(language),
        Some(_) => entity.text(key).unwrap_or_default(),
        None => String::new(),
    }
}

// ── Pagination footer ────────────────────────────────────────────────

/// `Page 7 of 20 · 295 records   ‹ 1 … 5 6 [7] 8 9 … 20 ›`
///
/// The arrows are dimmed at the first and last page.
pub fn page_footer(pagination: &Pagination, palette: Palette) -> String {
    let arrow = |enabled: bool, glyph: &str| {
        if enabled {
            palette.accent(glyph)
        } else {
            palette.dim(glyph)
        }
    };
    let pages = pagination
        .window()
        .into_iter()
        .map(|slot| match slot {
            PageSlot::Page(n) if n == pagination.current_page => palette.accent(&format!("[{n}]")),
            PageSlot::Page(n) => n.to_string(),
            PageSlot::Gap => palette.dim("…"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Page {} of {} · {} records   {} {pages} {}",
        pagination.current_page,
        pagination.last_page,
        pagination.total,
        arrow(pagination.has_prev(), "‹"),
        arrow(pagination.has_next(), "›"),
    )
}

// ── Printing ─────────────────────────────────────────────────────────

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr so stdout stays machine-readable.
pub fn notice(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_structured<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        _ => serde_json::to_string_pretty(data)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vendors() -> Vec<Entity> {
        vec![
            Entity::new(json!({"id": 1, "name": "Acme", "name_ar": "أكمي", "phone": "555"})),
            Entity::new(json!({"id": 2, "name": "Globex"})),
        ]
    }

    #[test]
    fn plain_output_is_one_id_per_line() {
        let out =
            render_entities(OutputFormat::Plain, Resource::Vendors, &vendors(), Language::En)
                .unwrap();
        assert_eq!(out, "1\n2");
    }

    #[test]
    fn table_uses_catalog_columns_and_language() {
        let out =
            render_entities(OutputFormat::Table, Resource::Vendors, &vendors(), Language::Ar)
                .unwrap();
        assert!(out.contains("ID"));
        assert!(out.contains("أكمي"));
        assert!(out.contains("Globex"));
    }

    #[test]
    fn compact_json_keeps_records_intact() {
        let out = render_entities(
            OutputFormat::JsonCompact,
            Resource::Vendors,
            &vendors()[1..],
            Language::En,
        )
        .unwrap();
        assert_eq!(out, r#"[{"id":2,"name":"Globex"}]"#);
    }

    #[test]
    fn footer_shows_window_with_gaps() {
        let pagination = Pagination {
            current_page: 7,
            last_page: 20,
            per_page: 15,
            total: 295,
        };
        let palette = Palette::new(ColorMode::Never);
        assert_eq!(
            page_footer(&pagination, palette),
            "Page 7 of 20 · 295 records   ‹ 1 … 5 6 [7] 8 9 … 20 ›"
        );
    }
}
