//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Tables go through
//! `tabled`, structured formats serialize the raw API data via serde, plain
//! emits one key per line.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use cmms_core::crud::TableView;

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a screen's table.
///
/// `data` is what structured formats serialize (normally the raw items).
pub fn render_view<T>(format: OutputFormat, view: &TableView, data: &T) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(render_rows(
            &view.headers,
            view.rows.iter().map(|r| r.cells.clone()),
        )),
        OutputFormat::Plain => Ok(view
            .rows
            .iter()
            .filter_map(|r| r.key.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("\n")),
        other => render_structured(other, data),
    }
}

/// Render a single item.
///
/// Tables show one `field | value` line per entry, plain prints `id_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_rows: impl Fn(&T) -> Vec<(String, String)>,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => {
            let rows = detail_rows(data).into_iter().map(|(k, v)| vec![k, v]);
            Ok(render_rows(&["Field".to_owned(), "Value".to_owned()], rows))
        }
        OutputFormat::Plain => Ok(id_fn(data)),
        other => render_structured(other, data),
    }
}

/// Serialize for the json, json-compact and yaml formats; tables and plain
/// fall back to pretty JSON.
pub fn render_structured<T>(format: OutputFormat, data: &T) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    match format {
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Json | OutputFormat::Table | OutputFormat::Plain => {
            Ok(serde_json::to_string_pretty(data)?)
        }
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Table rendering ──────────────────────────────────────────────────

pub fn render_rows<I>(headers: &[String], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows {
        builder.push_record(row);
    }
    builder.build().with(Style::rounded()).to_string()
}
