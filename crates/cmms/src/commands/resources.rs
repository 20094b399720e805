//! Raw collection reads.

use std::collections::BTreeSet;

use cmms_config::Config;
use cmms_core::crud::display_value;
use cmms_core::{CoreError, Record};

use crate::cli::{GlobalOpts, OutputFormat, ResourcesArgs, ResourcesCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ResourcesArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ResourcesCommand::List { endpoint, query } => {
            let params = util::parse_assignments(&query, "query")?;
            let console = util::connect(cfg, global)?;

            let items: Vec<Record> = console
                .query::<Record>(&endpoint, params)
                .load()
                .await
                .into_result()
                .unwrap_or_else(|| {
                    Err(CoreError::Internal("read was superseded".into()))
                })?;

            let rendered = match global.output {
                OutputFormat::Table => render_records(&items, cfg),
                OutputFormat::Plain => items
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<Result<Vec<_>, _>>()?
                    .join("\n"),
                other => output::render_structured(other, &items)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
    }
}

/// Table over the union of top-level keys, in sorted order.
fn render_records(items: &[Record], cfg: &Config) -> String {
    let tokens = cfg.defaults.tokens();
    let headers: Vec<String> = items
        .iter()
        .flat_map(|item| item.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows = items.iter().map(|item| {
        headers
            .iter()
            .map(|h| display_value(item.get(h), &tokens))
            .collect()
    });
    output::render_rows(&headers, rows)
}
