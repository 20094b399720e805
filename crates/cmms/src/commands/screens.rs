//! Screen command handlers.

use serde_json::{Value, json};

use cmms_config::{Config, ScreenSpec};
use cmms_core::crud::{TableView, paginate, plain_text};
use cmms_core::{Console, CrudScreen, ListView, PrimaryKey, Record, ScreenConfig};

use crate::cli::{GlobalOpts, OutputFormat, ScreensArgs, ScreensCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;
use crate::screens;

pub async fn handle(args: ScreensArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ScreensCommand::List => {
            let specs = screens::catalog(cfg);
            let headers = ["Name", "Title", "Endpoint", "Key", "Fields"].map(String::from);
            let rendered = match global.output {
                OutputFormat::Table => output::render_rows(
                    &headers,
                    specs.iter().map(|s| {
                        vec![
                            s.name.clone(),
                            s.title.clone(),
                            s.endpoint.clone(),
                            s.pk_field.clone(),
                            s.fields.len().to_string(),
                        ]
                    }),
                ),
                OutputFormat::Plain => specs
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => output::render_structured(other, &specs)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ScreensCommand::Show {
            screen,
            page,
            per_page,
        } => {
            let spec = screens::find(cfg, &screen)?;
            let console = util::connect(cfg, global)?;
            let screen = enter(&console, cfg, &spec).await?;
            let table = table_of(&screen)?;
            let items = screen.resource().items();

            if per_page == 0 {
                let rendered = output::render_view(global.output, &table, &items)?;
                output::print_output(&rendered, global.quiet);
                return Ok(());
            }

            let rows = paginate(&table.rows, page, per_page);
            let data = paginate(&items, page, per_page);
            let view = TableView {
                headers: table.headers.clone(),
                rows: rows.items.to_vec(),
            };
            let rendered = output::render_view(global.output, &view, data.items)?;
            output::print_output(&rendered, global.quiet);
            if global.output == OutputFormat::Table && !global.quiet {
                eprintln!(
                    "Page {} of {} ({} items)",
                    rows.page, rows.total_pages, rows.total_items
                );
            }
            Ok(())
        }

        ScreensCommand::Options { screen } => {
            let spec = screens::find(cfg, &screen)?;
            let console = util::connect(cfg, global)?;
            let mut screen = console.screen(screen_config(cfg, &spec)?);
            screen.reload_options().await;

            let selects: Vec<&str> = spec
                .fields
                .iter()
                .filter(|f| f.options_source.is_some())
                .map(|f| f.name.as_str())
                .collect();

            let rendered = match global.output {
                OutputFormat::Table => {
                    let headers = ["Field", "Value", "Label"].map(String::from);
                    let mut rows = Vec::new();
                    for field in &selects {
                        if let Some(error) = screen.option_sets().error(field) {
                            rows.push(vec![
                                (*field).to_owned(),
                                String::new(),
                                format!("(unavailable: {error})"),
                            ]);
                        }
                        for option in screen.options_for(field) {
                            rows.push(vec![
                                (*field).to_owned(),
                                plain_text(&option.value),
                                option.label.clone(),
                            ]);
                        }
                    }
                    output::render_rows(&headers, rows)
                }
                OutputFormat::Plain => selects.join("\n"),
                other => {
                    let data: serde_json::Map<String, Value> = selects
                        .iter()
                        .map(|field| {
                            (
                                (*field).to_owned(),
                                json!({
                                    "options": screen.options_for(field),
                                    "error": screen.option_sets().error(field),
                                }),
                            )
                        })
                        .collect();
                    output::render_structured(other, &data)?
                }
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ScreensCommand::Create { screen, values } => {
            let spec = screens::find(cfg, &screen)?;
            let values = util::form_values(&values)?;
            let console = util::connect(cfg, global)?;
            let mut screen = enter(&console, cfg, &spec).await?;

            screen.open_create()?;
            for (name, value) in values {
                screen.set_value(&name, value)?;
            }
            let item = screen.submit().await?;
            print_item(&spec, &item, global)
        }

        ScreensCommand::Edit { screen, id, values } => {
            let spec = screens::find(cfg, &screen)?;
            let key = parse_key(&id)?;
            let values = util::form_values(&values)?;
            let console = util::connect(cfg, global)?;
            let mut screen = enter(&console, cfg, &spec).await?;

            screen.open_edit(&key)?;
            for (name, value) in values {
                screen.set_value(&name, value)?;
            }
            let item = screen.submit().await?;
            print_item(&spec, &item, global)
        }

        ScreensCommand::Delete { screen, id } => {
            let spec = screens::find(cfg, &screen)?;
            let key = parse_key(&id)?;
            let console = util::connect(cfg, global)?;
            let mut screen = enter(&console, cfg, &spec).await?;

            screen.request_delete(&key)?;
            let prompt = format!("Delete {} '{key}'?", spec.title);
            if !util::confirm(&prompt, "delete", global.yes)? {
                screen.cancel();
                if !global.quiet {
                    eprintln!("Aborted.");
                }
                return Ok(());
            }

            if let Err(err) = screen.confirm_delete().await {
                if let Some(notice) = screen.take_notice() {
                    tracing::warn!(screen = %spec.name, "{notice}");
                }
                return Err(err.into());
            }
            if !global.quiet {
                eprintln!("Deleted {} '{key}'.", spec.title);
            }
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn screen_config(cfg: &Config, spec: &ScreenSpec) -> Result<ScreenConfig<Record>, CliError> {
    Ok(spec.to_screen_config(cfg.defaults.tokens())?)
}

async fn enter(console: &Console, cfg: &Config, spec: &ScreenSpec) -> Result<CrudScreen<Record>, CliError> {
    let mut screen = console.screen(screen_config(cfg, spec)?);
    screen.enter().await?;
    if screen.option_sets().has_errors() {
        tracing::warn!(screen = %spec.name, "some select options could not be loaded");
    }
    Ok(screen)
}

fn table_of(screen: &CrudScreen<Record>) -> Result<TableView, CliError> {
    match screen.view() {
        ListView::Table(table) => Ok(table),
        ListView::Error(message) => Err(CliError::ApiError {
            status: None,
            message,
        }),
        ListView::Loading => Err(CliError::Internal("screen is still loading".into())),
    }
}

fn parse_key(id: &str) -> Result<PrimaryKey, CliError> {
    id.parse().map_err(|_| CliError::Validation {
        field: "id".into(),
        reason: format!("not a valid key: '{id}'"),
    })
}

fn print_item(spec: &ScreenSpec, item: &Record, global: &GlobalOpts) -> Result<(), CliError> {
    let rendered = output::render_single(
        global.output,
        item,
        |item| {
            item.iter()
                .map(|(k, v)| (k.clone(), plain_text(v)))
                .collect()
        },
        |item| {
            item.get(&spec.pk_field)
                .map(plain_text)
                .unwrap_or_default()
        },
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
