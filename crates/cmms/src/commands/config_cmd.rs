//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use cmms_config::{self as config, Config, Profile};
use cmms_core::AuthScheme;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// A copy of the config that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let mut cfg = config::load_config().unwrap_or_default();
            eprintln!("CMMS console -- configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. API URL
            let api_url: String = Input::new()
                .with_prompt("API URL")
                .default("http://localhost:8000/api/v2/".into())
                .validate_with(|input: &String| -> Result<(), String> {
                    input
                        .parse::<url::Url>()
                        .map(|_| ())
                        .map_err(|e| format!("invalid URL: {e}"))
                })
                .interact_text()
                .map_err(prompt_err)?;

            // 3. Auth scheme
            let schemes = [AuthScheme::Token, AuthScheme::Bearer];
            let scheme_labels = ["Token <key> (Django REST framework)", "Bearer <jwt>"];
            let scheme = Select::new()
                .with_prompt("Authorization header")
                .items(&scheme_labels)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            // 4. Token storage
            let store_choices = [
                "Read from an environment variable (recommended)",
                "Save to config file (plaintext)",
                "No token (anonymous)",
            ];
            let store = Select::new()
                .with_prompt("Where does the API token come from?")
                .items(&store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let mut profile = Profile::new(api_url);
            profile.auth_scheme = schemes.get(scheme).copied().unwrap_or_default();
            match store {
                0 => {
                    let var: String = Input::new()
                        .with_prompt("Variable name")
                        .default(config::TOKEN_ENV.into())
                        .interact_text()
                        .map_err(prompt_err)?;
                    profile.token_env = Some(var);
                }
                1 => {
                    let token = Password::new()
                        .with_prompt("API token")
                        .interact()
                        .map_err(prompt_err)?;
                    if token.is_empty() {
                        return Err(CliError::Validation {
                            field: "token".into(),
                            reason: "token cannot be empty".into(),
                        });
                    }
                    profile.token = Some(token);
                }
                _ => {}
            }

            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }

            let path = config::save_config(&cfg)?;

            eprintln!("\nConfiguration written to {}", path.display());
            eprintln!("  Profile: {profile_name}");
            eprintln!("\n  Test it: cmms screens show faenas");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let rendered = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| CliError::Internal(format!("failed to render config: {e}")))?,
                other => output::render_structured(other, &cfg)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();

            let rendered = match global.output {
                OutputFormat::Table => {
                    let headers = ["", "Profile", "API URL", "Auth"].map(String::from);
                    output::render_rows(
                        &headers,
                        names.iter().filter_map(|name| {
                            let profile = cfg.profiles.get(*name)?;
                            Some(vec![
                                if name.as_str() == default { "*".into() } else { String::new() },
                                (*name).clone(),
                                profile.api_url.clone(),
                                profile.auth_scheme.to_string(),
                            ])
                        }),
                    )
                }
                OutputFormat::Plain => names
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => output::render_structured(other, &redacted(&cfg).profiles)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
