//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use secrecy::SecretString;
use serde_json::{Map, Value};

use cmms_config::{Config, ConfigError, Profile, build_console_config, resolve_token};
use cmms_core::{Console, ConsoleConfig};

use crate::cli::{FormValues, GlobalOpts};
use crate::error::CliError;

// ── Connection ──────────────────────────────────────────────────────

/// Build a `ConsoleConfig` from the config file, profile, and CLI overrides.
///
/// Flags beat the profile. Without any profile, `--api-url` alone is enough.
pub fn console_config(cfg: &Config, global: &GlobalOpts) -> Result<ConsoleConfig, CliError> {
    let flag_token = global.token.clone().map(SecretString::from);

    let (mut profile, token) = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => {
            let token = match flag_token {
                Some(token) => Some(token),
                None => resolve_token(profile, &name)?,
            };
            (profile.clone(), token)
        }
        Err(ConfigError::UnknownProfile { name }) if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        Err(ConfigError::UnknownProfile { name }) => {
            let url = global.api_url.clone().ok_or_else(|| CliError::NoConfig {
                path: cmms_config::config_path().display().to_string(),
            })?;
            let profile = Profile::new(url);
            let token = match flag_token {
                Some(token) => Some(token),
                None => resolve_token(&profile, &name)?,
            };
            (profile, token)
        }
        Err(other) => return Err(other.into()),
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(build_console_config(&profile, &cfg.defaults, token)?)
}

pub fn connect(cfg: &Config, global: &GlobalOpts) -> Result<Console, CliError> {
    let config = console_config(cfg, global)?;
    tracing::debug!(url = %config.base_url, "connecting");
    Ok(Console::connect(config)?)
}

// ── Input ───────────────────────────────────────────────────────────

/// Split `key=value` arguments at the first `=`.
pub fn parse_assignments(args: &[String], flag: &str) -> Result<Vec<(String, String)>, CliError> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_owned(), value.to_owned()))
            }
            _ => Err(CliError::Validation {
                field: flag.into(),
                reason: format!("expected KEY=VALUE, got '{arg}'"),
            }),
        })
        .collect()
}

/// Form values from `--from-file` first, then `--set` on top.
pub fn form_values(values: &FormValues) -> Result<Vec<(String, Value)>, CliError> {
    let mut out = Vec::new();
    if let Some(ref path) = values.from_file {
        for (key, value) in read_json_object(path)? {
            out.push((key, value));
        }
    }
    for (key, value) in parse_assignments(&values.set, "set")? {
        out.push((key, Value::String(value)));
    }
    Ok(out)
}

/// Read a JSON object file for `--from-file` flags.
pub fn read_json_object(path: &Path) -> Result<Map<String, Value>, CliError> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::Validation {
            field: "from-file".into(),
            reason: "expected a JSON object".into(),
        }),
    }
}

// ── Confirmation ────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
