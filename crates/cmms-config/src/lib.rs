//! Shared configuration for the CMMS console.
//!
//! TOML profiles, token resolution (env + plaintext), declarative screen
//! definitions, and translation to `cmms_core::ConsoleConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use cmms_core::{
    AuthScheme, ColumnDescriptor, ConsoleConfig, DisplayTokens, FieldDescriptor, FieldKind, Record,
    ResourceEndpoint, ScreenConfig, TlsVerification,
};

/// Prefix of environment overrides (`CMMS_DEFAULTS__TIMEOUT=60`).
pub const ENV_PREFIX: &str = "CMMS_";

/// Fallback environment variable holding the API token.
pub const TOKEN_ENV: &str = "CMMS_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Screens defined in the file; they replace built-ins of the same name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screens: Vec<ScreenSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            screens: Vec::new(),
        }
    }
}

impl Config {
    /// Pick a profile: the explicit name, else `default_profile`, else `"default"`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }

    pub fn screen(&self, name: &str) -> Option<&ScreenSpec> {
        self.screens.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Lifetime of cached list responses, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Locale of displayed values (`es` renders booleans as Sí/No).
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            debounce_ms: default_debounce(),
            locale: default_locale(),
        }
    }
}

impl Defaults {
    pub fn tokens(&self) -> DisplayTokens {
        DisplayTokens::for_locale(&self.locale)
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_debounce() -> u64 {
    300
}
fn default_locale() -> String {
    "es".into()
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root (e.g., "https://cmms.example.com/api/v2/").
    pub api_url: String,

    /// How the token is presented: "token" or "bearer".
    #[serde(default)]
    pub auth_scheme: AuthScheme,

    /// API token (plaintext -- prefer an env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth_scheme: AuthScheme::default(),
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

// ── Declarative screens ─────────────────────────────────────────────

/// A table column: header text and a dotted path into the item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnSpec {
    pub header: String,
    pub accessor: String,
}

/// A CRUD screen described in TOML.
///
/// ```toml
/// [[screens]]
/// name = "faenas"
/// title = "Faenas"
/// endpoint = "faenas"
/// pk_field = "idfaena"
/// columns = [{ header = "Nombre", accessor = "nombrefaena" }]
/// fields = [{ name = "nombrefaena", label = "Nombre" }]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScreenSpec {
    pub name: String,
    pub title: String,
    pub endpoint: String,
    #[serde(default = "default_pk_field")]
    pub pk_field: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

fn default_pk_field() -> String {
    "id".into()
}

impl ScreenSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::Validation {
            field: format!("screens.{}.{field}", self.name),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "screens.name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.pk_field.trim().is_empty() {
            return Err(invalid("pk_field", "must not be empty".into()));
        }
        for field in &self.fields {
            if field.kind == FieldKind::Select && field.options_source.is_none() {
                return Err(invalid(
                    &format!("fields.{}", field.name),
                    "select fields need an options_source".into(),
                ));
            }
        }
        Ok(())
    }

    /// Build the runtime screen definition.
    pub fn to_screen_config(&self, tokens: DisplayTokens) -> Result<ScreenConfig<Record>, ConfigError> {
        self.validate()?;
        let mut config = ScreenConfig::new(
            self.title.clone(),
            ResourceEndpoint::new(&self.endpoint, self.pk_field.clone()),
        )
        .tokens(tokens);
        for column in &self.columns {
            config = config.column(ColumnDescriptor::field(
                column.header.clone(),
                column.accessor.clone(),
            ));
        }
        for field in &self.fields {
            config = config.field(field.clone());
        }
        Ok(config)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("cl", "somacor", "cmms").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cmms");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    for screen in &config.screens {
        screen.validate()?;
    }
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the API token from the process environment and the profile.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<Option<SecretString>, ConfigError> {
    resolve_token_with(profile, profile_name, |name| std::env::var(name).ok())
}

/// Token resolution against an arbitrary environment.
///
/// Order: the profile's `token_env` variable, then `CMMS_TOKEN`, then the
/// plaintext `token`. A profile that names a `token_env` must end up with a
/// token; otherwise requests go out anonymously.
pub fn resolve_token_with<F>(
    profile: &Profile,
    profile_name: &str,
    env: F,
) -> Result<Option<SecretString>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Some(val) = env(env_name).filter(|v| !v.is_empty()) {
            return Ok(Some(SecretString::from(val)));
        }
    }

    // 2. Global token variable
    if let Some(val) = env(TOKEN_ENV).filter(|v| !v.is_empty()) {
        return Ok(Some(SecretString::from(val)));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(Some(SecretString::from(token.clone())));
    }

    if profile.token_env.is_some() {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(None)
}

/// Build a `ConsoleConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_console_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let token = resolve_token(profile, profile_name)?;
    build_console_config(profile, defaults, token)
}

/// Assemble a `ConsoleConfig` from a profile and an already resolved token.
pub fn build_console_config(
    profile: &Profile,
    defaults: &Defaults,
    token: Option<SecretString>,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ConsoleConfig::new(url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.cache_ttl = Duration::from_secs(defaults.cache_ttl_secs);
    config.debounce = Duration::from_millis(defaults.debounce_ms);
    if let Some(token) = token {
        config = config.with_token(token, profile.auth_scheme);
    }
    Ok(config)
}
