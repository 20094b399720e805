//! Clap derive structures for the `cmms` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cmms -- maintenance console for the CMMS backend
#[derive(Debug, Parser)]
#[command(
    name = "cmms",
    version,
    about = "Administer CMMS catalogs from the command line",
    long_about = "Browse and edit the CMMS maintenance catalogs (faenas, equipment\n\
        types, equipment states, task types, equipment) through the same\n\
        cached, metadata-driven screens the web console uses.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "CMMS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, short = 'u', env = "CMMS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// API token (overrides profile and CMMS_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CMMS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CMMS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CMMS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one key per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work with catalog screens
    #[command(alias = "s")]
    Screens(ScreensArgs),

    /// Read raw API collections
    #[command(alias = "r")]
    Resources(ResourcesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Screens ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScreensArgs {
    #[command(subcommand)]
    pub command: ScreensCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScreensCommand {
    /// List the available screens
    #[command(alias = "ls")]
    List,

    /// Show a screen's table
    Show {
        /// Screen name (see `screens list`)
        screen: String,

        /// Page to show (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Rows per page (0 shows everything)
        #[arg(long, default_value = "0")]
        per_page: usize,
    },

    /// Show the choices of every select field
    Options {
        /// Screen name
        screen: String,
    },

    /// Create an item through the screen's form
    Create {
        /// Screen name
        screen: String,

        #[command(flatten)]
        values: FormValues,
    },

    /// Edit an item through the screen's form
    Edit {
        /// Screen name
        screen: String,

        /// Primary key of the item
        id: String,

        #[command(flatten)]
        values: FormValues,
    },

    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Screen name
        screen: String,

        /// Primary key of the item
        id: String,
    },
}

/// Form input shared by create and edit.
#[derive(Debug, Args)]
pub struct FormValues {
    /// Field value as name=value (repeatable)
    #[arg(long = "set", short = 's', value_name = "FIELD=VALUE")]
    pub set: Vec<String>,

    /// Read field values from a JSON object file
    #[arg(long, short = 'F', value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}

// ── Resources ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ResourcesArgs {
    #[command(subcommand)]
    pub command: ResourcesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResourcesCommand {
    /// List a collection as JSON
    #[command(alias = "ls")]
    List {
        /// Collection endpoint, e.g. `equipos`
        endpoint: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long, short = 'Q', value_name = "KEY=VALUE")]
        query: Vec<String>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Create or extend the config file with guided setup
    Init,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
