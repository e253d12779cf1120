//! Clap derive structures for the `chartdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// chartdeck -- console for a chart provider service
#[derive(Debug, Parser)]
#[command(
    name = "chartdeck",
    version,
    about = "Manage a chart provider service from the command line",
    long_about = "Inspect service status, enable or remove chart sets, upload chart\n\
        archives, and edit rendering settings. Changes that need a service\n\
        restart offer one when they complete.",
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
    /// Service profile to use
    #[arg(long, short = 'p', env = "CHARTDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service URL (overrides profile)
    #[arg(long, env = "CHARTDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CHARTDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept every dialog without asking
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CHARTDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CHARTDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show chart manager, cache filler, plugin and chart set status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Manage chart sets
    #[command(alias = "c")]
    Charts(ChartsArgs),

    /// View and change rendering settings
    #[command(alias = "s")]
    Settings(SettingsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Keep polling and redraw on every change (Ctrl-C to stop)
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Charts ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChartsArgs {
    #[command(subcommand)]
    pub command: ChartsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChartsCommand {
    /// List chart sets
    #[command(alias = "ls")]
    List,

    /// Enable a chart set
    Enable {
        /// Chart set name
        name: String,
    },

    /// Disable a chart set
    Disable {
        /// Chart set name
        name: String,
    },

    /// Delete a chart set
    #[command(alias = "rm")]
    Delete {
        /// Chart set name
        name: String,
    },

    /// Upload a chart archive (.zip)
    Upload {
        /// Archive to upload
        file: PathBuf,

        /// Restart the service after a successful upload without asking
        #[arg(long)]
        restart: bool,
    },

    /// Restart the chart service
    Restart {
        /// Wait until the service reports ready again
        #[arg(long)]
        wait: bool,
    },

    /// Create and download the license fingerprint
    Fingerprint {
        /// Create the fingerprint for a dongle
        #[arg(long)]
        dongle: bool,

        /// Directory to write the fingerprint file into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current values
    Show {
        /// Include the detail settings
        #[arg(long)]
        detail: bool,

        /// Only show one group (main, display, depth, detail)
        #[arg(long, short = 'g')]
        group: Option<String>,
    },

    /// Change one or more settings (values in display units)
    Set {
        /// NAME=VALUE pairs
        #[arg(required = true, value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },

    /// Reset every setting to its default
    Defaults,
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

    /// Show the current configuration
    Show,

    /// Create or update a profile (takes the URL from --url or a prompt)
    Init,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
