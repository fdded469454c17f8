//! Clap derive structures for the `risegarden` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// risegarden -- control Rise Gardens from the command line
#[derive(Debug, Parser)]
#[command(
    name = "risegarden",
    version,
    about = "Monitor and control Rise Gardens indoor gardens",
    long_about = "Talks to the Rise Gardens cloud on behalf of your account.\n\n\
        Reads garden telemetry (light, water, temperature, care tasks) and\n\
        switches lights and pumps.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "RISE_GARDEN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "RISE_GARDEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RISE_GARDEN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "RISE_GARDEN_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
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
    /// Check that the profile's credentials are accepted
    Login,

    /// List and inspect gardens
    #[command(alias = "g")]
    Gardens(GardensArgs),

    /// Switch a garden's light
    Light(LightArgs),

    /// Switch a garden's water pump
    Pump(PumpArgs),

    /// Show light and pump schedules
    Schedule(ScheduleArgs),

    /// Poll continuously and print every new snapshot
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Gardens ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GardensArgs {
    #[command(subcommand)]
    pub command: GardensCommand,
}

#[derive(Debug, Subcommand)]
pub enum GardensCommand {
    /// List all gardens on the account
    #[command(alias = "ls")]
    List,

    /// Show one garden in detail
    Get {
        /// Garden id or name
        garden: String,
    },
}

// ── Light ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    #[command(subcommand)]
    pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
    /// Turn the light on
    On {
        /// Garden id or name
        garden: String,

        /// Brightness on a 0-255 scale
        #[arg(long, short = 'b', conflicts_with = "level")]
        brightness: Option<u8>,

        /// Light level on the vendor 0-100 scale
        #[arg(long, short = 'l', value_parser = clap::value_parser!(u8).range(0..=100))]
        level: Option<u8>,
    },

    /// Turn the light off
    Off {
        /// Garden id or name
        garden: String,
    },
}

// ── Pump ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PumpArgs {
    #[command(subcommand)]
    pub command: PumpCommand,
}

#[derive(Debug, Subcommand)]
pub enum PumpCommand {
    /// Start the water pump
    On {
        /// Garden id or name
        garden: String,
    },

    /// Stop the water pump
    Off {
        /// Garden id or name
        garden: String,
    },
}

// ── Schedule ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Show the light schedule
    Light {
        /// Garden id or name
        garden: String,
    },

    /// Show the pump schedule
    Pump {
        /// Garden id or name
        garden: String,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling interval in seconds (overrides profile)
    #[arg(long, short = 'i', value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the effective configuration (passwords redacted)
    Show,

    /// Print the config file path
    Path,

    /// List profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
