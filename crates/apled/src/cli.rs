//! Clap derive structures for the `apled` CLI.
//!
//! Only depends on clap and clap_complete so `build.rs` can include it
//! for man page generation. Days and times stay strings here and are
//! parsed by the command handlers.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// apled -- weekly LED schedules for UniFi access points
#[derive(Debug, Parser)]
#[command(
    name = "apled",
    version,
    about = "Turn UniFi access-point LEDs on and off, by hand or on a weekly schedule",
    long_about = "Toggle the status LEDs of UniFi access points.\n\n\
        LEDs can be switched for the whole site or per device, and named\n\
        schedules turn them on and off at fixed times each week while\n\
        `apled run` is active.",
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
    /// Controller URL (overrides the config file)
    #[arg(long, short = 'c', env = "APLED_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Site name
    #[arg(long, short = 's', env = "APLED_SITE", global = true)]
    pub site: Option<String>,

    /// Controller account name (overrides the config file)
    #[arg(long, short = 'u', env = "APLED_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "APLED_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "APLED_INSECURE", global = true)]
    pub insecure: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

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
    /// List access points on the site
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Switch LEDs on or off right now
    Led(LedArgs),

    /// Manage weekly LED schedules
    #[command(alias = "sched", alias = "s")]
    Schedules(SchedulesArgs),

    /// Manage configuration and stored credentials
    Config(ConfigArgs),

    /// Run the scheduler in the foreground until Ctrl-C
    Run(RunArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List access points with their LED state
    #[command(alias = "ls")]
    List,
}

// ── LED ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LedArgs {
    #[command(subcommand)]
    pub command: LedCommand,
}

#[derive(Debug, Subcommand)]
pub enum LedCommand {
    /// Turn LEDs on
    On(LedTarget),
    /// Turn LEDs off
    Off(LedTarget),
}

#[derive(Debug, Args)]
pub struct LedTarget {
    /// Only this access point (MAC address or controller device id).
    /// Without it the site-wide LED setting is changed.
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

// ── Schedules ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SchedulesArgs {
    #[command(subcommand)]
    pub command: SchedulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchedulesCommand {
    /// List schedules
    #[command(alias = "ls")]
    List,

    /// Show one schedule with its rules
    Show {
        /// Schedule id, id prefix, or name
        schedule: String,
    },

    /// Create a schedule
    Add {
        /// Display name
        name: String,

        /// Assign an access point by MAC address (repeatable)
        #[arg(long = "device", short = 'd')]
        devices: Vec<String>,

        /// Create the schedule disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a schedule
    #[command(alias = "rm")]
    Remove {
        /// Schedule id, id prefix, or name
        schedule: String,
    },

    /// Enable a schedule
    Enable {
        /// Schedule id, id prefix, or name
        schedule: String,
    },

    /// Disable a schedule without deleting it
    Disable {
        /// Schedule id, id prefix, or name
        schedule: String,
    },

    /// Add a weekly on/off rule to a schedule
    AddRule {
        /// Schedule id, id prefix, or name
        schedule: String,

        /// Day of week (monday..sunday)
        #[arg(long)]
        day: String,

        /// Time the LEDs turn on (HH:MM or HH:MM:SS)
        #[arg(long)]
        on: String,

        /// Time the LEDs turn off (HH:MM or HH:MM:SS)
        #[arg(long)]
        off: String,
    },

    /// Remove a rule from a schedule
    RemoveRule {
        /// Schedule id, id prefix, or name
        schedule: String,

        /// Rule id or id prefix
        rule: String,
    },

    /// Assign an access point to a schedule
    Assign {
        /// Schedule id, id prefix, or name
        schedule: String,

        /// Access point MAC address
        mac: String,
    },

    /// Remove an access point from a schedule
    Unassign {
        /// Schedule id, id prefix, or name
        schedule: String,

        /// Access point MAC address
        mac: String,
    },

    /// Show upcoming LED changes, soonest first
    Next {
        /// Maximum number of entries
        #[arg(long, short = 'l', default_value = "10")]
        limit: usize,
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
    /// Create the config file, prompting for anything not given
    Init {
        /// Controller URL
        #[arg(long)]
        url: Option<String>,

        /// Controller account name
        #[arg(long)]
        username: Option<String>,

        /// Site name
        #[arg(long)]
        site: Option<String>,

        /// Accept self-signed TLS certificates
        #[arg(long)]
        insecure: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display the resolved configuration
    Show,

    /// Store the controller password in the system keyring
    SetPassword,

    /// Print the config file and state directory locations
    Path,
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Override the device refresh interval (e.g. "5m", "90s"; "0s" disables)
    #[arg(long)]
    pub refresh_interval: Option<String>,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
