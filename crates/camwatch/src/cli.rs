//! Clap derive structures for the `camwatch` CLI.
//!
//! Kept free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camwatch -- USB camera watchdog
#[derive(Debug, Parser)]
#[command(
    name = "camwatch",
    version,
    about = "Watch USB cameras and rebind them when they drop off",
    long_about = "Polls the configured camera device nodes and, when one disappears,\n\
        unbinds and rebinds its USB interface from the camera driver so the\n\
        kernel re-enumerates it. Must run as root to write the driver's\n\
        bind/unbind control files.",
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
    /// Config file (missing file means built-in defaults)
    #[arg(
        long,
        env = "CAMWATCH_CONFIG",
        default_value = "/etc/camwatch/config.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Teleop INI to read camera pipelines from
    #[arg(long, global = true)]
    pub teleop_ini: Option<PathBuf>,

    /// Device → bus address cache file
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Log file for the daemon
    #[arg(long, global = true, conflicts_with = "no_log_file")]
    pub log_file: Option<PathBuf>,

    /// Log to the console only
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Monitor cameras until SIGINT or SIGTERM
    Run,

    /// Resolve every camera once and report its status
    #[command(alias = "test")]
    Check(CheckArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
