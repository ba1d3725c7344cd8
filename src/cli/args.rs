//! CLI argument definitions
//!
//! All Clap derive structs for `equipswap` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Rule-driven equipment swapper with safe temporary overrides.
#[derive(Parser, Debug)]
#[command(name = "equipswap", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only show warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "EQUIPSWAP_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "EQUIPSWAP_LOG_FORMAT")]
    pub log_format: LogFormatArg,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor against an in-memory world snapshot.
    Simulate(SimulateArgs),

    /// Validate configuration files without running the monitor.
    Validate(ValidateArgs),

    /// List the triggers a configuration file loads.
    Triggers(TriggersArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the swap configuration file.
    #[arg(short, long, env = "EQUIPSWAP_CONFIG")]
    pub config: PathBuf,

    /// Path to the world snapshot (YAML or JSON).
    #[arg(short, long)]
    pub world: PathBuf,

    /// Stop after this many loop cycles instead of waiting for Ctrl+C.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_ticks: Option<u64>,

    /// Print the final world snapshot as JSON on stdout.
    #[arg(long)]
    pub dump_world: bool,

    /// Write the JSONL event stream to this file instead of stderr.
    #[arg(long, env = "EQUIPSWAP_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this local port.
    #[arg(long, env = "EQUIPSWAP_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `triggers`.
#[derive(Args, Debug)]
pub struct TriggersArgs {
    /// Path to the swap configuration file.
    #[arg(short, long, env = "EQUIPSWAP_CONFIG")]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log line format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}
