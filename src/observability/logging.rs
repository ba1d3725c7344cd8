//! Logging initialization for `equipswap`.
//!
//! Structured logging via `tracing` with human-readable and JSON output,
//! configurable verbosity, and an `EQUIPSWAP_LOG_LEVEL` override.

use std::io::IsTerminal;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::cli::args::ColorChoice;

/// Environment variable that overrides the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "EQUIPSWAP_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Maps a verbosity level to a tracing directive.
///
/// The default (0) is `info`, since swap and revert activity is the main
/// output of a run. `-q` drops to `warn`.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Builds the subscriber for `format` writing to `writer`.
#[must_use]
pub fn build_subscriber<W>(
    format: LogFormat,
    filter: EnvFilter,
    ansi: bool,
    show_target: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Human => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(ansi)
                .with_target(show_target)
                .with_writer(writer)
                .finish(),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(writer)
                .finish(),
        ),
    }
}

/// Initializes the global tracing subscriber on stderr.
///
/// `EQUIPSWAP_LOG_LEVEL` takes precedence over `verbosity`. A subscriber
/// that is already installed is kept.
pub fn init_logging(format: LogFormat, verbosity: u8, quiet: bool, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity, quiet)));

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let subscriber = build_subscriber(format, filter, use_ansi, verbosity >= 2, std::io::stderr);
    let _ = tracing::subscriber::set_global_default(subscriber);
}
