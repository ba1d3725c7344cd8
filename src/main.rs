//! `equipswap`: rule-driven equipment swapper

use clap::Parser;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;

use equipswap::cli::args::{Cli, LogFormatArg};
use equipswap::cli::commands;
use equipswap::error::ExitCode;
use equipswap::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Human => LogFormat::Human,
        LogFormatArg::Json => LogFormat::Json,
    };
    init_logging(format, cli.verbose, cli.quiet, cli.color);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => Some(sigterm),
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM, only Ctrl+C stops the monitor");
                None
            }
        };

        wait_for_signal(sigterm.as_mut()).await;
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
        shutdown.cancel();

        let code = wait_for_signal(sigterm.as_mut()).await;
        std::process::exit(code);
    });

    match commands::dispatch(cli, cancel).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for Ctrl+C or SIGTERM and returns the matching exit code.
async fn wait_for_signal(sigterm: Option<&mut Signal>) -> i32 {
    match sigterm {
        Some(term) => tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = term.recv() => ExitCode::TERMINATED,
        },
        None => {
            let _ = tokio::signal::ctrl_c().await;
            ExitCode::INTERRUPTED
        }
    }
}
