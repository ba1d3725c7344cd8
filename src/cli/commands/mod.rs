//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod simulate;
pub mod triggers;
pub mod validate;
pub mod version;

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::{ConfigLoader, SwapConfig};
use crate::error::EquipSwapError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), EquipSwapError> {
    match cli.command {
        Commands::Simulate(args) => simulate::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Triggers(args) => triggers::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads a configuration file, logging every loader warning.
pub(crate) fn load_config(path: &Path) -> Result<SwapConfig, EquipSwapError> {
    tracing::info!(config = %path.display(), "loading configuration");
    let result = ConfigLoader::with_defaults().load(path)?;
    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    Ok(result.config)
}
