//! `simulate` command
//!
//! Runs the full monitor loop against a [`MemoryWorld`] seeded from a
//! snapshot file.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::SimulateArgs;
use crate::error::EquipSwapError;
use crate::hook::{MemoryWorld, WorldSnapshot};
use crate::monitor::Monitor;
use crate::observability::EventEmitter;

/// Run the monitor until Ctrl+C or `--max-ticks`.
///
/// # Errors
///
/// Returns a configuration error if the config or snapshot cannot be
/// loaded, or a monitor error if the initial attach times out.
pub async fn run(args: &SimulateArgs, cancel: CancellationToken) -> Result<(), EquipSwapError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let config = super::load_config(&args.config)?;
    config.log_summary();

    let snapshot = WorldSnapshot::load(&args.world)?;
    tracing::info!(
        world = %args.world.display(),
        players = snapshot.players.len(),
        world_loaded = snapshot.world_loaded,
        "world snapshot loaded"
    );
    let world = MemoryWorld::new(snapshot);

    let events = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stderr(),
    };

    let mut monitor = Monitor::new(
        config,
        Box::new(world.connector()),
        Arc::new(events),
        cancel,
    );
    if let Some(max) = args.max_ticks {
        monitor = monitor.with_max_cycles(max);
    }

    let summary = monitor.run().await?;
    tracing::info!(
        ticks = summary.ticks,
        pending_swaps = summary.pending_swaps,
        writes = world.write_count(),
        "simulation finished"
    );

    if args.dump_world {
        println!("{}", serde_json::to_string_pretty(&world.snapshot())?);
    }
    Ok(())
}
