//! Metrics collection for `equipswap`.
//!
//! Prometheus-compatible counters and gauges. Every recorder is a no-op
//! until [`init_metrics`] installs a global recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::EquipSwapError;
use crate::swap::ledger::RevertMode;
use crate::swap::trigger::EquipCategory;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// With `Some(port)` a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`; with `None` the recorder is installed without one.
///
/// # Errors
///
/// Returns `EquipSwapError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), EquipSwapError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| EquipSwapError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "equipswap_swaps_applied_total",
        "Equipment identifiers rewritten by triggers"
    );
    describe_counter!(
        "equipswap_swaps_reverted_total",
        "Temporary swaps undone, by category and reason"
    );
    describe_counter!(
        "equipswap_swap_errors_total",
        "Failed reads, writes and reverts"
    );
    describe_counter!("equipswap_ticks_total", "Monitor ticks executed");
    describe_gauge!(
        "equipswap_entities_tracked",
        "Players discovered on the latest tick"
    );
    describe_counter!(
        "equipswap_hook_reacquisitions_total",
        "Game hooks re-acquired after a loss"
    );
}

/// Records a successful trigger write.
pub fn record_swap_applied(category: EquipCategory) {
    counter!("equipswap_swaps_applied_total", "category" => category.as_str()).increment(1);
}

/// Records a successful revert.
pub fn record_swap_reverted(category: EquipCategory, reason: RevertMode) {
    counter!(
        "equipswap_swaps_reverted_total",
        "category" => category.as_str(),
        "reason" => reason.as_str(),
    )
    .increment(1);
}

/// Records a recoverable failure by kind (`read`, `write`, `revert`).
pub fn record_swap_error(kind: &'static str) {
    counter!("equipswap_swap_errors_total", "kind" => kind).increment(1);
}

pub fn record_tick() {
    counter!("equipswap_ticks_total").increment(1);
}

#[allow(clippy::cast_precision_loss)]
pub fn set_entities_tracked(count: usize) {
    gauge!("equipswap_entities_tracked").set(count as f64);
}

pub fn record_hook_reacquisition() {
    counter!("equipswap_hook_reacquisitions_total").increment(1);
}
