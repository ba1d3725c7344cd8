//! `triggers` command
//!
//! Prints every loaded trigger in evaluation order.

use serde::Serialize;

use crate::cli::args::{OutputFormat, TriggersArgs};
use crate::config::TRIGGER_LISTS;
use crate::error::EquipSwapError;
use crate::swap::trigger::SwapTrigger;

#[derive(Debug, Serialize)]
struct TriggerRow<'a> {
    id: usize,
    list: &'static str,
    display: String,
    #[serde(flatten)]
    trigger: &'a SwapTrigger,
}

/// List the triggers of a configuration file.
///
/// # Errors
///
/// Returns a configuration error if the file does not load.
pub fn run(args: &TriggersArgs) -> Result<(), EquipSwapError> {
    let config = super::load_config(&args.config)?;

    let rows: Vec<TriggerRow<'_>> = config
        .triggers
        .iter()
        .enumerate()
        .map(|(id, trigger)| TriggerRow {
            id,
            list: list_key(trigger),
            display: trigger.to_string(),
            trigger,
        })
        .collect();

    match args.format {
        OutputFormat::Human => {
            if rows.is_empty() {
                println!("no triggers configured");
            }
            for row in &rows {
                println!("#{:<4} {}", row.id, row.display);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

fn list_key(trigger: &SwapTrigger) -> &'static str {
    TRIGGER_LISTS
        .iter()
        .find(|(_, target)| *target == trigger.target())
        .map_or("", |(key, _)| *key)
}
