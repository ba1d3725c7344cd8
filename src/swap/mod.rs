//! Trigger and temporary swap engine
//!
//! Leaves first: [`slot`] and [`trigger`] model the data, [`cooldown`] and
//! [`ledger`] hold per-player state, [`adapter`] and [`matcher`] talk to the
//! hook, and [`engine`] ties a tick together.

pub mod adapter;
pub mod cooldown;
pub mod engine;
pub mod ledger;
pub mod matcher;
pub mod slot;
pub mod trigger;

pub use engine::{EngineTiming, ForcedRevertSummary, SwapEngine, TickReport};
pub use ledger::{RevertMode, SwapLedger, TempSwap};
pub use slot::{ArmorLocation, Hand, LogicalSlot, PhysicalSlot, PlayerIndex, RingSlot, SubSlot};
pub use trigger::{EquipCategory, SwapTrigger, TriggerId, TriggerTarget};
