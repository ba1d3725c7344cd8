//! Temporary swap ledger
//!
//! One [`SwapLedger`] per player holds at most one [`TempSwap`] per logical
//! slot. Setting an entry overwrites the previous one without reverting it.
//!
//! Only weapon hands expire on their own (when the recorded sub-slot is no
//! longer equipped). Armor and ring entries are cleared by the forced revert
//! that follows a world load.

use serde::Serialize;

use super::adapter::SlotAdapter;
use super::slot::{Hand, LogicalSlot, PhysicalSlot, SubSlot};
use crate::error::SwapError;

/// A pending reversion: `dest_id` was written over `source_id` at `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TempSwap {
    pub source_id: i32,
    pub dest_id: i32,
    pub slot: PhysicalSlot,
}

impl TempSwap {
    #[must_use]
    pub const fn logical(&self) -> LogicalSlot {
        self.slot.logical()
    }
}

/// Why a revert is being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertMode {
    /// The weapon sub-slot it targeted was unequipped
    Expired,
    /// World reload; the entry is cleared even if the revert fails
    Forced,
}

impl RevertMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Forced => "forced",
        }
    }
}

/// Active temporary swaps for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapLedger {
    entries: [Option<TempSwap>; LogicalSlot::COUNT],
}

impl SwapLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn get(&self, slot: LogicalSlot) -> Option<&TempSwap> {
        self.entries[slot.index()].as_ref()
    }

    #[must_use]
    pub const fn has(&self, slot: LogicalSlot) -> bool {
        self.entries[slot.index()].is_some()
    }

    /// Records `swap` for its logical slot, returning the entry it replaced.
    ///
    /// The replaced entry is discarded, not reverted.
    pub fn set(&mut self, swap: TempSwap) -> Option<TempSwap> {
        self.entries[swap.logical().index()].replace(swap)
    }

    pub fn clear(&mut self, slot: LogicalSlot) -> Option<TempSwap> {
        self.entries[slot.index()].take()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Active entries in logical slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TempSwap> {
        self.entries.iter().flatten()
    }

    /// The entry for `hand` if it targets a sub-slot other than `equipped`.
    #[must_use]
    pub fn expired(&self, hand: Hand, equipped: SubSlot) -> Option<&TempSwap> {
        self.get(LogicalSlot::Weapon(hand))
            .filter(|swap| swap.slot.sub_slot() != Some(equipped))
    }
}

/// Reverts the temporary swap recorded for `slot`.
///
/// The live value is re-read first; if it no longer equals the swap's
/// destination, nothing is written. On success the entry is cleared and
/// returned. On failure an [`Expired`](RevertMode::Expired) entry stays in
/// the ledger for the next pass, while a [`Forced`](RevertMode::Forced)
/// entry is cleared anyway.
///
/// # Errors
///
/// - [`SwapError::NoActiveSwap`] if no entry exists (the ledger is untouched)
/// - [`SwapError::UnexpectedValue`] if the live value was overridden since
/// - [`SwapError::Hook`] if the read or write fails
pub fn revert_slot(
    adapter: &SlotAdapter<'_>,
    ledger: &mut SwapLedger,
    slot: LogicalSlot,
    mode: RevertMode,
) -> Result<TempSwap, SwapError> {
    let swap = *ledger.get(slot).ok_or(SwapError::NoActiveSwap { slot })?;

    match restore(adapter, &swap) {
        Ok(()) => {
            ledger.clear(slot);
            Ok(swap)
        }
        Err(e) => {
            if mode == RevertMode::Forced {
                ledger.clear(slot);
            }
            Err(e)
        }
    }
}

fn restore(adapter: &SlotAdapter<'_>, swap: &TempSwap) -> Result<(), SwapError> {
    let live = adapter.read(swap.slot)?;
    if live != swap.dest_id {
        return Err(SwapError::UnexpectedValue {
            slot: swap.slot,
            expected: swap.dest_id,
            found: live,
        });
    }
    adapter.write(swap.slot, swap.source_id)?;
    Ok(())
}
