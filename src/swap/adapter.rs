//! Slot adapter
//!
//! Binds a [`GameHook`] to one discovered entity and resolves trigger targets
//! into the physical positions a rule iterates.

use std::collections::BTreeSet;

use super::slot::{Hand, PhysicalSlot, PlayerIndex, RingSlot, SubSlot};
use super::trigger::TriggerTarget;
use crate::error::HookError;
use crate::hook::{EntityHandle, GameHook};

/// Uniform slot access for a single entity.
#[derive(Clone, Copy)]
pub struct SlotAdapter<'a> {
    hook: &'a dyn GameHook,
    entity: EntityHandle,
}

impl std::fmt::Debug for SlotAdapter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotAdapter")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

impl<'a> SlotAdapter<'a> {
    #[must_use]
    pub const fn new(hook: &'a dyn GameHook, entity: EntityHandle) -> Self {
        Self { hook, entity }
    }

    #[must_use]
    pub const fn player(&self) -> PlayerIndex {
        self.entity.index
    }

    /// Reads the identifier at `slot`.
    ///
    /// # Errors
    ///
    /// Propagates the hook's read failure.
    pub fn read(&self, slot: PhysicalSlot) -> Result<i32, HookError> {
        self.hook.read_slot_id(&self.entity, slot)
    }

    /// Writes `id` to `slot`.
    ///
    /// # Errors
    ///
    /// Propagates the hook's write failure.
    pub fn write(&self, slot: PhysicalSlot, id: i32) -> Result<(), HookError> {
        self.hook.write_slot_id(&self.entity, slot, id)
    }

    /// Currently equipped sub-slot of `hand`.
    ///
    /// # Errors
    ///
    /// Propagates the hook's read failure.
    pub fn equipped(&self, hand: Hand) -> Result<SubSlot, HookError> {
        self.hook.current_sub_slot(&self.entity, hand)
    }

    /// Active effects of the entity.
    ///
    /// # Errors
    ///
    /// Propagates the hook's read failure.
    pub fn active_effects(&self) -> Result<BTreeSet<i32>, HookError> {
        self.hook.active_effects(&self.entity)
    }

    /// Physical positions a rule on `target` examines this tick.
    ///
    /// With `equipped_only`, a weapon target yields just the hand's equipped
    /// sub-slot; otherwise both sub-slots. Armor yields its single location
    /// and rings yield both positions.
    ///
    /// # Errors
    ///
    /// Fails if the equipped sub-slot cannot be read.
    pub fn positions(
        &self,
        target: TriggerTarget,
        equipped_only: bool,
    ) -> Result<Vec<PhysicalSlot>, HookError> {
        Ok(match target {
            TriggerTarget::Weapon(hand) if equipped_only => {
                vec![PhysicalSlot::Weapon(hand, self.equipped(hand)?)]
            }
            TriggerTarget::Weapon(hand) => SubSlot::ALL
                .iter()
                .map(|&sub| PhysicalSlot::Weapon(hand, sub))
                .collect(),
            TriggerTarget::Armor(location) => vec![PhysicalSlot::Armor(location)],
            TriggerTarget::Ring => RingSlot::ALL.iter().map(|&r| PhysicalSlot::Ring(r)).collect(),
        })
    }
}
