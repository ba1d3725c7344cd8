//! Game hook capability interface
//!
//! The engine never touches process memory directly. Everything it needs
//! from the running game goes through [`GameHook`], and a fresh hook is
//! obtained through a [`HookConnector`] whenever the previous one dies.
//!
//! [`memory`] provides an in-process implementation backed by a
//! [`WorldSnapshot`](memory::WorldSnapshot), used for dry runs and tests.

pub mod memory;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::HookError;
use crate::swap::slot::{Hand, PhysicalSlot, PlayerIndex, SubSlot};

pub use memory::{MemoryConnector, MemoryHook, MemoryWorld, PlayerSnapshot, WorldSnapshot};

/// A tracked player as discovered on the current tick.
///
/// `index` is stable across ticks; `handle` is opaque to the engine and may
/// stop resolving at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityHandle {
    /// Stable player index
    pub index: PlayerIndex,
    /// Opaque hook-specific handle
    pub handle: u64,
}

/// Read/write access to one attached game instance.
///
/// Implementations are owned exclusively by the monitor loop.
pub trait GameHook: Send {
    /// Whether the underlying handle is still usable.
    fn is_handle_valid(&self) -> bool;

    /// Whether the target process has exited.
    fn is_terminated(&self) -> bool;

    /// Whether the game world is currently loaded.
    fn is_world_loaded(&self) -> bool;

    /// Lists the players present right now, ordered by index (at most four).
    fn discover_entities(&self) -> Vec<EntityHandle>;

    /// Reads the equipment identifier stored at `slot`.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the entity or slot cannot be read.
    fn read_slot_id(&self, entity: &EntityHandle, slot: PhysicalSlot) -> Result<i32, HookError>;

    /// Writes `id` into `slot`.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the write did not take effect.
    fn write_slot_id(
        &self,
        entity: &EntityHandle,
        slot: PhysicalSlot,
        id: i32,
    ) -> Result<(), HookError>;

    /// Which weapon sub-slot is currently equipped in `hand`.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the entity cannot be read.
    fn current_sub_slot(&self, entity: &EntityHandle, hand: Hand) -> Result<SubSlot, HookError>;

    /// Every active effect identifier on the entity.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the entity cannot be read.
    fn active_effects(&self, entity: &EntityHandle) -> Result<BTreeSet<i32>, HookError>;

    /// Whether a single effect is active on the entity.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the entity cannot be read.
    fn has_active_effect(&self, entity: &EntityHandle, effect_id: i32) -> Result<bool, HookError> {
        Ok(self.active_effects(entity)?.contains(&effect_id))
    }

    /// Liveness check used once per loop iteration.
    fn is_alive(&self) -> bool {
        self.is_handle_valid() && !self.is_terminated()
    }
}

/// Source of fresh [`GameHook`]s.
///
/// `try_connect` must not block; the monitor polls it at the configured
/// search interval until it succeeds or the search times out.
pub trait HookConnector: Send {
    /// Attempts to attach to the target once.
    fn try_connect(&mut self) -> Option<Box<dyn GameHook>>;
}
