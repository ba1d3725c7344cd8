//! In-memory game hook
//!
//! [`MemoryWorld`] holds a [`WorldSnapshot`] behind a shared lock. The
//! connector hands out [`MemoryHook`]s bound to the current attach
//! generation, so dropping the handle or terminating the "process" makes
//! every outstanding hook and entity handle go stale, exactly like a real
//! process handle would.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::{EntityHandle, GameHook, HookConnector};
use crate::error::{ConfigError, EquipSwapError, HookError};
use crate::swap::slot::{ArmorLocation, Hand, PhysicalSlot, PlayerIndex, RingSlot, SubSlot};

// ============================================================================
// Snapshot
// ============================================================================

/// Serializable picture of the game world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldSnapshot {
    /// Whether the world is loaded
    #[serde(default = "default_world_loaded")]
    pub world_loaded: bool,

    /// Players present in the world
    #[serde(default)]
    pub players: Vec<PlayerSnapshot>,
}

const fn default_world_loaded() -> bool {
    true
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            world_loaded: true,
            players: Vec::new(),
        }
    }
}

/// Equipment and effects of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSnapshot {
    pub index: PlayerIndex,
    #[serde(default)]
    pub weapons: WeaponSet,
    #[serde(default)]
    pub armor: ArmorSet,
    #[serde(default)]
    pub rings: [i32; 2],
    #[serde(default)]
    pub effects: BTreeSet<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeaponSet {
    #[serde(default)]
    pub left: HandLoadout,
    #[serde(default)]
    pub right: HandLoadout,
}

/// Both weapon sub-slots of one hand plus the equipped pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandLoadout {
    #[serde(default)]
    pub primary: i32,
    #[serde(default)]
    pub secondary: i32,
    #[serde(default = "default_equipped")]
    pub equipped: SubSlot,
}

const fn default_equipped() -> SubSlot {
    SubSlot::Primary
}

impl Default for HandLoadout {
    fn default() -> Self {
        Self {
            primary: 0,
            secondary: 0,
            equipped: SubSlot::Primary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmorSet {
    #[serde(default)]
    pub head: i32,
    #[serde(default)]
    pub body: i32,
    #[serde(default)]
    pub arms: i32,
    #[serde(default)]
    pub legs: i32,
}

impl PlayerSnapshot {
    /// Creates a player with every slot zeroed and no effects.
    #[must_use]
    pub fn new(index: PlayerIndex) -> Self {
        Self {
            index,
            weapons: WeaponSet::default(),
            armor: ArmorSet::default(),
            rings: [0; 2],
            effects: BTreeSet::new(),
        }
    }

    const fn hand(&self, hand: Hand) -> &HandLoadout {
        match hand {
            Hand::Left => &self.weapons.left,
            Hand::Right => &self.weapons.right,
        }
    }

    const fn hand_mut(&mut self, hand: Hand) -> &mut HandLoadout {
        match hand {
            Hand::Left => &mut self.weapons.left,
            Hand::Right => &mut self.weapons.right,
        }
    }

    /// Identifier stored at `slot`.
    #[must_use]
    pub fn slot(&self, slot: PhysicalSlot) -> i32 {
        match slot {
            PhysicalSlot::Weapon(hand, SubSlot::Primary) => self.hand(hand).primary,
            PhysicalSlot::Weapon(hand, SubSlot::Secondary) => self.hand(hand).secondary,
            PhysicalSlot::Armor(ArmorLocation::Head) => self.armor.head,
            PhysicalSlot::Armor(ArmorLocation::Body) => self.armor.body,
            PhysicalSlot::Armor(ArmorLocation::Arms) => self.armor.arms,
            PhysicalSlot::Armor(ArmorLocation::Legs) => self.armor.legs,
            PhysicalSlot::Ring(ring) => self.rings[ring.index()],
        }
    }

    fn slot_mut(&mut self, slot: PhysicalSlot) -> &mut i32 {
        match slot {
            PhysicalSlot::Weapon(hand, SubSlot::Primary) => &mut self.hand_mut(hand).primary,
            PhysicalSlot::Weapon(hand, SubSlot::Secondary) => &mut self.hand_mut(hand).secondary,
            PhysicalSlot::Armor(ArmorLocation::Head) => &mut self.armor.head,
            PhysicalSlot::Armor(ArmorLocation::Body) => &mut self.armor.body,
            PhysicalSlot::Armor(ArmorLocation::Arms) => &mut self.armor.arms,
            PhysicalSlot::Armor(ArmorLocation::Legs) => &mut self.armor.legs,
            PhysicalSlot::Ring(ring) => &mut self.rings[ring.index()],
        }
    }

    /// Currently equipped sub-slot of `hand`.
    #[must_use]
    pub const fn equipped(&self, hand: Hand) -> SubSlot {
        self.hand(hand).equipped
    }
}

impl WorldSnapshot {
    /// Parses a snapshot from YAML (or JSON) text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not deserialize or lists the same
    /// player index twice.
    pub fn from_yaml(content: &str) -> Result<Self, EquipSwapError> {
        let snapshot: Self = serde_yaml::from_str(content)?;
        let mut seen = HashSet::new();
        for player in &snapshot.players {
            if !seen.insert(player.index) {
                return Err(ConfigError::InvalidValue {
                    field: "players".to_string(),
                    value: player.index.to_string(),
                    expected: "unique player indices".to_string(),
                }
                .into());
            }
        }
        Ok(snapshot)
    }

    /// Reads and parses a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, EquipSwapError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    #[must_use]
    pub fn player(&self, index: PlayerIndex) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.index == index)
    }

    fn player_mut(&mut self, index: PlayerIndex) -> Option<&mut PlayerSnapshot> {
        self.players.iter_mut().find(|p| p.index == index)
    }
}

// ============================================================================
// Shared world
// ============================================================================

#[derive(Debug)]
struct WorldState {
    snapshot: WorldSnapshot,
    generation: u64,
    terminated: bool,
    attachable: bool,
    failing_writes: HashSet<(PlayerIndex, PhysicalSlot)>,
    failing_effects: HashSet<PlayerIndex>,
    write_count: u64,
}

/// Controller for an in-memory world shared with every hook it hands out.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    state: Arc<Mutex<WorldState>>,
}

impl MemoryWorld {
    /// Creates a world that accepts connections immediately.
    #[must_use]
    pub fn new(snapshot: WorldSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorldState {
                snapshot,
                generation: 0,
                terminated: false,
                attachable: true,
                failing_writes: HashSet::new(),
                failing_effects: HashSet::new(),
                write_count: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a connector attaching to this world.
    #[must_use]
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            world: self.clone(),
        }
    }

    /// Copy of the current world state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        self.lock().snapshot.clone()
    }

    /// Identifier at `slot` for `player`, if that player exists.
    #[must_use]
    pub fn slot(&self, player: PlayerIndex, slot: PhysicalSlot) -> Option<i32> {
        self.lock().snapshot.player(player).map(|p| p.slot(slot))
    }

    /// Overwrites a slot directly, as the game itself would.
    pub fn set_slot(&self, player: PlayerIndex, slot: PhysicalSlot, id: i32) {
        if let Some(p) = self.lock().snapshot.player_mut(player) {
            *p.slot_mut(slot) = id;
        }
    }

    /// Switches the equipped sub-slot of a hand.
    pub fn set_equipped(&self, player: PlayerIndex, hand: Hand, sub: SubSlot) {
        if let Some(p) = self.lock().snapshot.player_mut(player) {
            p.hand_mut(hand).equipped = sub;
        }
    }

    /// Replaces the active effect set of a player.
    pub fn set_effects(&self, player: PlayerIndex, effects: impl IntoIterator<Item = i32>) {
        if let Some(p) = self.lock().snapshot.player_mut(player) {
            p.effects = effects.into_iter().collect();
        }
    }

    pub fn set_world_loaded(&self, loaded: bool) {
        self.lock().snapshot.world_loaded = loaded;
    }

    /// Adds a player, replacing any existing one with the same index.
    pub fn insert_player(&self, player: PlayerSnapshot) {
        let mut state = self.lock();
        state.snapshot.players.retain(|p| p.index != player.index);
        state.snapshot.players.push(player);
    }

    pub fn remove_player(&self, index: PlayerIndex) {
        self.lock().snapshot.players.retain(|p| p.index != index);
    }

    /// Makes every subsequent write to `slot` of `player` fail.
    pub fn fail_writes(&self, player: PlayerIndex, slot: PhysicalSlot) {
        self.lock().failing_writes.insert((player, slot));
    }

    pub fn clear_write_failures(&self) {
        self.lock().failing_writes.clear();
    }

    /// Makes reading the active effects of `player` fail until cleared.
    pub fn fail_effect_reads(&self, player: PlayerIndex, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing_effects.insert(player);
        } else {
            state.failing_effects.remove(&player);
        }
    }

    /// Invalidates every hook handed out so far.
    pub fn drop_handle(&self) {
        self.lock().generation += 1;
    }

    /// Marks the target process as exited.
    pub fn terminate(&self) {
        self.lock().terminated = true;
    }

    /// Controls whether the connector can attach.
    pub fn set_attachable(&self, attachable: bool) {
        self.lock().attachable = attachable;
    }

    /// Number of successful writes performed through hooks.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.lock().write_count
    }
}

// ============================================================================
// Connector and hook
// ============================================================================

/// [`HookConnector`] for a [`MemoryWorld`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    world: MemoryWorld,
}

impl HookConnector for MemoryConnector {
    fn try_connect(&mut self) -> Option<Box<dyn GameHook>> {
        let mut state = self.world.lock();
        if !state.attachable {
            return None;
        }
        state.generation += 1;
        state.terminated = false;
        Some(Box::new(MemoryHook {
            world: self.world.clone(),
            generation: state.generation,
        }))
    }
}

/// [`GameHook`] bound to one attach generation of a [`MemoryWorld`].
#[derive(Debug)]
pub struct MemoryHook {
    world: MemoryWorld,
    generation: u64,
}

const HANDLE_INDEX_BITS: u32 = 8;

impl MemoryHook {
    const fn entity_handle(&self, index: PlayerIndex) -> u64 {
        (self.generation << HANDLE_INDEX_BITS) | index.get() as u64
    }

    fn with_player<T>(
        &self,
        entity: &EntityHandle,
        f: impl FnOnce(&mut WorldState, PlayerIndex) -> Result<T, HookError>,
    ) -> Result<T, HookError> {
        let mut state = self.world.lock();
        let unavailable = HookError::EntityUnavailable {
            player: entity.index.get(),
        };
        if state.generation != self.generation
            || entity.handle >> HANDLE_INDEX_BITS != self.generation
            || state.snapshot.player(entity.index).is_none()
        {
            return Err(unavailable);
        }
        f(&mut state, entity.index)
    }
}

impl GameHook for MemoryHook {
    fn is_handle_valid(&self) -> bool {
        self.world.lock().generation == self.generation
    }

    fn is_terminated(&self) -> bool {
        self.world.lock().terminated
    }

    fn is_world_loaded(&self) -> bool {
        self.world.lock().snapshot.world_loaded
    }

    fn discover_entities(&self) -> Vec<EntityHandle> {
        let state = self.world.lock();
        if !state.snapshot.world_loaded {
            return Vec::new();
        }
        let mut indices: Vec<PlayerIndex> = state.snapshot.players.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|index| EntityHandle {
                index,
                handle: self.entity_handle(index),
            })
            .collect()
    }

    fn read_slot_id(&self, entity: &EntityHandle, slot: PhysicalSlot) -> Result<i32, HookError> {
        self.with_player(entity, |state, index| {
            state
                .snapshot
                .player(index)
                .map(|p| p.slot(slot))
                .ok_or(HookError::ReadFailed {
                    player: index.get(),
                    slot,
                    reason: "player vanished".to_string(),
                })
        })
    }

    fn write_slot_id(
        &self,
        entity: &EntityHandle,
        slot: PhysicalSlot,
        id: i32,
    ) -> Result<(), HookError> {
        self.with_player(entity, |state, index| {
            if state.failing_writes.contains(&(index, slot)) {
                return Err(HookError::WriteFailed {
                    player: index.get(),
                    slot,
                    value: id,
                    reason: "injected write failure".to_string(),
                });
            }
            let player = state.snapshot.player_mut(index).ok_or(HookError::WriteFailed {
                player: index.get(),
                slot,
                value: id,
                reason: "player vanished".to_string(),
            })?;
            *player.slot_mut(slot) = id;
            state.write_count += 1;
            Ok(())
        })
    }

    fn current_sub_slot(&self, entity: &EntityHandle, hand: Hand) -> Result<SubSlot, HookError> {
        self.with_player(entity, |state, index| {
            state
                .snapshot
                .player(index)
                .map(|p| p.equipped(hand))
                .ok_or(HookError::EntityUnavailable {
                    player: index.get(),
                })
        })
    }

    fn active_effects(&self, entity: &EntityHandle) -> Result<BTreeSet<i32>, HookError> {
        self.with_player(entity, |state, index| {
            if state.failing_effects.contains(&index) {
                return Err(HookError::EffectsUnreadable {
                    player: index.get(),
                    reason: "injected read failure".to_string(),
                });
            }
            state
                .snapshot
                .player(index)
                .map(|p| p.effects.clone())
                .ok_or(HookError::EntityUnavailable {
                    player: index.get(),
                })
        })
    }
}
