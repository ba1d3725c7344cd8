//! Trigger matching
//!
//! [`evaluate`] runs one trigger against one entity for the current tick.
//! Effect and cooldown gates are checked once, then every applicable
//! position is matched independently. A write failure on one position
//! leaves cooldown and ledger untouched for that position and the rule
//! moves on to the next one.

use std::collections::BTreeSet;

use super::adapter::SlotAdapter;
use super::cooldown::CooldownBank;
use super::ledger::{SwapLedger, TempSwap};
use super::slot::PhysicalSlot;
use super::trigger::{EquipCategory, SwapTrigger, TriggerId};
use crate::error::HookError;

/// One successful rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedSwap {
    pub slot: PhysicalSlot,
    pub from: i32,
    pub to: i32,
    pub permanent: bool,
    /// Ledger entry silently replaced by this swap, if any
    pub replaced: Option<TempSwap>,
}

/// Result of evaluating one trigger for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The required effect is not active
    EffectInactive,

    /// The trigger is still cooling down for this entity
    CoolingDown {
        remaining_ms: u64,
    },

    /// Every applicable position was examined
    Evaluated {
        applied: Vec<AppliedSwap>,
        failures: Vec<HookError>,
    },
}

impl MatchOutcome {
    /// Successful rewrites, empty when gated.
    #[must_use]
    pub fn applied(&self) -> &[AppliedSwap] {
        match self {
            Self::Evaluated { applied, .. } => applied,
            Self::EffectInactive | Self::CoolingDown { .. } => &[],
        }
    }

    /// Recoverable failures, empty when gated.
    #[must_use]
    pub fn failures(&self) -> &[HookError] {
        match self {
            Self::Evaluated { failures, .. } => failures,
            Self::EffectInactive | Self::CoolingDown { .. } => &[],
        }
    }
}

/// Mutable per-entity state a trigger evaluation may touch.
#[derive(Debug)]
pub struct MatchState<'s> {
    pub cooldowns: &'s mut CooldownBank,
    pub ledger: &'s mut SwapLedger,
    /// Cooldown applied after an effect-conditioned trigger fires
    pub cooldown_ms: u64,
}

/// Whether a trigger only acts on the equipped weapon sub-slot.
///
/// Effect-conditioned weapon rules never touch the inactive loadout. Id-only
/// weapon rules examine both sub-slots.
#[must_use]
pub const fn equipped_only(trigger: &SwapTrigger) -> bool {
    matches!(trigger.category(), EquipCategory::Weapon) && trigger.is_effect_conditioned()
}

/// Evaluates `trigger` against the entity behind `adapter`.
pub fn evaluate(
    id: TriggerId,
    trigger: &SwapTrigger,
    adapter: &SlotAdapter<'_>,
    effects: &BTreeSet<i32>,
    state: &mut MatchState<'_>,
) -> MatchOutcome {
    let player = adapter.player();

    if let Some(effect) = trigger.effect_condition() {
        if !effects.contains(&effect) {
            return MatchOutcome::EffectInactive;
        }
        let remaining_ms = state.cooldowns.remaining(id, player);
        if remaining_ms > 0 {
            return MatchOutcome::CoolingDown { remaining_ms };
        }
    }

    let mut applied = Vec::new();
    let mut failures = Vec::new();

    let positions = match adapter.positions(trigger.target(), equipped_only(trigger)) {
        Ok(positions) => positions,
        Err(e) => {
            failures.push(e);
            return MatchOutcome::Evaluated { applied, failures };
        }
    };

    for slot in positions {
        let current = match adapter.read(slot) {
            Ok(current) => current,
            Err(e) => {
                failures.push(e);
                continue;
            }
        };
        if !trigger.matches_id(current) {
            continue;
        }
        let Some(next) = trigger.apply(current) else {
            tracing::warn!(
                trigger = %id,
                player = %player,
                %slot,
                current,
                delta = trigger.id_delta(),
                "identifier overflow, trigger skipped"
            );
            continue;
        };
        if let Err(e) = adapter.write(slot, next) {
            failures.push(e);
            continue;
        }

        if trigger.is_effect_conditioned() {
            state.cooldowns.reset(id, player, state.cooldown_ms);
        }
        let replaced = if trigger.is_permanent() {
            None
        } else {
            state.ledger.set(TempSwap {
                source_id: current,
                dest_id: next,
                slot,
            })
        };
        applied.push(AppliedSwap {
            slot,
            from: current,
            to: next,
            permanent: trigger.is_permanent(),
            replaced,
        });
    }

    MatchOutcome::Evaluated { applied, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::memory::{MemoryWorld, PlayerSnapshot};
    use crate::hook::{GameHook, HookConnector, WorldSnapshot};
    use crate::swap::slot::{ArmorLocation, Hand, LogicalSlot, PlayerIndex, RingSlot, SubSlot};
    use crate::swap::trigger::TriggerTarget;

    const COOLDOWN: u64 = 500;

    fn p0() -> PlayerIndex {
        PlayerIndex::new(0).unwrap()
    }

    fn setup(configure: impl FnOnce(&mut PlayerSnapshot)) -> (MemoryWorld, Box<dyn GameHook>) {
        let mut player = PlayerSnapshot::new(p0());
        configure(&mut player);
        let world = MemoryWorld::new(WorldSnapshot {
            world_loaded: true,
            players: vec![player],
        });
        let hook = world.connector().try_connect().unwrap();
        (world, hook)
    }

    fn run(
        hook: &dyn GameHook,
        trigger: &SwapTrigger,
        cooldowns: &mut CooldownBank,
        ledger: &mut SwapLedger,
    ) -> MatchOutcome {
        let entity = hook.discover_entities()[0];
        let adapter = SlotAdapter::new(hook, entity);
        let effects = adapter.active_effects().unwrap();
        let mut state = MatchState {
            cooldowns,
            ledger,
            cooldown_ms: COOLDOWN,
        };
        evaluate(TriggerId(0), trigger, &adapter, &effects, &mut state)
    }

    #[test]
    fn temporary_id_rule_matches_unequipped_sub_slot() {
        let (world, hook) = setup(|p| {
            p.weapons.left.primary = 500;
            p.weapons.left.secondary = 1000;
        });
        let trigger =
            SwapTrigger::new(TriggerTarget::Weapon(Hand::Left), None, Some(1000), 1, false)
                .unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(outcome.applied().len(), 1);
        let primary = PhysicalSlot::Weapon(Hand::Left, SubSlot::Primary);
        let secondary = PhysicalSlot::Weapon(Hand::Left, SubSlot::Secondary);
        assert_eq!(world.slot(p0(), primary), Some(500));
        assert_eq!(world.slot(p0(), secondary), Some(1001));
        assert_eq!(
            ledger.get(LogicalSlot::Weapon(Hand::Left)),
            Some(&TempSwap {
                source_id: 1000,
                dest_id: 1001,
                slot: secondary
            })
        );
        // Id-only rules never touch the cooldown bank.
        assert!(cooldowns.is_ready(TriggerId(0), p0()));
    }

    #[test]
    fn both_sub_slots_match_and_last_write_wins() {
        let (world, hook) = setup(|p| {
            p.weapons.right.primary = 7;
            p.weapons.right.secondary = 7;
        });
        let trigger =
            SwapTrigger::new(TriggerTarget::Weapon(Hand::Right), None, Some(7), 3, false).unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        let primary = PhysicalSlot::Weapon(Hand::Right, SubSlot::Primary);
        let secondary = PhysicalSlot::Weapon(Hand::Right, SubSlot::Secondary);
        assert_eq!(outcome.applied().len(), 2);
        assert_eq!(world.slot(p0(), primary), Some(10));
        assert_eq!(world.slot(p0(), secondary), Some(10));

        let first = TempSwap {
            source_id: 7,
            dest_id: 10,
            slot: primary,
        };
        assert_eq!(outcome.applied()[1].replaced, Some(first));
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.get(LogicalSlot::Weapon(Hand::Right)).map(|swap| swap.slot),
            Some(secondary)
        );
    }

    #[test]
    fn effect_weapon_rule_hits_equipped_sub_slot_only() {
        let (world, hook) = setup(|p| {
            p.weapons.left.primary = 1000;
            p.weapons.left.secondary = 1000;
            p.effects.insert(42);
        });
        let trigger =
            SwapTrigger::new(TriggerTarget::Weapon(Hand::Left), Some(42), Some(1000), 1, true)
                .unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(outcome.applied().len(), 1);
        assert_eq!(world.slot(p0(), PhysicalSlot::Weapon(Hand::Left, SubSlot::Primary)), Some(1001));
        assert_eq!(world.slot(p0(), PhysicalSlot::Weapon(Hand::Left, SubSlot::Secondary)), Some(1000));
        assert!(ledger.is_empty());
    }

    #[test]
    fn effect_gate_and_cooldown() {
        let (world, hook) = setup(|p| {
            p.armor.head = 50;
            p.effects.insert(1234);
        });
        let trigger = SwapTrigger::new(
            TriggerTarget::Armor(ArmorLocation::Head),
            Some(1234),
            None,
            1,
            false,
        )
        .unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let first = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(first.applied().len(), 1);
        assert_eq!(cooldowns.remaining(TriggerId(0), p0()), COOLDOWN);

        let second = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(second, MatchOutcome::CoolingDown { remaining_ms: COOLDOWN });
        assert_eq!(world.slot(p0(), PhysicalSlot::Armor(ArmorLocation::Head)), Some(51));

        world.set_effects(p0(), []);
        cooldowns.decrement_all(COOLDOWN);
        assert_eq!(
            run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger),
            MatchOutcome::EffectInactive
        );
    }

    #[test]
    fn ring_rule_covers_both_positions() {
        let (world, hook) = setup(|p| p.rings = [100, 100]);
        let trigger = SwapTrigger::new(TriggerTarget::Ring, None, Some(100), -1, false).unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(outcome.applied().len(), 2);
        assert_eq!(world.slot(p0(), PhysicalSlot::Ring(RingSlot::Second)), Some(99));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn write_failure_leaves_state_untouched() {
        let (world, hook) = setup(|p| {
            p.rings = [100, 200];
            p.effects.insert(9);
        });
        world.fail_writes(p0(), PhysicalSlot::Ring(RingSlot::First));
        world.fail_writes(p0(), PhysicalSlot::Ring(RingSlot::Second));
        let trigger = SwapTrigger::new(TriggerTarget::Ring, Some(9), None, 5, false).unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert!(outcome.applied().is_empty());
        assert_eq!(outcome.failures().len(), 2);
        assert!(ledger.is_empty());
        assert!(cooldowns.is_ready(TriggerId(0), p0()));
    }

    #[test]
    fn partial_failure_still_records_successful_position() {
        let (world, hook) = setup(|p| p.rings = [100, 100]);
        world.fail_writes(p0(), PhysicalSlot::Ring(RingSlot::First));
        let trigger = SwapTrigger::new(TriggerTarget::Ring, None, Some(100), 1, false).unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert_eq!(outcome.applied().len(), 1);
        assert_eq!(outcome.failures().len(), 1);
        assert!(!ledger.has(LogicalSlot::Ring(RingSlot::First)));
        assert!(ledger.has(LogicalSlot::Ring(RingSlot::Second)));
    }

    #[test]
    fn overflow_is_skipped() {
        let (world, hook) = setup(|p| p.armor.legs = i32::MAX);
        let trigger =
            SwapTrigger::new(TriggerTarget::Armor(ArmorLocation::Legs), None, Some(i32::MAX), 1, true)
                .unwrap();
        let mut cooldowns = CooldownBank::new(1);
        let mut ledger = SwapLedger::new();

        let outcome = run(hook.as_ref(), &trigger, &mut cooldowns, &mut ledger);
        assert!(outcome.applied().is_empty());
        assert_eq!(world.write_count(), 0);
    }

    #[test]
    fn equipped_only_classification() {
        let weapon = |effect, permanent| {
            SwapTrigger::new(TriggerTarget::Weapon(Hand::Left), effect, Some(1), 1, permanent)
                .unwrap()
        };
        assert!(equipped_only(&weapon(Some(5), true)));
        assert!(equipped_only(&weapon(Some(5), false)));
        assert!(!equipped_only(&weapon(None, false)));
        assert!(!equipped_only(&weapon(None, true)));
        let ring = SwapTrigger::new(TriggerTarget::Ring, Some(5), None, 1, false).unwrap();
        assert!(!equipped_only(&ring));
    }
}
