//! Per-tick swap orchestration
//!
//! [`SwapEngine`] owns the trigger list, the cooldown bank and one ledger
//! per player. It has no notion of time or process state; the monitor calls
//! [`SwapEngine::tick`] once per interval while the world is loaded and
//! [`SwapEngine::request_forced_revert`] on every unloaded to loaded edge.
//!
//! Per tick: discover entities, run a pending forced revert, then for each
//! entity in discovery order revert expired weapon swaps, refresh effects
//! and evaluate every trigger in load order. Cooldowns advance once at the
//! end of the tick.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use super::adapter::SlotAdapter;
use super::cooldown::CooldownBank;
use super::ledger::{RevertMode, SwapLedger, TempSwap, revert_slot};
use super::matcher::{MatchOutcome, MatchState, evaluate};
use super::slot::{Hand, LogicalSlot, MAX_PLAYERS, PlayerIndex};
use super::trigger::{SwapTrigger, TriggerId};
use crate::error::SwapError;
use crate::hook::{EntityHandle, GameHook};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};

/// Timing parameters the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Milliseconds between ticks; cooldowns advance by this much per tick
    pub tick_ms: u64,
    /// Cooldown applied after an effect-conditioned trigger fires
    pub cooldown_ms: u64,
}

/// Counters for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub entities: usize,
    pub applied: usize,
    pub reverted: usize,
    pub failures: usize,
}

/// Outcome of a forced revert pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForcedRevertSummary {
    pub reverted: usize,
    pub failed: usize,
    /// Entries discarded because their player was not present
    pub dropped: usize,
}

/// The trigger and temporary swap engine.
#[derive(Debug)]
pub struct SwapEngine {
    triggers: Vec<SwapTrigger>,
    cooldowns: CooldownBank,
    ledgers: [SwapLedger; MAX_PLAYERS],
    timing: EngineTiming,
    forced_revert_pending: bool,
    events: Arc<EventEmitter>,
}

impl SwapEngine {
    #[must_use]
    pub fn new(triggers: Vec<SwapTrigger>, timing: EngineTiming, events: Arc<EventEmitter>) -> Self {
        let cooldowns = CooldownBank::new(triggers.len());
        Self {
            triggers,
            cooldowns,
            ledgers: Default::default(),
            timing,
            forced_revert_pending: false,
            events,
        }
    }

    #[must_use]
    pub fn triggers(&self) -> &[SwapTrigger] {
        &self.triggers
    }

    #[must_use]
    pub const fn cooldowns(&self) -> &CooldownBank {
        &self.cooldowns
    }

    #[must_use]
    pub const fn ledger(&self, player: PlayerIndex) -> &SwapLedger {
        &self.ledgers[player.get()]
    }

    /// Total temporary swaps pending across all players.
    #[must_use]
    pub fn active_swaps(&self) -> usize {
        self.ledgers.iter().map(SwapLedger::len).sum()
    }

    /// Schedules a forced revert for the next tick that finds a player.
    pub const fn request_forced_revert(&mut self) {
        self.forced_revert_pending = true;
    }

    #[must_use]
    pub const fn forced_revert_pending(&self) -> bool {
        self.forced_revert_pending
    }

    /// Runs one tick against `hook`.
    pub fn tick(&mut self, hook: &dyn GameHook) -> TickReport {
        let entities = hook.discover_entities();
        metrics::set_entities_tracked(entities.len());

        let mut report = TickReport {
            entities: entities.len(),
            ..TickReport::default()
        };

        if self.forced_revert_pending && !entities.is_empty() {
            let summary = self.force_revert(hook, &entities);
            report.reverted += summary.reverted;
            report.failures += summary.failed;
        }

        for entity in &entities {
            self.process_entity(hook, *entity, &mut report);
        }

        self.cooldowns.decrement_all(self.timing.tick_ms);
        metrics::record_tick();
        report
    }

    /// Reverts every pending temporary swap of every player now.
    ///
    /// Entries are cleared whether or not their revert succeeds. Entries of
    /// players the hook does not currently report are dropped.
    pub fn force_revert_all(&mut self, hook: &dyn GameHook) -> ForcedRevertSummary {
        let entities = hook.discover_entities();
        self.force_revert(hook, &entities)
    }

    fn force_revert(&mut self, hook: &dyn GameHook, entities: &[EntityHandle]) -> ForcedRevertSummary {
        self.forced_revert_pending = false;
        let mut summary = ForcedRevertSummary::default();

        if self.active_swaps() == 0 {
            tracing::info!("no temporary swaps to force-revert");
        }

        let events = &self.events;
        for player in PlayerIndex::all() {
            let ledger = &mut self.ledgers[player.get()];
            if ledger.is_empty() {
                continue;
            }
            let Some(entity) = entities.iter().find(|e| e.index == player) else {
                let dropped = ledger.len();
                *ledger = SwapLedger::new();
                tracing::warn!(
                    player = %player,
                    dropped,
                    "player not present during forced revert, dropping its temporary swaps"
                );
                summary.dropped += dropped;
                continue;
            };

            let adapter = SlotAdapter::new(hook, *entity);
            for slot in LogicalSlot::ALL {
                let Some(swap) = ledger.get(slot).copied() else {
                    continue;
                };
                let result = revert_slot(&adapter, ledger, slot, RevertMode::Forced);
                if result.is_ok() {
                    summary.reverted += 1;
                } else {
                    summary.failed += 1;
                }
                report_revert(events, player, &swap, RevertMode::Forced, &result, false);
            }
        }

        if summary != ForcedRevertSummary::default() {
            tracing::info!(
                reverted = summary.reverted,
                failed = summary.failed,
                dropped = summary.dropped,
                "forced revert complete"
            );
        }
        self.events.emit(Event::ForcedRevert {
            timestamp: Utc::now(),
            reverted: summary.reverted,
            failed: summary.failed,
            dropped: summary.dropped,
        });
        summary
    }

    fn process_entity(&mut self, hook: &dyn GameHook, entity: EntityHandle, report: &mut TickReport) {
        let player = entity.index;
        let adapter = SlotAdapter::new(hook, entity);

        let ledger = &mut self.ledgers[player.get()];
        reconcile_weapons(&adapter, ledger, &self.events, report);

        let effects: BTreeSet<i32> = match adapter.active_effects() {
            Ok(effects) => effects,
            Err(e) => {
                tracing::warn!(player = %player, error = %e, "cannot read active effects, skipping triggers");
                metrics::record_swap_error(e.kind());
                report.failures += 1;
                return;
            }
        };

        let mut state = MatchState {
            cooldowns: &mut self.cooldowns,
            ledger,
            cooldown_ms: self.timing.cooldown_ms,
        };
        for (index, trigger) in self.triggers.iter().enumerate() {
            let id = TriggerId(index);
            let outcome = evaluate(id, trigger, &adapter, &effects, &mut state);
            record_outcome(&self.events, player, id, trigger, &outcome, report);
        }
    }
}

/// Reverts weapon swaps whose sub-slot is no longer equipped.
fn reconcile_weapons(
    adapter: &SlotAdapter<'_>,
    ledger: &mut SwapLedger,
    events: &EventEmitter,
    report: &mut TickReport,
) {
    let player = adapter.player();
    for hand in Hand::ALL {
        let slot = LogicalSlot::Weapon(hand);
        if !ledger.has(slot) {
            continue;
        }
        let equipped = match adapter.equipped(hand) {
            Ok(equipped) => equipped,
            Err(e) => {
                tracing::warn!(player = %player, hand = hand.as_str(), error = %e, "cannot read equipped weapon slot");
                metrics::record_swap_error(e.kind());
                report.failures += 1;
                continue;
            }
        };
        let Some(swap) = ledger.expired(hand, equipped).copied() else {
            continue;
        };

        let result = revert_slot(adapter, ledger, slot, RevertMode::Expired);
        if result.is_ok() {
            report.reverted += 1;
        } else {
            report.failures += 1;
        }
        report_revert(events, player, &swap, RevertMode::Expired, &result, ledger.has(slot));
    }
}

fn report_revert(
    events: &EventEmitter,
    player: PlayerIndex,
    swap: &TempSwap,
    mode: RevertMode,
    result: &Result<TempSwap, SwapError>,
    retained: bool,
) {
    match result {
        Ok(_) => {
            tracing::info!(
                player = %player,
                slot = %swap.slot,
                from = swap.dest_id,
                to = swap.source_id,
                reason = mode.as_str(),
                "temporary swap reverted"
            );
            metrics::record_swap_reverted(swap.slot.category(), mode);
            events.emit(Event::SwapReverted {
                timestamp: Utc::now(),
                player,
                slot: swap.slot,
                from: swap.dest_id,
                to: swap.source_id,
                reason: mode,
            });
        }
        Err(e) => {
            if retained {
                tracing::warn!(player = %player, slot = %swap.slot, error = %e, "revert failed, will retry");
            } else {
                tracing::warn!(
                    player = %player,
                    slot = %swap.slot,
                    error = %e,
                    "revert failed, temporary swap discarded; slot may keep id {}",
                    swap.dest_id
                );
            }
            metrics::record_swap_error("revert");
            events.emit(Event::RevertFailed {
                timestamp: Utc::now(),
                player,
                slot: swap.slot,
                reason: mode,
                retained,
                error: e.to_string(),
            });
        }
    }
}

fn record_outcome(
    events: &EventEmitter,
    player: PlayerIndex,
    id: TriggerId,
    trigger: &SwapTrigger,
    outcome: &MatchOutcome,
    report: &mut TickReport,
) {
    if let MatchOutcome::CoolingDown { remaining_ms } = outcome {
        tracing::trace!(player = %player, trigger = %id, remaining_ms, "trigger cooling down");
    }

    for swap in outcome.applied() {
        tracing::info!(
            player = %player,
            trigger = %id,
            slot = %swap.slot,
            from = swap.from,
            to = swap.to,
            permanent = swap.permanent,
            "swap applied"
        );
        if let Some(replaced) = swap.replaced {
            tracing::debug!(
                player = %player,
                slot = %replaced.slot,
                source_id = replaced.source_id,
                dest_id = replaced.dest_id,
                "pending temporary swap replaced without revert"
            );
        }
        metrics::record_swap_applied(trigger.category());
        events.emit(Event::SwapApplied {
            timestamp: Utc::now(),
            player,
            trigger: id,
            slot: swap.slot,
            from: swap.from,
            to: swap.to,
            permanent: swap.permanent,
        });
        report.applied += 1;
    }

    for e in outcome.failures() {
        tracing::warn!(player = %player, trigger = %id, error = %e, "trigger failed");
        metrics::record_swap_error(e.kind());
        report.failures += 1;
    }
}
