//! Monitor loop
//!
//! [`Monitor`] drives a [`SwapEngine`] through the attach and world-load
//! lifecycle of the target:
//!
//! ```text
//! Searching ──acquire──▶ WorldLoaded ◀──load edge (forced revert)── WorldNotLoaded
//!     ▲                      │                                         ▲
//!     └──── handle lost ─────┴──────────────── unload ─────────────────┘
//! ```
//!
//! Every wait goes through [`sleep_or_cancel`], so a stop request is seen
//! within one interval. Ticks themselves are never interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::schema::{MonitorSettings, SwapConfig};
use crate::error::MonitorError;
use crate::hook::{GameHook, HookConnector};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::swap::engine::SwapEngine;

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// No target attached
    Searching,
    /// Attached, waiting on a load screen or the title menu
    WorldNotLoaded,
    /// Attached and in game; the only state in which triggers run
    WorldLoaded,
}

impl MonitorState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::WorldNotLoaded => "world_not_loaded",
            Self::WorldLoaded => "world_loaded",
        }
    }
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The cancellation token fired
    Cancelled,
    /// The configured cycle limit was reached
    CycleLimit,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::CycleLimit => "cycle_limit",
        }
    }
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    /// Engine ticks executed
    pub ticks: u64,
    /// Loop cycles, counting unloaded-world polls as well as ticks
    pub cycles: u64,
    /// Successful re-acquisitions after a lost handle
    pub reacquisitions: u64,
    /// Temporary swaps still recorded when the loop stopped
    pub pending_swaps: usize,
    pub reason: StopReason,
}

// ============================================================================
// Monitor
// ============================================================================

/// The monitor loop. Owns the engine and the attached hook.
pub struct Monitor {
    settings: MonitorSettings,
    engine: SwapEngine,
    connector: Box<dyn HookConnector>,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
    max_cycles: Option<u64>,
    state: MonitorState,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("max_cycles", &self.max_cycles)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Builds a monitor and its engine from a validated configuration.
    #[must_use]
    pub fn new(
        config: SwapConfig,
        connector: Box<dyn HookConnector>,
        events: Arc<EventEmitter>,
        cancel: CancellationToken,
    ) -> Self {
        let settings = config.settings;
        let engine = SwapEngine::new(config.triggers, settings.engine_timing(), Arc::clone(&events));
        Self {
            settings,
            engine,
            connector,
            events,
            cancel,
            max_cycles: None,
            state: MonitorState::Searching,
        }
    }

    /// Stops the loop after `cycles` ticks or unloaded-world polls.
    #[must_use]
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    #[must_use]
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    #[must_use]
    pub const fn engine(&self) -> &SwapEngine {
        &self.engine
    }

    /// Runs until cancelled or the cycle limit is reached.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AcquisitionTimeout`] if the target is not
    /// found within the configured search timeout. Losing the handle later
    /// is never an error; the loop searches again without a time limit.
    pub async fn run(mut self) -> Result<MonitorSummary, MonitorError> {
        self.events.emit(Event::MonitorStarted {
            timestamp: Utc::now(),
            trigger_count: self.engine.triggers().len(),
        });
        tracing::info!(
            triggers = self.engine.triggers().len(),
            interval_ms = self.settings.monitor_interval_ms,
            "monitor started"
        );

        let mut ticks = 0u64;
        let mut cycles = 0u64;
        let mut reacquisitions = 0u64;

        let timeout = self.settings.process_search_timeout_ms;
        let reason = 'run: {
            let Some(mut hook) = self.acquire(Some(timeout)).await? else {
                break 'run StopReason::Cancelled;
            };
            self.attached(false);

            loop {
                if self.cancel.is_cancelled() {
                    break 'run StopReason::Cancelled;
                }

                if !hook.is_alive() {
                    self.lost(hook.as_ref());
                    let Some(fresh) = self.acquire(None).await? else {
                        break 'run StopReason::Cancelled;
                    };
                    hook = fresh;
                    reacquisitions += 1;
                    metrics::record_hook_reacquisition();
                    self.attached(true);
                    continue;
                }

                let interval = if self.observe_world(hook.as_ref()) {
                    let report = self.engine.tick(hook.as_ref());
                    ticks += 1;
                    tracing::trace!(
                        tick = ticks,
                        entities = report.entities,
                        applied = report.applied,
                        reverted = report.reverted,
                        failures = report.failures,
                        "tick complete"
                    );
                    self.settings.monitor_interval_ms
                } else {
                    self.settings.game_loaded_interval_ms
                };

                cycles += 1;
                if self.max_cycles.is_some_and(|max| cycles >= max) {
                    break 'run StopReason::CycleLimit;
                }
                if !sleep_or_cancel(&self.cancel, interval).await {
                    break 'run StopReason::Cancelled;
                }
            }
        };

        let summary = MonitorSummary {
            ticks,
            cycles,
            reacquisitions,
            pending_swaps: self.engine.active_swaps(),
            reason,
        };
        tracing::info!(
            ticks,
            reacquisitions,
            pending_swaps = summary.pending_swaps,
            reason = reason.as_str(),
            "monitor stopped"
        );
        self.events.emit(Event::MonitorStopped {
            timestamp: Utc::now(),
            ticks,
            reason: reason.as_str().to_string(),
        });
        Ok(summary)
    }

    /// Polls the connector until it yields a hook.
    ///
    /// `Ok(None)` means the loop was cancelled while searching.
    async fn acquire(
        &mut self,
        timeout_ms: Option<u64>,
    ) -> Result<Option<Box<dyn GameHook>>, MonitorError> {
        self.state = MonitorState::Searching;
        let started = Instant::now();
        let interval = self.settings.process_search_interval_ms;
        tracing::info!(timeout_ms, "searching for target process");

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(hook) = self.connector.try_connect() {
                return Ok(Some(hook));
            }

            let mut wait = interval;
            if let Some(limit) = timeout_ms {
                let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                if elapsed >= limit {
                    tracing::error!(timeout_ms = limit, "target process not found");
                    return Err(MonitorError::AcquisitionTimeout { timeout_ms: limit });
                }
                wait = wait.min(limit - elapsed);
            }

            tracing::debug!(retry_in_ms = wait, "target process not found yet");
            if !sleep_or_cancel(&self.cancel, wait).await {
                return Ok(None);
            }
        }
    }

    /// A freshly attached hook is assumed to be in game.
    fn attached(&mut self, reacquired: bool) {
        self.state = MonitorState::WorldLoaded;
        if reacquired {
            tracing::info!(
                pending_swaps = self.engine.active_swaps(),
                "target process reacquired, keeping swap state"
            );
        } else {
            tracing::info!("target process acquired");
        }
        self.events.emit(Event::HookAcquired {
            timestamp: Utc::now(),
            reacquired,
        });
    }

    fn lost(&mut self, hook: &dyn GameHook) {
        let reason = if hook.is_terminated() {
            "target process exited"
        } else {
            "handle invalidated"
        };
        tracing::warn!(reason, state = self.state.as_str(), "lost target process");
        self.events.emit(Event::HookLost {
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
    }

    /// Tracks load edges. Returns whether the world is loaded.
    fn observe_world(&mut self, hook: &dyn GameHook) -> bool {
        let loaded = hook.is_world_loaded();
        match (self.state, loaded) {
            (MonitorState::WorldNotLoaded, true) => {
                tracing::info!("world loaded, scheduling forced revert");
                self.events.emit(Event::WorldLoaded {
                    timestamp: Utc::now(),
                });
                self.engine.request_forced_revert();
                self.state = MonitorState::WorldLoaded;
            }
            (MonitorState::WorldLoaded | MonitorState::Searching, false) => {
                tracing::info!("world not loaded, waiting");
                self.events.emit(Event::WorldUnloaded {
                    timestamp: Utc::now(),
                });
                self.state = MonitorState::WorldNotLoaded;
            }
            (MonitorState::Searching, true) => self.state = MonitorState::WorldLoaded,
            _ => {}
        }
        loaded
    }
}

/// Sleeps for `ms`, returning `false` if `cancel` fired first.
async fn sleep_or_cancel(cancel: &CancellationToken, ms: u64) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(Duration::from_millis(ms)) => true,
    }
}

// ============================================================================
// Background handle
// ============================================================================

/// A [`Monitor`] running on a background task.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<MonitorSummary, MonitorError>>,
}

impl MonitorHandle {
    /// Spawns `monitor` onto the current runtime.
    #[must_use]
    pub fn spawn(monitor: Monitor) -> Self {
        let cancel = monitor.cancel.clone();
        let task = tokio::spawn(monitor.run());
        Self { cancel, task }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Requests a stop and waits for the in-flight tick to finish.
    ///
    /// # Errors
    ///
    /// Returns the run's own error, or [`MonitorError::TaskFailed`] if the
    /// task panicked.
    pub async fn stop(self) -> Result<MonitorSummary, MonitorError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Waits for the loop to end on its own.
    ///
    /// # Errors
    ///
    /// Same as [`stop`](Self::stop).
    pub async fn join(self) -> Result<MonitorSummary, MonitorError> {
        self.task.await.map_err(|e| MonitorError::TaskFailed {
            reason: e.to_string(),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{MemoryWorld, PlayerSnapshot, WorldSnapshot};
    use crate::observability::events::tests::TestWriter;
    use crate::swap::slot::{Hand, PhysicalSlot, PlayerIndex, RingSlot, SubSlot};
    use crate::swap::trigger::{SwapTrigger, TriggerTarget};

    const LEFT_PRIMARY: PhysicalSlot = PhysicalSlot::Weapon(Hand::Left, SubSlot::Primary);
    const RING_0: PhysicalSlot = PhysicalSlot::Ring(RingSlot::First);

    fn p0() -> PlayerIndex {
        PlayerIndex::new(0).unwrap()
    }

    fn fast_settings() -> MonitorSettings {
        MonitorSettings {
            process_search_timeout_ms: 5_000,
            process_search_interval_ms: 5,
            monitor_interval_ms: 5,
            game_loaded_interval_ms: 5,
            sp_effect_trigger_cooldown_ms: 0,
        }
    }

    fn world_with_player() -> MemoryWorld {
        let mut player = PlayerSnapshot::new(p0());
        player.weapons.left.primary = 1000;
        player.rings = [5, 0];
        MemoryWorld::new(WorldSnapshot {
            world_loaded: true,
            players: vec![player],
        })
    }

    fn monitor(
        world: &MemoryWorld,
        settings: MonitorSettings,
        triggers: Vec<SwapTrigger>,
    ) -> (Monitor, CancellationToken, TestWriter) {
        let writer = TestWriter::default();
        let events = Arc::new(EventEmitter::new(Box::new(writer.clone())));
        let cancel = CancellationToken::new();
        let config = SwapConfig { settings, triggers };
        let monitor = Monitor::new(config, Box::new(world.connector()), events, cancel.clone());
        (monitor, cancel, writer)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn cancelled_token_cuts_sleep_short() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!tokio_test::block_on(sleep_or_cancel(&cancel, 60_000)));
        assert!(tokio_test::block_on(sleep_or_cancel(&CancellationToken::new(), 1)));
    }

    #[tokio::test]
    async fn initial_acquisition_timeout_is_fatal() {
        let world = world_with_player();
        world.set_attachable(false);
        let settings = MonitorSettings {
            process_search_timeout_ms: 30,
            ..fast_settings()
        };
        let (monitor, _, writer) = monitor(&world, settings, Vec::new());

        let err = monitor.run().await.unwrap_err();
        assert!(matches!(err, MonitorError::AcquisitionTimeout { timeout_ms: 30 }));
        assert_eq!(writer.types(), vec!["MonitorStarted"]);
    }

    #[tokio::test]
    async fn runs_ticks_until_cycle_limit() {
        let world = world_with_player();
        let trigger = SwapTrigger::new(TriggerTarget::Ring, None, Some(5), 1, true).unwrap();
        let (monitor, _, writer) = monitor(&world, fast_settings(), vec![trigger]);

        let summary = monitor.with_max_cycles(3).run().await.unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.reason, StopReason::CycleLimit);
        assert_eq!(summary.pending_swaps, 0);
        assert_eq!(world.slot(p0(), RING_0), Some(6));

        let types = writer.types();
        assert_eq!(types.first().map(String::as_str), Some("MonitorStarted"));
        assert!(types.contains(&"HookAcquired".to_string()));
        assert_eq!(types.iter().filter(|t| *t == "SwapApplied").count(), 1);
        assert_eq!(types.last().map(String::as_str), Some("MonitorStopped"));
    }

    #[tokio::test]
    async fn unloaded_world_is_polled_without_ticking() {
        let world = world_with_player();
        world.set_world_loaded(false);
        let trigger = SwapTrigger::new(TriggerTarget::Ring, None, Some(5), 1, true).unwrap();
        let (monitor, _, writer) = monitor(&world, fast_settings(), vec![trigger]);

        let summary = monitor.with_max_cycles(4).run().await.unwrap();
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.cycles, 4);
        assert_eq!(world.slot(p0(), RING_0), Some(5));
        assert_eq!(writer.types().iter().filter(|t| *t == "WorldUnloaded").count(), 1);
    }

    #[tokio::test]
    async fn stop_is_observed_while_searching() {
        let world = world_with_player();
        world.set_attachable(false);
        let settings = MonitorSettings {
            process_search_timeout_ms: 600_000,
            process_search_interval_ms: 60_000,
            ..fast_settings()
        };
        let (monitor, _, _) = monitor(&world, settings, Vec::new());

        let handle = MonitorHandle::spawn(monitor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let summary = tokio::time::timeout(Duration::from_secs(2), handle.stop())
            .await
            .expect("stop should not wait for the search interval")
            .unwrap();
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test]
    async fn stop_is_observed_between_ticks() {
        let world = world_with_player();
        let settings = MonitorSettings {
            monitor_interval_ms: 60_000,
            ..fast_settings()
        };
        let (monitor, cancel, _) = monitor(&world, settings, Vec::new());

        let handle = MonitorHandle::spawn(monitor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.ticks, 1);
    }

    #[tokio::test]
    async fn load_edge_forces_revert() {
        let world = world_with_player();
        world.set_effects(p0(), [77]);
        let trigger = SwapTrigger::new(
            TriggerTarget::Weapon(Hand::Left),
            Some(77),
            None,
            1,
            false,
        )
        .unwrap();
        let settings = MonitorSettings {
            sp_effect_trigger_cooldown_ms: 60_000,
            ..fast_settings()
        };
        let (monitor, _, writer) = monitor(&world, settings, vec![trigger]);
        let handle = MonitorHandle::spawn(monitor);

        wait_until(|| world.slot(p0(), LEFT_PRIMARY) == Some(1001)).await;
        world.set_effects(p0(), []);

        world.set_world_loaded(false);
        wait_until(|| writer.types().contains(&"WorldUnloaded".to_string())).await;
        world.set_world_loaded(true);
        wait_until(|| world.slot(p0(), LEFT_PRIMARY) == Some(1000)).await;

        let summary = handle.stop().await.unwrap();
        assert_eq!(summary.pending_swaps, 0);

        let events = writer.events();
        let forced: Vec<_> = events.iter().filter(|e| e["type"] == "ForcedRevert").collect();
        assert_eq!(forced.len(), 1);
        assert_eq!(forced[0]["reverted"], 1);
        assert!(
            events
                .iter()
                .any(|e| e["type"] == "SwapReverted" && e["reason"] == "forced")
        );
    }

    #[tokio::test]
    async fn lost_handle_is_reacquired_with_state_kept() {
        let world = world_with_player();
        let trigger = SwapTrigger::new(
            TriggerTarget::Weapon(Hand::Left),
            None,
            Some(1000),
            1,
            false,
        )
        .unwrap();
        let (monitor, _, writer) = monitor(&world, fast_settings(), vec![trigger]);
        let handle = MonitorHandle::spawn(monitor);

        wait_until(|| world.slot(p0(), LEFT_PRIMARY) == Some(1001)).await;
        world.terminate();
        wait_until(|| {
            writer
                .types()
                .iter()
                .filter(|t| *t == "HookAcquired")
                .count()
                >= 2
        })
        .await;

        let summary = handle.stop().await.unwrap();
        assert!(summary.reacquisitions >= 1);
        assert_eq!(summary.pending_swaps, 1);
        assert!(writer.types().contains(&"HookLost".to_string()));
        assert!(
            writer
                .events()
                .iter()
                .any(|e| e["type"] == "HookLost" && e["reason"] == "target process exited")
        );
    }
}
