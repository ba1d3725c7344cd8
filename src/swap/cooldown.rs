//! Per-trigger, per-player cooldown timers
//!
//! Only effect-conditioned triggers consult the bank. Counters are
//! decremented by the tick interval once per tick and floor at zero.

use super::slot::{MAX_PLAYERS, PlayerIndex};
use super::trigger::TriggerId;

/// Countdown timers keyed by `(trigger, player)`, in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct CooldownBank {
    remaining: Vec<[u64; MAX_PLAYERS]>,
}

impl CooldownBank {
    /// Creates a bank with a zeroed counter for every player of every trigger.
    #[must_use]
    pub fn new(trigger_count: usize) -> Self {
        Self {
            remaining: vec![[0; MAX_PLAYERS]; trigger_count],
        }
    }

    /// Number of triggers tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Remaining cooldown in milliseconds. Unknown triggers report zero.
    #[must_use]
    pub fn remaining(&self, trigger: TriggerId, player: PlayerIndex) -> u64 {
        self.remaining
            .get(trigger.0)
            .map_or(0, |per_player| per_player[player.get()])
    }

    /// Returns true when the trigger may be evaluated for `player`.
    #[must_use]
    pub fn is_ready(&self, trigger: TriggerId, player: PlayerIndex) -> bool {
        self.remaining(trigger, player) == 0
    }

    /// Restarts the cooldown for one player of one trigger.
    pub fn reset(&mut self, trigger: TriggerId, player: PlayerIndex, duration_ms: u64) {
        if let Some(per_player) = self.remaining.get_mut(trigger.0) {
            per_player[player.get()] = duration_ms;
        } else {
            tracing::error!(%trigger, "cooldown reset for unknown trigger");
        }
    }

    /// Advances every counter by `elapsed_ms`, flooring at zero.
    pub fn decrement_all(&mut self, elapsed_ms: u64) {
        for per_player in &mut self.remaining {
            for counter in per_player.iter_mut() {
                *counter = counter.saturating_sub(elapsed_ms);
            }
        }
    }
}
