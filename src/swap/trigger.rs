//! Swap trigger rules
//!
//! A [`SwapTrigger`] is immutable once loaded. Its per-player cooldown state
//! lives in the engine's [`CooldownBank`](super::cooldown::CooldownBank),
//! keyed by [`TriggerId`].

use serde::Serialize;
use thiserror::Error;

use super::slot::{ArmorLocation, Hand};

/// Equipment category a trigger operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipCategory {
    /// Weapons (two hands, two sub-slots each)
    Weapon,
    /// Armor (four locations)
    Armor,
    /// Rings (two positions)
    Ring,
}

impl EquipCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Ring => "ring",
        }
    }
}

/// Which slots a trigger list addresses.
///
/// Weapon and armor lists are bound to one hand or location; the ring list
/// covers both ring positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "category", content = "at", rename_all = "snake_case")]
pub enum TriggerTarget {
    /// One weapon hand
    Weapon(Hand),
    /// One armor location
    Armor(ArmorLocation),
    /// Both ring positions
    Ring,
}

impl TriggerTarget {
    /// The equipment category of this target.
    #[must_use]
    pub const fn category(self) -> EquipCategory {
        match self {
            Self::Weapon(_) => EquipCategory::Weapon,
            Self::Armor(_) => EquipCategory::Armor,
            Self::Ring => EquipCategory::Ring,
        }
    }
}

impl std::fmt::Display for TriggerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weapon(hand) => write!(f, "{} weapon", hand.as_str()),
            Self::Armor(location) => write!(f, "{} armor", location.as_str()),
            Self::Ring => f.write_str("ring"),
        }
    }
}

/// Stable identity of a loaded trigger (its position in load order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TriggerId(pub usize);

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reasons a trigger cannot be constructed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvalidTrigger {
    /// Neither an effect nor an id condition was given
    #[error("at least one of the effect condition or the id condition must be set")]
    NoCondition,

    /// The effect condition is negative
    #[error("effect condition must be non-negative, got {0}")]
    NegativeEffect(i32),

    /// The id condition is negative
    #[error("id condition must be non-negative, got {0}")]
    NegativeId(i32),
}

/// A declarative equipment rewrite rule.
///
/// When the conditions hold, the slot's identifier becomes
/// `current + id_delta`. Non-permanent rewrites are tracked so they can be
/// reverted later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapTrigger {
    target: TriggerTarget,
    effect_condition: Option<i32>,
    id_condition: Option<i32>,
    id_delta: i32,
    permanent: bool,
}

impl SwapTrigger {
    /// Creates a trigger, enforcing that at least one non-negative condition
    /// is present.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTrigger`] if both conditions are absent or either is
    /// negative.
    pub const fn new(
        target: TriggerTarget,
        effect_condition: Option<i32>,
        id_condition: Option<i32>,
        id_delta: i32,
        permanent: bool,
    ) -> Result<Self, InvalidTrigger> {
        match (effect_condition, id_condition) {
            (None, None) => return Err(InvalidTrigger::NoCondition),
            (Some(effect), _) if effect < 0 => return Err(InvalidTrigger::NegativeEffect(effect)),
            (_, Some(id)) if id < 0 => return Err(InvalidTrigger::NegativeId(id)),
            _ => {}
        }
        Ok(Self {
            target,
            effect_condition,
            id_condition,
            id_delta,
            permanent,
        })
    }

    #[must_use]
    pub const fn target(&self) -> TriggerTarget {
        self.target
    }

    #[must_use]
    pub const fn category(&self) -> EquipCategory {
        self.target.category()
    }

    /// Active effect that must be present on the player, if any.
    #[must_use]
    pub const fn effect_condition(&self) -> Option<i32> {
        self.effect_condition
    }

    /// Identifier the slot must currently hold, if any.
    #[must_use]
    pub const fn id_condition(&self) -> Option<i32> {
        self.id_condition
    }

    #[must_use]
    pub const fn id_delta(&self) -> i32 {
        self.id_delta
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// Whether this trigger is gated on an active effect (and so on cooldown).
    #[must_use]
    pub const fn is_effect_conditioned(&self) -> bool {
        self.effect_condition.is_some()
    }

    /// Returns true if `current` satisfies the id condition.
    #[must_use]
    pub fn matches_id(&self, current: i32) -> bool {
        self.id_condition.is_none_or(|id| id == current)
    }

    /// Replacement identifier for `current`, or `None` on overflow.
    #[must_use]
    pub const fn apply(&self, current: i32) -> Option<i32> {
        current.checked_add(self.id_delta)
    }
}

impl std::fmt::Display for SwapTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [", self.target)?;
        match (self.effect_condition, self.id_condition) {
            (Some(effect), Some(id)) => write!(f, "effect {effect} & id {id}")?,
            (Some(effect), None) => write!(f, "effect {effect}")?,
            (None, Some(id)) => write!(f, "id {id}")?,
            (None, None) => f.write_str("-")?,
        }
        write!(f, "] {:+}", self.id_delta)?;
        if let Some(id) = self.id_condition {
            write!(f, " => {}", i64::from(id) + i64::from(self.id_delta))?;
        }
        f.write_str(if self.permanent {
            " (permanent)"
        } else {
            " (temporary)"
        })
    }
}
