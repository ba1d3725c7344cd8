//! Configuration schema types
//!
//! [`RawSwapConfig`] mirrors the file exactly (PascalCase keys, loosely typed
//! trigger entries). The validator turns it into a [`SwapConfig`], which is
//! what the rest of the crate consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::swap::engine::EngineTiming;
use crate::swap::slot::{ArmorLocation, Hand};
use crate::swap::trigger::{SwapTrigger, TriggerTarget};

// ============================================================================
// Trigger lists
// ============================================================================

/// Every trigger list key with the target it addresses, in evaluation order.
pub const TRIGGER_LISTS: [(&str, TriggerTarget); 7] = [
    ("LeftWeaponTriggers", TriggerTarget::Weapon(Hand::Left)),
    ("RightWeaponTriggers", TriggerTarget::Weapon(Hand::Right)),
    ("HeadArmorTriggers", TriggerTarget::Armor(ArmorLocation::Head)),
    ("BodyArmorTriggers", TriggerTarget::Armor(ArmorLocation::Body)),
    ("ArmsArmorTriggers", TriggerTarget::Armor(ArmorLocation::Arms)),
    ("LegsArmorTriggers", TriggerTarget::Armor(ArmorLocation::Legs)),
    ("RingTriggers", TriggerTarget::Ring),
];

/// Setting keys recognized at the top level.
pub const SETTING_KEYS: [&str; 5] = [
    "ProcessSearchTimeoutMs",
    "ProcessSearchIntervalMs",
    "MonitorIntervalMs",
    "GameLoadedIntervalMs",
    "SpEffectTriggerCooldownMs",
];

/// Keys that were renamed, with their replacement.
pub const LEGACY_KEYS: [(&str, &str); 2] = [
    ("LeftSpEffectTriggers", "LeftWeaponTriggers"),
    ("RightSpEffectTriggers", "RightWeaponTriggers"),
];

/// Free-form documentation key, ignored.
pub const DOC_KEY: &str = "__doc__";

// ============================================================================
// Raw file form
// ============================================================================

/// The configuration file as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSwapConfig {
    pub process_search_timeout_ms: Option<i64>,
    pub process_search_interval_ms: Option<i64>,
    pub monitor_interval_ms: Option<i64>,
    pub game_loaded_interval_ms: Option<i64>,
    pub sp_effect_trigger_cooldown_ms: Option<i64>,

    pub left_weapon_triggers: Option<Vec<RawTrigger>>,
    pub right_weapon_triggers: Option<Vec<RawTrigger>>,
    pub head_armor_triggers: Option<Vec<RawTrigger>>,
    pub body_armor_triggers: Option<Vec<RawTrigger>>,
    pub arms_armor_triggers: Option<Vec<RawTrigger>>,
    pub legs_armor_triggers: Option<Vec<RawTrigger>>,
    pub ring_triggers: Option<Vec<RawTrigger>>,

    /// Everything else, checked for legacy and misspelled keys
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

impl RawSwapConfig {
    /// Trigger list stored under `key`, if present.
    #[must_use]
    pub fn trigger_list(&self, key: &str) -> Option<&[RawTrigger]> {
        let list = match key {
            "LeftWeaponTriggers" => &self.left_weapon_triggers,
            "RightWeaponTriggers" => &self.right_weapon_triggers,
            "HeadArmorTriggers" => &self.head_armor_triggers,
            "BodyArmorTriggers" => &self.body_armor_triggers,
            "ArmsArmorTriggers" => &self.arms_armor_triggers,
            "LegsArmorTriggers" => &self.legs_armor_triggers,
            "RingTriggers" => &self.ring_triggers,
            _ => return None,
        };
        list.as_deref()
    }
}

/// One trigger entry as written.
///
/// The positional form is `[effect, id, delta]` or
/// `[effect, id, delta, permanent]`, with `-1` meaning "no condition".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTrigger {
    Positional(Vec<serde_yaml::Value>),
    Mapping(RawTriggerMapping),
}

/// Named form of a trigger entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTriggerMapping {
    #[serde(default)]
    pub effect: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    pub delta: i64,
    #[serde(default)]
    pub permanent: bool,
}

// ============================================================================
// Typed form
// ============================================================================

/// Timing settings for the monitor loop, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorSettings {
    /// Bound on the initial process search
    pub process_search_timeout_ms: u64,
    /// Spacing between search attempts
    pub process_search_interval_ms: u64,
    /// Normal tick spacing
    pub monitor_interval_ms: u64,
    /// Poll spacing while the world is not loaded
    pub game_loaded_interval_ms: u64,
    /// Cooldown for effect-conditioned triggers
    pub sp_effect_trigger_cooldown_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            process_search_timeout_ms: 3_600_000,
            process_search_interval_ms: 500,
            monitor_interval_ms: 10,
            game_loaded_interval_ms: 200,
            sp_effect_trigger_cooldown_ms: 500,
        }
    }
}

impl MonitorSettings {
    #[must_use]
    pub const fn engine_timing(&self) -> EngineTiming {
        EngineTiming {
            tick_ms: self.monitor_interval_ms,
            cooldown_ms: self.sp_effect_trigger_cooldown_ms,
        }
    }
}

/// A validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwapConfig {
    pub settings: MonitorSettings,
    /// Every trigger, in list order then entry order
    pub triggers: Vec<SwapTrigger>,
}

impl SwapConfig {
    /// Number of triggers addressing `target`.
    #[must_use]
    pub fn count(&self, target: TriggerTarget) -> usize {
        self.triggers.iter().filter(|t| t.target() == target).count()
    }

    /// Logs every setting and trigger at INFO.
    pub fn log_summary(&self) {
        let s = &self.settings;
        tracing::info!(
            process_search_timeout_ms = s.process_search_timeout_ms,
            process_search_interval_ms = s.process_search_interval_ms,
            monitor_interval_ms = s.monitor_interval_ms,
            game_loaded_interval_ms = s.game_loaded_interval_ms,
            sp_effect_trigger_cooldown_ms = s.sp_effect_trigger_cooldown_ms,
            "settings loaded"
        );
        for (key, target) in TRIGGER_LISTS {
            let count = self.count(target);
            if count == 0 {
                tracing::info!(list = key, "no triggers");
            } else {
                tracing::info!(list = key, count, "triggers loaded");
            }
        }
        for trigger in &self.triggers {
            tracing::info!("trigger: {trigger}");
        }
    }
}
