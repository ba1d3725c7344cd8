//! Configuration validation
//!
//! Turns a [`RawSwapConfig`] into a [`SwapConfig`] while collecting every
//! issue, so a single run reports all problems in the file. Any error
//! rejects the whole configuration.

use crate::config::loader::ConfigLimits;
use crate::config::schema::{
    DOC_KEY, LEGACY_KEYS, MonitorSettings, RawSwapConfig, RawTrigger, RawTriggerMapping,
    SETTING_KEYS, SwapConfig, TRIGGER_LISTS,
};
use crate::error::{Severity, ValidationIssue};
use crate::swap::trigger::{SwapTrigger, TriggerTarget};

/// Positional value meaning "no condition".
const NO_CONDITION: i32 = -1;

/// Maximum edit distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 3;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (informational)
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `raw` and builds the typed configuration.
    ///
    /// The returned config only holds the entries that were valid; callers
    /// must discard it when the result has errors.
    pub fn validate(
        &mut self,
        raw: &RawSwapConfig,
        limits: &ConfigLimits,
    ) -> (SwapConfig, ValidationResult) {
        self.errors.clear();
        self.warnings.clear();

        self.check_other_keys(raw);
        let settings = self.build_settings(raw);

        let mut triggers = Vec::new();
        for (key, target) in TRIGGER_LISTS {
            if let Some(list) = raw.trigger_list(key) {
                self.build_list(key, target, list, limits, &mut triggers);
            }
        }

        let result = ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        };
        (SwapConfig { settings, triggers }, result)
    }

    // ========================================================================
    // Keys
    // ========================================================================

    fn check_other_keys(&mut self, raw: &RawSwapConfig) {
        for key in raw.other.keys() {
            if key == DOC_KEY {
                continue;
            }
            if let Some((_, replacement)) = LEGACY_KEYS.iter().find(|(old, _)| old == key) {
                self.add_error(
                    key,
                    &format!(
                        "legacy key is no longer supported; move its entries to '{replacement}' \
                         with the effect id as the first element"
                    ),
                );
                continue;
            }
            let message = suggest_key(key).map_or_else(
                || "unrecognized key ignored".to_string(),
                |s| format!("unrecognized key ignored (did you mean '{s}'?)"),
            );
            self.add_warning(key, &message);
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    fn build_settings(&mut self, raw: &RawSwapConfig) -> MonitorSettings {
        let defaults = MonitorSettings::default();
        let settings = MonitorSettings {
            process_search_timeout_ms: self.interval(
                "ProcessSearchTimeoutMs",
                raw.process_search_timeout_ms,
                defaults.process_search_timeout_ms,
                1,
            ),
            process_search_interval_ms: self.interval(
                "ProcessSearchIntervalMs",
                raw.process_search_interval_ms,
                defaults.process_search_interval_ms,
                1,
            ),
            monitor_interval_ms: self.interval(
                "MonitorIntervalMs",
                raw.monitor_interval_ms,
                defaults.monitor_interval_ms,
                1,
            ),
            game_loaded_interval_ms: self.interval(
                "GameLoadedIntervalMs",
                raw.game_loaded_interval_ms,
                defaults.game_loaded_interval_ms,
                1,
            ),
            sp_effect_trigger_cooldown_ms: self.interval(
                "SpEffectTriggerCooldownMs",
                raw.sp_effect_trigger_cooldown_ms,
                defaults.sp_effect_trigger_cooldown_ms,
                0,
            ),
        };

        if settings.process_search_timeout_ms < settings.process_search_interval_ms {
            self.add_error(
                "ProcessSearchTimeoutMs",
                &format!(
                    "search timeout ({} ms) is shorter than the search interval ({} ms)",
                    settings.process_search_timeout_ms, settings.process_search_interval_ms
                ),
            );
        }
        settings
    }

    fn interval(&mut self, key: &str, value: Option<i64>, default: u64, min: u64) -> u64 {
        let Some(value) = value else {
            return default;
        };
        match u64::try_from(value) {
            Ok(ms) if ms >= min => ms,
            _ => {
                self.add_error(key, &format!("must be at least {min} ms, got {value}"));
                default
            }
        }
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    fn build_list(
        &mut self,
        key: &str,
        target: TriggerTarget,
        list: &[RawTrigger],
        limits: &ConfigLimits,
        out: &mut Vec<SwapTrigger>,
    ) {
        if list.len() > limits.max_triggers {
            self.add_error(
                key,
                &format!(
                    "too many triggers ({}), at most {} are allowed",
                    list.len(),
                    limits.max_triggers
                ),
            );
            return;
        }
        for (i, entry) in list.iter().enumerate() {
            let path = format!("{key}[{i}]");
            let built = match entry {
                RawTrigger::Positional(values) => self.positional(&path, target, values),
                RawTrigger::Mapping(mapping) => self.mapping(&path, target, mapping),
            };
            if let Some(trigger) = built {
                out.push(trigger);
            }
        }
    }

    fn positional(
        &mut self,
        path: &str,
        target: TriggerTarget,
        values: &[serde_yaml::Value],
    ) -> Option<SwapTrigger> {
        if !(3..=4).contains(&values.len()) {
            self.add_error(
                path,
                &format!(
                    "expected [effectId, currentId, idDelta] or \
                     [effectId, currentId, idDelta, isPermanent], got {} elements",
                    values.len()
                ),
            );
            return None;
        }

        let effect = self.positional_condition(path, "effect condition", &values[0]);
        let id = self.positional_condition(path, "id condition", &values[1]);
        let delta = self.integer(path, "id delta", &values[2]);
        let permanent = match values.get(3) {
            None => Some(false),
            Some(value) => self.flag(path, value),
        };

        self.finish(path, target, effect?, id?, delta?, permanent?)
    }

    fn mapping(
        &mut self,
        path: &str,
        target: TriggerTarget,
        mapping: &RawTriggerMapping,
    ) -> Option<SwapTrigger> {
        let effect = self.mapping_condition(path, "effect", mapping.effect);
        let id = self.mapping_condition(path, "id", mapping.id);
        let delta = self.narrow(path, "delta", mapping.delta);
        self.finish(path, target, effect?, id?, delta?, mapping.permanent)
    }

    fn finish(
        &mut self,
        path: &str,
        target: TriggerTarget,
        effect: Option<i32>,
        id: Option<i32>,
        delta: i32,
        permanent: bool,
    ) -> Option<SwapTrigger> {
        match SwapTrigger::new(target, effect, id, delta, permanent) {
            Ok(trigger) => Some(trigger),
            Err(e) => {
                self.add_error(path, &e.to_string());
                None
            }
        }
    }

    /// `Some(None)` for `-1`, `Some(Some(v))` for `v >= 0`, `None` on error.
    fn positional_condition(
        &mut self,
        path: &str,
        what: &str,
        value: &serde_yaml::Value,
    ) -> Option<Option<i32>> {
        let raw = self.integer(path, what, value)?;
        if raw == NO_CONDITION {
            return Some(None);
        }
        if raw < NO_CONDITION {
            self.add_error(path, &format!("{what} must be -1 or greater, got {raw}"));
            return None;
        }
        Some(Some(raw))
    }

    fn mapping_condition(&mut self, path: &str, what: &str, value: Option<i64>) -> Option<Option<i32>> {
        let Some(raw) = value else {
            return Some(None);
        };
        if raw < 0 {
            self.add_error(path, &format!("{what} must be non-negative, got {raw}"));
            return None;
        }
        self.narrow(path, what, raw).map(Some)
    }

    fn integer(&mut self, path: &str, what: &str, value: &serde_yaml::Value) -> Option<i32> {
        if let Some(raw) = value.as_i64() {
            self.narrow(path, what, raw)
        } else {
            self.add_error(path, &format!("{what} must be an integer"));
            None
        }
    }

    fn narrow(&mut self, path: &str, what: &str, raw: i64) -> Option<i32> {
        if let Ok(v) = i32::try_from(raw) {
            Some(v)
        } else {
            self.add_error(path, &format!("{what} {raw} does not fit in 32 bits"));
            None
        }
    }

    fn flag(&mut self, path: &str, value: &serde_yaml::Value) -> Option<bool> {
        match (value.as_bool(), value.as_i64()) {
            (Some(b), _) => Some(b),
            (None, Some(0)) => Some(false),
            (None, Some(1)) => Some(true),
            _ => {
                self.add_error(path, "isPermanent must be a boolean");
                None
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

/// Closest recognized key within the suggestion distance.
#[must_use]
pub fn suggest_key(input: &str) -> Option<&'static str> {
    SETTING_KEYS
        .iter()
        .copied()
        .chain(TRIGGER_LISTS.iter().map(|(key, _)| *key))
        .map(|key| (key, strsim::damerau_levenshtein(input, key)))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(key, _)| key)
}
