mod common;

use std::io::Write;
use std::path::Path;

use common::fixture_path;
use equipswap::config::{ConfigLimits, ConfigLoader, LoaderOptions, MonitorSettings};
use equipswap::error::ConfigError;
use equipswap::swap::{ArmorLocation, Hand, TriggerTarget};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn fixture_loads_with_settings_and_triggers() {
    let result = ConfigLoader::with_defaults()
        .load(&fixture_path("swap_basic.yaml"))
        .unwrap();
    let config = result.config;

    assert!(result.warnings.is_empty());
    assert_eq!(config.settings.monitor_interval_ms, 5);
    assert_eq!(config.settings.sp_effect_trigger_cooldown_ms, 50);
    assert_eq!(
        config.settings.process_search_timeout_ms,
        MonitorSettings::default().process_search_timeout_ms
    );
    assert_eq!(config.count(TriggerTarget::Weapon(Hand::Left)), 1);
    assert_eq!(config.count(TriggerTarget::Armor(ArmorLocation::Head)), 1);
    assert_eq!(config.count(TriggerTarget::Ring), 1);
    assert_eq!(config.count(TriggerTarget::Weapon(Hand::Right)), 0);
}

#[test]
fn every_list_key_is_recognized() {
    let file = write_config(
        r"
LeftWeaponTriggers: [[-1, 1, 1]]
RightWeaponTriggers: [[-1, 2, 1]]
HeadArmorTriggers: [[-1, 3, 1]]
BodyArmorTriggers: [[-1, 4, 1]]
ArmsArmorTriggers: [[-1, 5, 1]]
LegsArmorTriggers: [[-1, 6, 1]]
RingTriggers: [[-1, 7, 1]]
",
    );
    let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
    assert!(result.warnings.is_empty());
    let ids: Vec<_> = result
        .config
        .triggers
        .iter()
        .map(|t| t.id_condition().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(
        result.config.count(TriggerTarget::Armor(ArmorLocation::Arms)),
        1
    );
    assert_eq!(
        result.config.count(TriggerTarget::Armor(ArmorLocation::Legs)),
        1
    );
}

#[test]
fn env_defaults_feed_settings() {
    let file = write_config(
        "MonitorIntervalMs: ${EQUIPSWAP_IT_UNSET_INTERVAL:-16}\nRingTriggers: [[-1, 1, 1]]\n",
    );
    let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
    assert_eq!(result.config.settings.monitor_interval_ms, 16);
}

#[test]
fn required_env_var_missing() {
    let file = write_config("MonitorIntervalMs: ${EQUIPSWAP_IT_UNSET_REQUIRED:?tick interval}\n");
    let err = ConfigLoader::with_defaults().load(file.path()).unwrap_err();
    match err {
        ConfigError::EnvVarNotSet { var, location } => {
            assert_eq!(var, "EQUIPSWAP_IT_UNSET_REQUIRED");
            assert!(location.contains("tick interval"));
        }
        other => panic!("expected EnvVarNotSet, got {other:?}"),
    }
}

#[test]
fn no_partial_configuration_is_accepted() {
    let file = write_config("RingTriggers:\n  - [-1, 7, 1]\n  - [-1, -1, 1]\n");
    let err = ConfigLoader::with_defaults().load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { ref errors, .. } if errors.len() == 1));
}

#[test]
fn unknown_mapping_fields_are_parse_errors() {
    let file = write_config("RingTriggers:\n  - { id: 3, delta: 1, permanant: true }\n");
    let err = ConfigLoader::with_defaults().load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }), "{err}");
}

#[test]
fn trigger_limit_from_options() {
    let file = write_config("RingTriggers: [[-1, 1, 1], [-1, 2, 1], [-1, 3, 1]]\n");
    let loader = ConfigLoader::new(LoaderOptions {
        config_limits: ConfigLimits {
            max_config_size: 1024,
            max_triggers: 2,
        },
    });
    let err = loader.load(file.path()).unwrap_err();
    assert!(err.to_string().contains("too many triggers"));
}

#[test]
fn load_str_matches_load() {
    let content = std::fs::read_to_string(fixture_path("swap_basic.yaml")).unwrap();
    let from_str = ConfigLoader::with_defaults()
        .load_str(&content, Path::new("inline.yaml"))
        .unwrap();
    let from_file = ConfigLoader::with_defaults()
        .load(&fixture_path("swap_basic.yaml"))
        .unwrap();
    assert_eq!(from_str.config, from_file.config);
}
