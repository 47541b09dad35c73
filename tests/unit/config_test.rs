//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use spellcast_engine::config::{CooldownConfig, DispatcherConfig, EngineConfig, SaturationPolicy};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_dispatcher_defaults() {
    let cfg = DispatcherConfig::default();
    assert!(cfg.core_workers >= 2);
    assert!(cfg.max_workers >= cfg.core_workers);
    assert_eq!(cfg.queue_capacity, 1000);
    assert_eq!(cfg.keep_alive(), Duration::from_secs(60));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(30));
    assert_eq!(cfg.shutdown_force(), Duration::from_secs(10));
    assert_eq!(cfg.saturation, SaturationPolicy::CallerRuns);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_dispatcher_config_invalid_core_workers() {
    let invalid = DispatcherConfig::new().with_core_workers(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_dispatcher_config_invalid_max_workers() {
    let invalid = DispatcherConfig::new().with_core_workers(4).with_max_workers(2);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_dispatcher_config_invalid_queue_capacity() {
    let invalid = DispatcherConfig::new().with_queue_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_core_workers_raises_max() {
    let cfg = DispatcherConfig::new().with_max_workers(2).with_core_workers(16);
    assert_eq!(cfg.max_workers, 16);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_cooldown_defaults_and_validation() {
    let cfg = CooldownConfig::default();
    assert_eq!(cfg.sweep_interval_ticks, 1200);
    assert_eq!(cfg.override_cap, 1000);
    assert!(cfg.validate().is_ok());

    let cfg = CooldownConfig::new().with_sweep_interval(Duration::from_secs(30));
    assert_eq!(cfg.sweep_interval_ticks, 600);
    assert_eq!(cfg.sweep_initial_delay_ticks, 600);

    assert!(CooldownConfig::new().with_override_cap(0).validate().is_err());
}

#[test]
fn test_engine_config_json() {
    let json = r#"{
        "dispatcher": { "core_workers": 2, "max_workers": 4, "queue_capacity": 8, "saturation": "reject" },
        "cooldown": { "override_cap": 10 }
    }"#;
    let cfg = EngineConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.dispatcher.core_workers, 2);
    assert_eq!(cfg.dispatcher.max_workers, 4);
    assert_eq!(cfg.dispatcher.queue_capacity, 8);
    assert_eq!(cfg.dispatcher.saturation, SaturationPolicy::Reject);
    assert_eq!(cfg.cooldown.override_cap, 10);
    assert_eq!(cfg.cooldown.sweep_interval_ticks, 1200);
}

#[test]
fn test_engine_config_json_invalid() {
    let err = EngineConfig::from_json_str(r#"{ "dispatcher": { "queue_capacity": 0 } }"#).unwrap_err();
    assert!(err.starts_with("dispatcher invalid:"), "{err}");
    assert!(EngineConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_engine_config_from_lookup() {
    let cfg = EngineConfig::from_lookup(lookup(&[
        ("SPELLCAST_CORE_WORKERS", "3"),
        ("SPELLCAST_MAX_WORKERS", "6"),
        ("SPELLCAST_QUEUE_CAPACITY", " 50 "),
        ("SPELLCAST_SATURATION", "reject"),
        ("SPELLCAST_SWEEP_INTERVAL_TICKS", "200"),
        ("SPELLCAST_LOCK_TIMEOUT_US", "250"),
    ]))
    .unwrap();

    assert_eq!(cfg.dispatcher.core_workers, 3);
    assert_eq!(cfg.dispatcher.max_workers, 6);
    assert_eq!(cfg.dispatcher.queue_capacity, 50);
    assert_eq!(cfg.dispatcher.saturation, SaturationPolicy::Reject);
    assert_eq!(cfg.cooldown.sweep_interval_ticks, 200);
    assert_eq!(cfg.cooldown.lock_timeout(), Duration::from_micros(250));
}

#[test]
fn test_engine_config_from_lookup_errors() {
    let err = EngineConfig::from_lookup(lookup(&[("SPELLCAST_QUEUE_CAPACITY", "lots")])).unwrap_err();
    assert!(err.starts_with("SPELLCAST_QUEUE_CAPACITY"), "{err}");

    let err = EngineConfig::from_lookup(lookup(&[("SPELLCAST_SATURATION", "drop")])).unwrap_err();
    assert!(err.contains("unknown policy"), "{err}");

    let err = EngineConfig::from_lookup(lookup(&[("SPELLCAST_OVERRIDE_CAP", "0")])).unwrap_err();
    assert!(err.starts_with("cooldown invalid:"), "{err}");
}
