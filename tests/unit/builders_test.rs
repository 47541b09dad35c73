//! Tests for builder modules

use std::sync::Arc;

use spellcast_engine::builders::EngineBuilder;
use spellcast_engine::config::{CooldownConfig, DispatcherConfig, EngineConfig};
use spellcast_engine::core::DispatchError;
use spellcast_engine::runtime::ManualScheduler;

#[test]
fn test_engine_builder_defaults() {
    let builder = EngineBuilder::new(Arc::new(ManualScheduler::new()));
    assert_eq!(builder.config(), &EngineConfig::default());
}

#[test]
fn test_engine_builder_sections() {
    let builder = EngineBuilder::new(Arc::new(ManualScheduler::new()))
        .with_dispatcher(DispatcherConfig::new().with_core_workers(2).with_queue_capacity(16))
        .with_cooldown(CooldownConfig::new().with_override_cap(5));
    assert_eq!(builder.config().dispatcher.queue_capacity, 16);
    assert_eq!(builder.config().cooldown.override_cap, 5);

    let engine = builder.build().unwrap();
    assert_eq!(engine.metrics().worker_count, 2);
    engine.shutdown();
}

#[test]
fn test_engine_builder_registers_sweeper() {
    let scheduler = Arc::new(ManualScheduler::new());
    let engine = EngineBuilder::new(scheduler.clone())
        .with_dispatcher(DispatcherConfig::new().with_core_workers(2))
        .build()
        .unwrap();
    assert_eq!(scheduler.periodic_count(), 1);

    engine.shutdown();
    assert_eq!(scheduler.periodic_count(), 0);
}

#[test]
fn test_engine_builder_rejects_invalid_config() {
    let result = EngineBuilder::new(Arc::new(ManualScheduler::new()))
        .with_dispatcher(DispatcherConfig::new().with_queue_capacity(0))
        .build();
    assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
}
