//! Tests for utility functions

use std::time::Duration;

use spellcast_engine::util::{
    duration_to_ticks, ticks_to_duration, AbilityKey, ActorId, ItemDescriptor, TICKS_PER_SECOND,
};

#[test]
fn test_tick_rate() {
    assert_eq!(TICKS_PER_SECOND, 20);
    assert_eq!(ticks_to_duration(100), Duration::from_secs(5));
    assert_eq!(duration_to_ticks(Duration::from_millis(125)), 3);
}

#[test]
fn test_actor_id_serde_is_transparent() {
    let actor = ActorId::random();
    let json = serde_json::to_string(&actor).unwrap();
    assert_eq!(json, format!("\"{}\"", actor));
    let back: ActorId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, actor);
}

#[test]
fn test_ability_key() {
    let key = AbilityKey::from("fireball");
    assert_eq!(key.as_str(), "fireball");
    assert_eq!(key.to_string(), "fireball");
    assert!(AbilityKey::default().is_empty());
}

#[test]
fn test_wand_identity() {
    let wand = ItemDescriptor::new("BLAZE_ROD").with_label("wandX");
    assert_eq!(wand.identity().as_str(), "BLAZE_ROD:wandX");
}

#[test]
fn test_init_tracing_is_idempotent() {
    spellcast_engine::util::init_tracing();
    spellcast_engine::util::init_tracing_with_default("spellcast_engine=debug");
    tracing::info!("tracing initialized");
}
