//! Tests for error types

use spellcast_engine::core::{AbilityError, DispatchError, EngineError};
use spellcast_engine::util::AbilityKey;

#[test]
fn test_shut_down_error() {
    let err = DispatchError::ShutDown;
    assert_eq!(format!("{}", err), "dispatcher has been shut down");
}

#[test]
fn test_cancelled_error() {
    let err = DispatchError::Cancelled;
    assert_eq!(format!("{}", err), "cast cancelled before completion");
}

#[test]
fn test_invalid_config_error() {
    let err = DispatchError::InvalidConfig("core_workers must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: core_workers must be greater than 0"
    );
}

#[test]
fn test_on_cooldown_error() {
    let err = EngineError::OnCooldown {
        key: AbilityKey::from("fireball"),
        remaining: 40,
    };
    assert_eq!(format!("{}", err), "fireball is on cooldown for 40 more ticks");
}

#[test]
fn test_engine_error_wraps_dispatch_error() {
    let err: EngineError = DispatchError::QueueFull.into();
    assert_eq!(format!("{}", err), "cast queue is full");
}

#[test]
fn test_ability_error_from_anyhow() {
    fn cast() -> Result<(), AbilityError> {
        Err(anyhow::anyhow!("mana pool empty"))?;
        Ok(())
    }
    let err = cast().unwrap_err();
    assert_eq!(format!("{}", err), "mana pool empty");
    assert_eq!(format!("{}", AbilityError::failed("no target")), "no target");
}
