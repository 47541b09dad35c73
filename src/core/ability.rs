//! Ability trait, cast context, and cast outcome types.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::AbilityError;
use crate::util::clock::Tick;
use crate::util::ids::{AbilityKey, ActorId, CastId};

/// A unit of game logic with a cooldown, identified by a stable key.
///
/// `cast` runs on a dispatcher worker thread (or, under saturation, on the
/// submitting thread). It must not touch game-visible state directly; it
/// computes a [`CastResult`] that the simulation thread applies afterwards.
///
/// # Example
///
/// ```rust,ignore
/// struct Fireball { key: AbilityKey }
///
/// impl Ability for Fireball {
///     fn key(&self) -> &AbilityKey { &self.key }
///     fn cooldown_ticks(&self) -> Tick { 100 }
///     fn cast(&self, ctx: &CastContext) -> Result<Option<CastResult>, AbilityError> {
///         let power = ctx.param("power").and_then(Value::as_f64).unwrap_or(1.0);
///         Ok(Some(CastResult::success_with(json!({ "damage": 4.0 * power }))))
///     }
/// }
/// ```
pub trait Ability: Send + Sync + 'static {
    /// Registry key of this ability.
    fn key(&self) -> &AbilityKey;

    /// Cooldown applied after a successful cast.
    fn cooldown_ticks(&self) -> Tick {
        0
    }

    /// Execute the ability.
    ///
    /// `Ok(None)` means the ability produced no result; it is reported as a
    /// failure.
    ///
    /// # Errors
    ///
    /// Any error is caught by the dispatcher and reported as a failed cast.
    fn cast(&self, context: &CastContext) -> Result<Option<CastResult>, AbilityError>;
}

/// Key reported for an ability whose `key()` panics.
pub const UNKNOWN_ABILITY: &str = "<unknown-spell>";

/// `ability.key()`, or [`UNKNOWN_ABILITY`] if it panics.
pub(crate) fn guarded_key(ability: &dyn Ability) -> AbilityKey {
    panic::catch_unwind(AssertUnwindSafe(|| ability.key().clone()))
        .unwrap_or_else(|_| AbilityKey::from(UNKNOWN_ABILITY))
}

/// `ability.cooldown_ticks()`, or 0 if it panics.
pub(crate) fn guarded_cooldown(ability: &dyn Ability) -> Tick {
    panic::catch_unwind(AssertUnwindSafe(|| ability.cooldown_ticks())).unwrap_or(0)
}

/// Execution context handed to an ability: who casts, at whom, with what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastContext {
    /// The casting actor.
    pub actor: ActorId,
    /// Optional targeted actor.
    pub target: Option<ActorId>,
    /// Free-form parameters.
    pub params: BTreeMap<String, Value>,
}

impl CastContext {
    /// Context for `actor` with no target and no parameters.
    #[must_use]
    pub const fn new(actor: ActorId) -> Self {
        Self {
            actor,
            target: None,
            params: BTreeMap::new(),
        }
    }

    /// Set the target.
    #[must_use]
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// What an ability reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastResult {
    /// Whether the cast achieved its effect.
    pub success: bool,
    /// Ability-specific data for presentation.
    pub payload: Option<Value>,
    /// Human-readable reason, mostly for failures.
    pub message: Option<String>,
}

impl CastResult {
    /// Successful cast without payload.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            payload: None,
            message: None,
        }
    }

    /// Successful cast carrying `payload`.
    #[must_use]
    pub fn success_with(payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            message: None,
        }
    }

    /// Failed cast with a reason.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            message: Some(message.into()),
        }
    }
}

/// Why a cast did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The ability ran and reported failure.
    Rejected,
    /// The ability ran and returned no result.
    NoResult,
    /// The ability returned an error.
    Raised,
    /// The ability panicked.
    Panicked,
}

impl FailureKind {
    /// Whether the ability aborted instead of returning a result.
    #[must_use]
    pub const fn is_abort(self) -> bool {
        matches!(self, Self::Raised | Self::Panicked)
    }
}

/// Failure details of a cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Short human-readable description.
    pub description: String,
}

/// Terminal result of one dispatched cast. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastOutcome {
    /// Dispatcher-assigned identifier.
    pub cast_id: CastId,
    /// Ability that was cast.
    pub ability: AbilityKey,
    /// Casting actor.
    pub actor: ActorId,
    /// Whether the cast succeeded.
    pub success: bool,
    /// Result payload from the ability, if any.
    pub payload: Option<Value>,
    /// Failure details when `success` is false.
    pub failure: Option<CastFailure>,
    /// Time from submission to completion.
    pub elapsed: Duration,
}

impl CastOutcome {
    /// Failure description, if the cast failed.
    #[must_use]
    pub fn failure_description(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.description.as_str())
    }
}
