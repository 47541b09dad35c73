//! Error types for ability execution, dispatch, and the engine facade.

use thiserror::Error;

use crate::util::clock::Tick;
use crate::util::ids::AbilityKey;

/// Convenience result for host-side glue that mixes error sources.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Error returned by ability logic. Never escapes a worker: the dispatcher
/// turns it into a failed `CastOutcome`.
#[derive(Debug, Error)]
pub enum AbilityError {
    /// The ability refused or could not complete.
    #[error("{0}")]
    Failed(String),
    /// Any other error raised by ability code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AbilityError {
    /// Shorthand for [`AbilityError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors produced by the cast dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatcher no longer accepts casts.
    #[error("dispatcher has been shut down")]
    ShutDown,
    /// The cast was dropped during forced shutdown before it ran.
    #[error("cast cancelled before completion")]
    Cancelled,
    /// Queue and workers are saturated and the policy is `Reject`.
    #[error("cast queue is full")]
    QueueFull,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
}

/// Errors surfaced by `CastingEngine::try_cast`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The actor must wait before casting this ability again.
    #[error("{key} is on cooldown for {remaining} more ticks")]
    OnCooldown {
        /// Ability that was refused.
        key: AbilityKey,
        /// Ticks left on the cooldown.
        remaining: Tick,
    },
    /// The dispatcher refused the cast.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
