//! Cooldowns, metrics, and the asynchronous cast dispatcher.

pub mod ability;
pub mod cooldown;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod host;
pub mod metrics;

pub use ability::{Ability, CastContext, CastFailure, CastOutcome, CastResult, FailureKind, UNKNOWN_ABILITY};
pub use cooldown::{CooldownStats, CooldownSweeper, CooldownTracker, SweepReport};
pub use dispatcher::{handle_cast_result, CastDispatcher, CastHandle, SPELL_CAST_MESSAGE, SPELL_FAILED_MESSAGE};
pub use engine::CastingEngine;
pub use error::{AbilityError, AppResult, DispatchError, EngineError};
pub use host::{run_on_simulation, PeriodicHandle, PeriodicTask, Presentation, SimulationScheduler, SimulationTask};
pub use metrics::{MetricsCollector, MetricsSnapshot};
