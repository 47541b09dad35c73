//! Engine facade wiring the cooldown tracker, its sweeper, and the dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::ability::{guarded_cooldown, guarded_key, Ability, CastContext};
use super::cooldown::{CooldownStats, CooldownSweeper, CooldownTracker};
use super::dispatcher::CastDispatcher;
use super::error::{DispatchError, EngineError};
use super::host::{PeriodicHandle, Presentation, SimulationScheduler};
use super::metrics::MetricsSnapshot;
use crate::config::EngineConfig;
use crate::util::ids::{CastId, ItemDescriptor};

/// A running spell-casting engine.
///
/// Owns the cooldown table, the background sweeper registration, and the
/// worker pool. `try_cast` is meant to be called from the simulation thread.
pub struct CastingEngine {
    config: EngineConfig,
    scheduler: Arc<dyn SimulationScheduler>,
    tracker: Arc<CooldownTracker>,
    dispatcher: CastDispatcher,
    sweeper: PeriodicHandle,
    /// Set by `shutdown`; late completions must not repopulate the tracker.
    closed: Arc<AtomicBool>,
}

impl CastingEngine {
    /// Validate `config`, start the dispatcher, and register the cooldown
    /// sweeper with `scheduler`.
    ///
    /// # Errors
    ///
    /// `DispatchError::InvalidConfig` or `DispatchError::Spawn`.
    pub fn start(config: EngineConfig, scheduler: Arc<dyn SimulationScheduler>) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;

        let tracker = Arc::new(CooldownTracker::new(&config.cooldown));
        let dispatcher = CastDispatcher::new(config.dispatcher.clone(), Arc::clone(&scheduler))?;
        let sweeper = CooldownSweeper::new(Arc::clone(&tracker), &config.cooldown)
            .schedule(scheduler.as_ref(), &config.cooldown);

        info!(
            sweep_interval_ticks = config.cooldown.sweep_interval_ticks,
            "CastingEngine started"
        );

        Ok(Self {
            config,
            scheduler,
            tracker,
            dispatcher,
            sweeper,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cast `ability` unless it is on cooldown for the caster.
    ///
    /// `item` is the held item whose override may bypass the cooldown. On
    /// refusal the caster sees "On cooldown: <n> ticks". On a successful
    /// outcome the cooldown is set to the tick of this call plus
    /// [`Ability::cooldown_ticks`], however late the outcome arrives.
    ///
    /// # Errors
    ///
    /// `EngineError::OnCooldown` when refused, `EngineError::Dispatch` when
    /// the dispatcher does not accept the cast.
    pub fn try_cast(
        &self,
        ability: Arc<dyn Ability>,
        context: CastContext,
        item: Option<&ItemDescriptor>,
        presentation: Arc<dyn Presentation>,
    ) -> Result<CastId, EngineError> {
        let actor = context.actor;
        let key = guarded_key(ability.as_ref());
        let now = self.scheduler.current_tick();

        let remaining = match item {
            Some(item) => self.tracker.remaining_with_item(actor, key.as_str(), now, item),
            None => self.tracker.remaining(actor, key.as_str(), now),
        };
        if remaining > 0 {
            debug!(%actor, ability = %key, remaining, "Cast refused, on cooldown");
            if presentation.is_reachable(actor) {
                presentation.show_action_bar_message(actor, &format!("On cooldown: {remaining} ticks"));
            }
            return Err(EngineError::OnCooldown { key, remaining });
        }

        let cooldown = guarded_cooldown(ability.as_ref());
        let tracker = Arc::clone(&self.tracker);
        let closed = Arc::clone(&self.closed);
        let id = self.dispatcher.cast_async_with_completion(
            ability,
            context,
            presentation,
            move |outcome, _delivered_at| {
                if closed.load(Ordering::Acquire) {
                    debug!(cast_id = outcome.cast_id, "Engine shut down, not applying cooldown");
                    return;
                }
                if outcome.success && cooldown > 0 {
                    tracker.set(outcome.actor, key, now.saturating_add(cooldown));
                }
            },
        )?;
        Ok(id)
    }

    /// Shared cooldown table.
    #[must_use]
    pub const fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.tracker
    }

    /// The underlying dispatcher, for casts that bypass cooldown checks.
    #[must_use]
    pub const fn dispatcher(&self) -> &CastDispatcher {
        &self.dispatcher
    }

    /// Configuration the engine was started with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Dispatcher metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.dispatcher.metrics()
    }

    /// Cooldown table sizes.
    #[must_use]
    pub fn cooldown_stats(&self) -> CooldownStats {
        self.tracker.stats()
    }

    /// Stop the sweeper, drain the dispatcher, and clear all cooldowns.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.sweeper.cancel();
        self.dispatcher.shutdown();
        self.tracker.clear();
        info!("CastingEngine shut down");
    }
}

impl Drop for CastingEngine {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}
