//! Builder that assembles a [`CastingEngine`] from configuration.

use std::sync::Arc;

use anyhow::anyhow;

use crate::config::{CooldownConfig, DispatcherConfig, EngineConfig};
use crate::core::{AppResult, CastingEngine, DispatchError, SimulationScheduler};

/// Collects configuration for a [`CastingEngine`] bound to one scheduler.
pub struct EngineBuilder {
    scheduler: Arc<dyn SimulationScheduler>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Builder with default configuration.
    #[must_use]
    pub fn new(scheduler: Arc<dyn SimulationScheduler>) -> Self {
        Self {
            scheduler,
            config: EngineConfig::default(),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the dispatcher section.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: DispatcherConfig) -> Self {
        self.config.dispatcher = dispatcher;
        self
    }

    /// Replace the cooldown section.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Configuration collected so far.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start the engine.
    ///
    /// # Errors
    ///
    /// See [`CastingEngine::start`].
    pub fn build(self) -> Result<CastingEngine, DispatchError> {
        CastingEngine::start(self.config, self.scheduler)
    }
}

/// Start an engine configured from `SPELLCAST_*` environment variables.
///
/// # Errors
///
/// Returns the configuration or startup failure.
pub fn build_engine_from_env(scheduler: Arc<dyn SimulationScheduler>) -> AppResult<CastingEngine> {
    let config = EngineConfig::from_env().map_err(|e| anyhow!("config invalid: {e}"))?;
    let engine = EngineBuilder::new(scheduler).with_config(config).build()?;
    Ok(engine)
}
