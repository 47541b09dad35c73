//! # Spellcast Engine
//!
//! Cooldown tracking and asynchronous ability execution for a tick-driven game
//! server.
//!
//! The host owns a single simulation thread that advances the world in
//! discrete ticks (20 per second). Abilities are too slow to run on it, so
//! this crate runs them on a bounded worker pool and hands results back to
//! the simulation thread through a host-supplied [`core::SimulationScheduler`].
//!
//! ## Key Features
//!
//! - **Cooldown Tracker**: per-actor, per-ability expiry ticks with item-scoped
//!   overrides, failing open when the lock is contended
//! - **Cleanup Sweeper**: periodic removal of expired entries and a bound on
//!   the override table
//! - **Metrics**: lock-free cast counters and average latency
//! - **Cast Dispatcher**: bounded pool with caller-runs backpressure,
//!   panic isolation, and two-phase shutdown
//!
//! ## Casting
//!
//! ```rust,ignore
//! use spellcast_engine::builders::EngineBuilder;
//! use spellcast_engine::core::CastContext;
//! use spellcast_engine::runtime::ManualScheduler;
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let engine = EngineBuilder::new(scheduler.clone()).build()?;
//!
//! // On the simulation thread:
//! engine.try_cast(fireball, CastContext::new(actor), Some(&held_item), presentation)?;
//!
//! // Each tick, the host runs what workers handed back:
//! scheduler.tick();
//! ```
//!
//! For complete examples, see `tests/engine_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Cooldowns, metrics, the cast dispatcher, and the engine facade.
pub mod core;
/// Configuration models for the dispatcher and cooldown upkeep.
pub mod config;
/// Builders to construct engines from configuration.
pub mod builders;
/// Reference simulation schedulers.
pub mod runtime;
/// Shared utilities.
pub mod util;
