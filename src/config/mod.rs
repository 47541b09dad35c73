//! Configuration models for the dispatcher, cooldown upkeep, and the engine.

pub mod engine;

pub use engine::{CooldownConfig, DispatcherConfig, EngineConfig, SaturationPolicy};
