//! Dispatcher, cooldown, and engine configuration structures.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::clock::{duration_to_ticks, Tick};

/// Prefix of every environment variable read by [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "SPELLCAST_";

/// What the dispatcher does when the work queue is full and every worker,
/// including the burst workers, is busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// Run the cast synchronously on the submitting thread.
    #[default]
    CallerRuns,
    /// Refuse the cast with `DispatchError::QueueFull`.
    Reject,
}

/// Worker pool and shutdown configuration for the cast dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Workers kept alive for the dispatcher's whole lifetime.
    pub core_workers: usize,
    /// Upper bound on workers, including burst workers spawned under load.
    pub max_workers: usize,
    /// Capacity of the bounded work queue.
    pub queue_capacity: usize,
    /// Idle time after which a burst worker retires, in milliseconds.
    pub keep_alive_ms: u64,
    /// Graceful drain window on shutdown, in milliseconds.
    pub shutdown_grace_ms: u64,
    /// Window after cancelling queued casts, in milliseconds.
    pub shutdown_force_ms: u64,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
    /// Stack size for worker threads, in bytes.
    pub thread_stack_size: usize,
    /// Behavior when queue and workers are saturated.
    pub saturation: SaturationPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let cores = num_cpus::get();
        let core_workers = (cores / 2).max(2);
        Self {
            core_workers,
            max_workers: core_workers.max(cores),
            queue_capacity: 1000,
            keep_alive_ms: 60_000,
            shutdown_grace_ms: 30_000,
            shutdown_force_ms: 10_000,
            thread_name_prefix: "spellcast-worker".into(),
            thread_stack_size: 2 * 1024 * 1024,
            saturation: SaturationPolicy::CallerRuns,
        }
    }
}

impl DispatcherConfig {
    /// Defaults sized from the number of available cores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the core worker count, raising `max_workers` to match if needed.
    #[must_use]
    pub fn with_core_workers(mut self, count: usize) -> Self {
        self.core_workers = count;
        self.max_workers = self.max_workers.max(count);
        self
    }

    /// Set the maximum worker count.
    #[must_use]
    pub fn with_max_workers(mut self, count: usize) -> Self {
        self.max_workers = count;
        self
    }

    /// Set the bounded queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the burst worker idle timeout.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = millis(keep_alive);
        self
    }

    /// Set both shutdown windows.
    #[must_use]
    pub fn with_shutdown_windows(mut self, grace: Duration, force: Duration) -> Self {
        self.shutdown_grace_ms = millis(grace);
        self.shutdown_force_ms = millis(force);
        self
    }

    /// Set the saturation policy.
    #[must_use]
    pub fn with_saturation_policy(mut self, policy: SaturationPolicy) -> Self {
        self.saturation = policy;
        self
    }

    /// Burst worker idle timeout.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Graceful drain window.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Forced cancellation window.
    #[must_use]
    pub const fn shutdown_force(&self) -> Duration {
        Duration::from_millis(self.shutdown_force_ms)
    }

    /// Validate dispatcher configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.core_workers == 0 {
            return Err("core_workers must be greater than 0".into());
        }
        if self.max_workers < self.core_workers {
            return Err(format!(
                "max_workers ({}) must be at least core_workers ({})",
                self.max_workers, self.core_workers
            ));
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.keep_alive_ms == 0 {
            return Err("keep_alive_ms must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}

/// Cooldown tracker and sweeper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Ticks between sweeps of expired entries.
    pub sweep_interval_ticks: Tick,
    /// Ticks before the first sweep.
    pub sweep_initial_delay_ticks: Tick,
    /// Override table size above which a sweep clears every override.
    pub override_cap: usize,
    /// Longest a query waits for the tracker lock before failing open, in
    /// microseconds.
    pub lock_timeout_us: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ticks: 1200,
            sweep_initial_delay_ticks: 1200,
            override_cap: 1000,
            lock_timeout_us: 500,
        }
    }
}

impl CooldownConfig {
    /// Default cooldown settings (sweep every 60 s at 20 TPS).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep period and initial delay from a wall-clock duration.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        let ticks = duration_to_ticks(interval);
        self.sweep_interval_ticks = ticks;
        self.sweep_initial_delay_ticks = ticks;
        self
    }

    /// Set the override table bound.
    #[must_use]
    pub const fn with_override_cap(mut self, cap: usize) -> Self {
        self.override_cap = cap;
        self
    }

    /// Set the query lock timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_us = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Query lock timeout.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_micros(self.lock_timeout_us)
    }

    /// Validate cooldown configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_ticks == 0 {
            return Err("sweep_interval_ticks must be greater than 0".into());
        }
        if self.override_cap == 0 {
            return Err("override_cap must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool settings.
    pub dispatcher: DispatcherConfig,
    /// Cooldown upkeep settings.
    pub cooldown: CooldownConfig,
}

impl EngineConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.dispatcher
            .validate()
            .map_err(|e| format!("dispatcher invalid: {e}"))?;
        self.cooldown
            .validate()
            .map_err(|e| format!("cooldown invalid: {e}"))?;
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `SPELLCAST_*`
    /// environment variables, loading a `.env` file first if present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or the
    /// validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from defaults overridden by values returned by
    /// `lookup` for `SPELLCAST_*` names.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let d = &mut cfg.dispatcher;
        if let Some(v) = parse_var(&lookup, "CORE_WORKERS")? {
            d.core_workers = v;
            d.max_workers = d.max_workers.max(v);
        }
        if let Some(v) = parse_var(&lookup, "MAX_WORKERS")? {
            d.max_workers = v;
        }
        if let Some(v) = parse_var(&lookup, "QUEUE_CAPACITY")? {
            d.queue_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "KEEP_ALIVE_MS")? {
            d.keep_alive_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SHUTDOWN_GRACE_MS")? {
            d.shutdown_grace_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SHUTDOWN_FORCE_MS")? {
            d.shutdown_force_ms = v;
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}SATURATION")) {
            d.saturation = match v.trim() {
                "caller_runs" => SaturationPolicy::CallerRuns,
                "reject" => SaturationPolicy::Reject,
                other => return Err(format!("{ENV_PREFIX}SATURATION: unknown policy `{other}`")),
            };
        }
        let c = &mut cfg.cooldown;
        if let Some(v) = parse_var(&lookup, "SWEEP_INTERVAL_TICKS")? {
            c.sweep_interval_ticks = v;
            c.sweep_initial_delay_ticks = v;
        }
        if let Some(v) = parse_var(&lookup, "OVERRIDE_CAP")? {
            c.override_cap = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCK_TIMEOUT_US")? {
            c.lock_timeout_us = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<F, T>(lookup: &F, suffix: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let name = format!("{ENV_PREFIX}{suffix}");
    lookup(&name)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| format!("{name}: {e}")))
        .transpose()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
