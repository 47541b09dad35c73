//! Periodic pruning of expired cooldowns and oversized override tables.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::CooldownTracker;
use crate::config::CooldownConfig;
use crate::core::host::{PeriodicHandle, SimulationScheduler};
use crate::util::clock::Tick;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Expired entries removed.
    pub expired_entries: usize,
    /// Actors dropped because no entries were left.
    pub emptied_actors: usize,
    /// Overrides dropped because the table exceeded its bound.
    pub cleared_overrides: usize,
}

impl CooldownTracker {
    /// Remove entries with `now >= expiry`, drop actors left empty, and clear
    /// every override if there are more than `override_cap`. Holds the write
    /// lock for a single pass.
    pub fn sweep(&self, now: Tick, override_cap: usize) -> SweepReport {
        let mut report = SweepReport::default();
        let mut state = self.state.write();

        for entries in state.entries.values_mut() {
            let before = entries.len();
            entries.retain(|_, expiry| now < *expiry);
            report.expired_entries += before - entries.len();
        }

        let actors_before = state.entries.len();
        state.entries.retain(|_, entries| !entries.is_empty());
        report.emptied_actors = actors_before - state.entries.len();

        if state.overrides.len() > override_cap {
            report.cleared_overrides = state.overrides.len();
            state.overrides.clear();
        }

        report
    }
}

/// Background upkeep for a [`CooldownTracker`], run by the host scheduler.
pub struct CooldownSweeper {
    tracker: Arc<CooldownTracker>,
    override_cap: usize,
}

impl CooldownSweeper {
    /// Sweeper for `tracker` using the bound from `config`.
    #[must_use]
    pub const fn new(tracker: Arc<CooldownTracker>, config: &CooldownConfig) -> Self {
        Self {
            tracker,
            override_cap: config.override_cap,
        }
    }

    /// Run one sweep at tick `now` and log what it removed.
    pub fn run_once(&self, now: Tick) -> SweepReport {
        let report = self.tracker.sweep(now, self.override_cap);
        if report.cleared_overrides > 0 {
            info!(
                cleared = report.cleared_overrides,
                cap = self.override_cap,
                "Cleared cooldown override table"
            );
        }
        let stats = self.tracker.stats();
        debug!(
            tick = now,
            expired = report.expired_entries,
            emptied_actors = report.emptied_actors,
            actors = stats.tracked_actors,
            entries = stats.total_entries,
            overrides = stats.overrides,
            "Cooldown sweep complete"
        );
        report
    }

    /// Register this sweeper with `scheduler`'s periodic facility.
    pub fn schedule<S>(self, scheduler: &S, config: &CooldownConfig) -> PeriodicHandle
    where
        S: SimulationScheduler + ?Sized,
    {
        debug!(
            interval_ticks = config.sweep_interval_ticks,
            override_cap = self.override_cap,
            "Scheduling cooldown sweeper"
        );
        scheduler.run_periodic(
            Box::new(move |now| {
                self.run_once(now);
            }),
            config.sweep_initial_delay_ticks,
            config.sweep_interval_ticks,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::{ActorId, ItemDescriptor};

    #[test]
    fn test_sweep_removes_expired_and_empty_actors() {
        let tracker = Arc::new(CooldownTracker::default());
        let a = ActorId::random();
        let b = ActorId::random();
        tracker.set(a, "fireball", 100);
        tracker.set(a, "heal", 300);
        tracker.set(b, "fireball", 150);

        let sweeper = CooldownSweeper::new(Arc::clone(&tracker), &CooldownConfig::default());
        let report = sweeper.run_once(200);

        assert_eq!(report.expired_entries, 2);
        assert_eq!(report.emptied_actors, 1);
        assert_eq!(report.cleared_overrides, 0);
        assert!(tracker.is_on_cooldown(a, "heal", 200));
        let stats = tracker.stats();
        assert_eq!(stats.tracked_actors, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_sweep_removes_entry_exactly_at_expiry() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        tracker.set(a, "fireball", 100);
        assert_eq!(tracker.sweep(99, 10).expired_entries, 0);
        assert_eq!(tracker.sweep(100, 10).expired_entries, 1);
    }

    #[test]
    fn test_sweep_clears_overrides_past_cap() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        for i in 0..3 {
            tracker.set_override_disabled(a, &ItemDescriptor::new("STICK").with_label(format!("w{i}")), true);
        }

        assert_eq!(tracker.sweep(0, 3).cleared_overrides, 0);
        assert_eq!(tracker.stats().overrides, 3);

        let report = tracker.sweep(0, 2);
        assert_eq!(report.cleared_overrides, 3);
        assert_eq!(tracker.stats().overrides, 0);
    }
}
