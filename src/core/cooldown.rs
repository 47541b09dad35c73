//! Per-actor cooldown tracking with item-scoped overrides.
//!
//! All state lives behind one `parking_lot::RwLock`. Queries take the read
//! lock with a bounded wait and fail open: if the lock cannot be had in
//! `lock_timeout`, the answer is "not on cooldown". A rate limiter must never
//! be the reason a cast stalls.

mod sweeper;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CooldownConfig;
use crate::util::clock::Tick;
use crate::util::ids::{AbilityKey, ActorId, ItemDescriptor, ItemIdentity};

pub use sweeper::{CooldownSweeper, SweepReport};

/// Size of the tracked state, for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownStats {
    /// Actors with at least one entry.
    pub tracked_actors: usize,
    /// Entries across all actors, expired ones included until swept.
    pub total_entries: usize,
    /// Active override flags.
    pub overrides: usize,
}

#[derive(Default)]
struct CooldownState {
    entries: HashMap<ActorId, HashMap<AbilityKey, Tick>>,
    overrides: HashSet<(ActorId, ItemIdentity)>,
}

/// In-memory cooldown table shared by the simulation thread and workers.
pub struct CooldownTracker {
    state: RwLock<CooldownState>,
    lock_timeout: Duration,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(&CooldownConfig::default())
    }
}

impl CooldownTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(config: &CooldownConfig) -> Self {
        Self {
            state: RwLock::new(CooldownState::default()),
            lock_timeout: config.lock_timeout(),
        }
    }

    fn read(&self) -> Option<RwLockReadGuard<'_, CooldownState>> {
        let guard = self.state.try_read_for(self.lock_timeout);
        if guard.is_none() {
            debug!(timeout_us = self.lock_timeout.as_micros(), "Cooldown read lock timed out, failing open");
        }
        guard
    }

    fn expiry(&self, actor: ActorId, key: &str) -> Option<Tick> {
        if actor.is_nil() || key.is_empty() {
            return None;
        }
        let state = self.read()?;
        state.entries.get(&actor)?.get(key).copied()
    }

    /// Whether `actor` must wait before casting `key` at tick `now`.
    #[must_use]
    pub fn is_on_cooldown(&self, actor: ActorId, key: &str, now: Tick) -> bool {
        self.expiry(actor, key).is_some_and(|expiry| now < expiry)
    }

    /// Like [`is_on_cooldown`](Self::is_on_cooldown), but an override for
    /// (`actor`, `item`) makes the answer `false`.
    #[must_use]
    pub fn is_on_cooldown_with_item(&self, actor: ActorId, key: &str, now: Tick, item: &ItemDescriptor) -> bool {
        if self.is_override_disabled(actor, item) {
            return false;
        }
        self.is_on_cooldown(actor, key, now)
    }

    /// Ticks left before `key` is castable again; 0 when not on cooldown.
    #[must_use]
    pub fn remaining(&self, actor: ActorId, key: &str, now: Tick) -> Tick {
        self.expiry(actor, key).map_or(0, |expiry| expiry.saturating_sub(now))
    }

    /// Like [`remaining`](Self::remaining), 0 when an override is active.
    #[must_use]
    pub fn remaining_with_item(&self, actor: ActorId, key: &str, now: Tick, item: &ItemDescriptor) -> Tick {
        if self.is_override_disabled(actor, item) {
            return 0;
        }
        self.remaining(actor, key, now)
    }

    /// Put `key` on cooldown until tick `expiry`, replacing any previous
    /// expiry whether longer or shorter.
    pub fn set(&self, actor: ActorId, key: impl Into<AbilityKey>, expiry: Tick) {
        let key = key.into();
        if actor.is_nil() || key.is_empty() {
            return;
        }
        let mut state = self.state.write();
        state.entries.entry(actor).or_default().insert(key, expiry);
    }

    /// Forget every cooldown and override belonging to `actor`.
    pub fn clear_all(&self, actor: ActorId) {
        if actor.is_nil() {
            return;
        }
        let mut state = self.state.write();
        state.entries.remove(&actor);
        state.overrides.retain(|(owner, _)| *owner != actor);
    }

    /// Enable or lift the cooldown bypass for (`actor`, `item`). Idempotent.
    pub fn set_override_disabled(&self, actor: ActorId, item: &ItemDescriptor, disabled: bool) {
        if actor.is_nil() {
            return;
        }
        let key = (actor, item.identity());
        let mut state = self.state.write();
        if disabled {
            state.overrides.insert(key);
        } else {
            state.overrides.remove(&key);
        }
    }

    /// Whether cooldowns are bypassed for (`actor`, `item`).
    #[must_use]
    pub fn is_override_disabled(&self, actor: ActorId, item: &ItemDescriptor) -> bool {
        if actor.is_nil() {
            return false;
        }
        let key = (actor, item.identity());
        self.read().is_some_and(|state| state.overrides.contains(&key))
    }

    /// Current table sizes. Zeroed if the lock is unavailable.
    #[must_use]
    pub fn stats(&self) -> CooldownStats {
        self.read()
            .map(|state| CooldownStats {
                tracked_actors: state.entries.len(),
                total_entries: state.entries.values().map(HashMap::len).sum(),
                overrides: state.overrides.len(),
            })
            .unwrap_or_default()
    }

    /// Drop all cooldowns and overrides.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn wand() -> ItemDescriptor {
        ItemDescriptor::new("BLAZE_ROD").with_label("wandX")
    }

    #[test]
    fn test_fireball_expiry_boundary() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        tracker.set(a, "fireball", 1100);

        assert!(tracker.is_on_cooldown(a, "fireball", 1099));
        assert!(!tracker.is_on_cooldown(a, "fireball", 1100));
        assert_eq!(tracker.remaining(a, "fireball", 1000), 100);
        assert_eq!(tracker.remaining(a, "fireball", 1100), 0);
        assert_eq!(tracker.remaining(a, "fireball", 5000), 0);
    }

    #[test]
    fn test_last_write_wins_when_shortening() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        tracker.set(a, "fireball", 1100);
        tracker.set(a, "fireball", 1060);

        assert_eq!(tracker.remaining(a, "fireball", 1010), 50);
        assert!(!tracker.is_on_cooldown(a, "fireball", 1090));
    }

    #[test]
    fn test_missing_identifiers_fail_open() {
        let tracker = CooldownTracker::default();
        tracker.set(ActorId::nil(), "fireball", 100);
        tracker.set(ActorId::random(), "", 100);

        assert!(!tracker.is_on_cooldown(ActorId::nil(), "fireball", 0));
        assert_eq!(tracker.remaining(ActorId::nil(), "fireball", 0), 0);
        assert_eq!(tracker.stats(), CooldownStats::default());
    }

    #[test]
    fn test_override_wins_and_reverts() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        tracker.set(a, "heal", 500);

        tracker.set_override_disabled(a, &wand(), true);
        tracker.set_override_disabled(a, &wand(), true);
        assert!(tracker.is_override_disabled(a, &wand()));
        assert!(!tracker.is_on_cooldown_with_item(a, "heal", 100, &wand()));
        assert_eq!(tracker.remaining_with_item(a, "heal", 100, &wand()), 0);
        assert!(tracker.is_on_cooldown(a, "heal", 100));
        assert_eq!(tracker.stats().overrides, 1);

        tracker.set_override_disabled(a, &wand(), false);
        assert!(tracker.is_on_cooldown_with_item(a, "heal", 100, &wand()));
        assert_eq!(tracker.remaining_with_item(a, "heal", 100, &wand()), 400);
    }

    #[test]
    fn test_clear_all_is_scoped_to_actor() {
        let tracker = CooldownTracker::default();
        let a = ActorId::random();
        let b = ActorId::random();
        tracker.set(a, "fireball", 100);
        tracker.set(a, "heal", 100);
        tracker.set(b, "fireball", 100);
        tracker.set_override_disabled(a, &wand(), true);
        tracker.set_override_disabled(b, &wand(), true);

        tracker.clear_all(a);

        assert!(!tracker.is_on_cooldown(a, "fireball", 0));
        assert!(!tracker.is_on_cooldown(a, "heal", 0));
        assert!(!tracker.is_override_disabled(a, &wand()));
        assert!(tracker.is_on_cooldown(b, "fireball", 0));
        assert!(tracker.is_override_disabled(b, &wand()));
    }

    #[test]
    fn test_query_fails_open_while_write_locked() {
        let tracker = CooldownTracker::new(&CooldownConfig::new().with_lock_timeout(Duration::from_micros(100)));
        let a = ActorId::random();
        tracker.set(a, "fireball", 1000);

        let guard = tracker.state.write();
        assert!(!tracker.is_on_cooldown(a, "fireball", 0));
        assert_eq!(tracker.remaining(a, "fireball", 0), 0);
        drop(guard);

        assert!(tracker.is_on_cooldown(a, "fireball", 0));
    }

    #[test]
    fn test_concurrent_set_and_query() {
        let tracker = Arc::new(CooldownTracker::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let actor = ActorId::random();
                    for i in 0..200 {
                        tracker.set(actor, format!("spell-{i}"), 1000);
                        let _ = tracker.is_on_cooldown(actor, "spell-0", 10);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = tracker.stats();
        assert_eq!(stats.tracked_actors, 8);
        assert_eq!(stats.total_entries, 1600);
    }
}
