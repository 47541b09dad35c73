//! Simulation tick arithmetic.

use std::time::Duration;

/// Monotonic simulation tick counter. Never wall-clock.
pub type Tick = u64;

/// Nominal simulation rate.
pub const TICKS_PER_SECOND: u64 = 20;

/// Wall-clock length of one tick at the nominal rate.
pub const TICK_DURATION: Duration = Duration::from_millis(1000 / TICKS_PER_SECOND);

/// Convert a tick count to its nominal wall-clock duration.
#[must_use]
pub const fn ticks_to_duration(ticks: Tick) -> Duration {
    Duration::from_millis(ticks.saturating_mul(1000 / TICKS_PER_SECOND))
}

/// Convert a duration to whole ticks, rounding up so a non-zero duration is
/// never zero ticks.
#[must_use]
pub fn duration_to_ticks(duration: Duration) -> Tick {
    let per_tick = TICK_DURATION.as_millis();
    let ticks = duration.as_millis().div_ceil(per_tick);
    Tick::try_from(ticks).unwrap_or(Tick::MAX)
}
