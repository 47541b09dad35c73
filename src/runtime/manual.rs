//! Tick-driven scheduler for tests and simple embeddings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::trace;

use crate::core::host::{PeriodicHandle, PeriodicTask, SimulationScheduler, SimulationTask};
use crate::util::clock::Tick;

struct PeriodicEntry {
    task: PeriodicTask,
    next_run: Tick,
    period: Tick,
    handle: PeriodicHandle,
}

/// A [`SimulationScheduler`] whose clock only moves when [`tick`] is called.
///
/// The thread that calls [`tick`] or [`bind_current_thread`] becomes the
/// simulation thread. Queued tasks run in submission order, before the
/// periodic tasks due on the same tick.
///
/// [`tick`]: ManualScheduler::tick
/// [`bind_current_thread`]: ManualScheduler::bind_current_thread
pub struct ManualScheduler {
    tick: AtomicU64,
    pending_tx: Sender<SimulationTask>,
    pending_rx: Receiver<SimulationTask>,
    periodic: Mutex<Vec<PeriodicEntry>>,
    owner: Mutex<Option<ThreadId>>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Scheduler at tick 0 with no simulation thread bound yet.
    #[must_use]
    pub fn new() -> Self {
        let (pending_tx, pending_rx) = unbounded();
        Self {
            tick: AtomicU64::new(0),
            pending_tx,
            pending_rx,
            periodic: Mutex::new(Vec::new()),
            owner: Mutex::new(None),
        }
    }

    /// Make the calling thread the simulation thread.
    pub fn bind_current_thread(&self) {
        *self.owner.lock() = Some(thread::current().id());
    }

    /// Advance one tick: run queued tasks, then due periodic tasks. Returns
    /// the new tick.
    pub fn tick(&self) -> Tick {
        self.bind_current_thread();
        let now = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        self.run_pending();
        self.run_due_periodic(now);
        now
    }

    /// Advance `ticks` ticks.
    pub fn advance(&self, ticks: Tick) -> Tick {
        for _ in 0..ticks {
            self.tick();
        }
        self.current_tick()
    }

    /// Run every queued task without advancing the clock. Returns how many
    /// ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        for task in self.pending_rx.try_iter() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "Ran queued simulation tasks");
        }
        ran
    }

    /// Tasks queued and not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_rx.len()
    }

    /// Periodic tasks registered and not cancelled.
    #[must_use]
    pub fn periodic_count(&self) -> usize {
        self.periodic
            .lock()
            .iter()
            .filter(|entry| !entry.handle.is_cancelled())
            .count()
    }

    fn run_due_periodic(&self, now: Tick) {
        // Run outside the lock so tasks may register more periodic work.
        let mut entries = std::mem::take(&mut *self.periodic.lock());
        entries.retain(|entry| !entry.handle.is_cancelled());

        for entry in &mut entries {
            if entry.next_run <= now {
                (entry.task)(now);
                entry.next_run = now + entry.period;
            }
        }

        let mut periodic = self.periodic.lock();
        entries.append(&mut periodic);
        *periodic = entries;
    }
}

impl SimulationScheduler for ManualScheduler {
    fn run_on_simulation_thread(&self, task: SimulationTask) {
        // The receiver lives in self, so the channel never disconnects.
        let _ = self.pending_tx.send(task);
    }

    fn run_periodic(&self, task: PeriodicTask, initial_delay: Tick, period: Tick) -> PeriodicHandle {
        let handle = PeriodicHandle::new();
        self.periodic.lock().push(PeriodicEntry {
            task,
            next_run: self.current_tick() + initial_delay.max(1),
            period: period.max(1),
            handle: handle.clone(),
        });
        handle
    }

    fn is_simulation_thread(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }

    fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::Acquire)
    }
}
